//! File-based caching for alignment results.
//!
//! Provides SHA-256 file hashing and content-addressed caching for
//! `align_using_dtw` output, keyed on both audio files plus the granularity
//! configuration that produced the result.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::dtw::align_using_dtw;
use crate::mfcc::MfccExtractor;
use crate::types::{Granularity, RawAudio, TimelineEntry};

/// Get the cache directory.
///
/// Uses `VOXALIGN_CACHE_DIR` env var if set, otherwise `~/.cache/voxalign`.
pub fn cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("VOXALIGN_CACHE_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".cache").join("voxalign")
}

/// Compute SHA-256 hash of a file's contents.
///
/// Returns a 64-character hex string.
pub fn file_hash(path: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file for hashing: {}", path.display()))?;
    std::io::copy(&mut file, &mut hasher)?;
    let result = hasher.finalize();
    Ok(format!("{:x}", result))
}

/// Atomically write data to a file via temp file + rename.
fn atomic_write(target: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = target.with_extension("tmp");
    std::fs::write(&tmp_path, data)?;
    std::fs::rename(&tmp_path, target)?;
    Ok(())
}

fn granularity_tag(granularities: &[Granularity]) -> String {
    granularities
        .iter()
        .map(|g| format!("{:?}", g).to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

fn alignment_cache_key(source_hash: &str, reference_hash: &str, granularities: &[Granularity]) -> String {
    format!(
        "{}_{}_{}",
        source_hash,
        reference_hash,
        granularity_tag(granularities)
    )
}

/// Return a cached multi-pass alignment result, or `None` if not cached.
pub fn get_cached_alignment(
    source_hash: &str,
    reference_hash: &str,
    granularities: &[Granularity],
) -> Option<Vec<TimelineEntry>> {
    let key = alignment_cache_key(source_hash, reference_hash, granularities);
    let path = cache_dir().join("align").join(format!("{}.json", key));
    if !path.exists() {
        return None;
    }
    let data = std::fs::read_to_string(&path).ok()?;
    let result: Vec<TimelineEntry> = serde_json::from_str(&data).ok()?;
    log::info!("Cache hit: alignment ({}...)", &key[..12.min(key.len())]);
    Some(result)
}

/// Store a multi-pass alignment result in cache.
pub fn store_alignment_cache(
    source_hash: &str,
    reference_hash: &str,
    granularities: &[Granularity],
    result: &[TimelineEntry],
) -> Result<PathBuf> {
    let key = alignment_cache_key(source_hash, reference_hash, granularities);
    let path = cache_dir().join("align").join(format!("{}.json", key));
    let json = serde_json::to_string(result)?;
    atomic_write(&path, json.as_bytes())?;
    log::info!("Cached alignment ({}...)", &key[..12.min(key.len())]);
    Ok(path)
}

/// Content-addressed wrapper around `align_using_dtw`: hashes
/// `source_path`/`reference_path` and returns the cached result for that
/// file pair plus `granularities`, or runs the alignment and stores the
/// result for next time.
#[allow(clippy::too_many_arguments)]
pub fn cached_align_using_dtw(
    source_audio: &RawAudio,
    source_path: &Path,
    reference_audio: &RawAudio,
    reference_path: &Path,
    reference_timeline: &[TimelineEntry],
    granularities: &[Granularity],
    window_durations: &[f64],
    mfcc: &dyn MfccExtractor,
) -> crate::error::Result<Vec<TimelineEntry>> {
    let source_hash = file_hash(source_path)?;
    let reference_hash = file_hash(reference_path)?;

    if let Some(cached) = get_cached_alignment(&source_hash, &reference_hash, granularities) {
        return Ok(cached);
    }

    let result = align_using_dtw(
        source_audio,
        reference_audio,
        reference_timeline,
        granularities,
        window_durations,
        mfcc,
    )?;

    if let Err(e) = store_alignment_cache(&source_hash, &reference_hash, granularities, &result) {
        log::warn!("failed to write alignment cache: {:#}", e);
    }

    Ok(result)
}
