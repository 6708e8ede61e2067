//! Multi-pass DTW driver (C3): iterate MFCC + DTW at increasing granularity,
//! seeding each pass's band from the previous pass's compacted path.

use crate::dtw::aligner::align_mfcc_dtw;
use crate::dtw::path::CompactedPath;
use crate::error::{AlignmentError, Result};
use crate::mfcc::MfccExtractor;
use crate::timeline::map_timeline;
use crate::types::{Granularity, MfccOptions, RawAudio, TimelineEntry};

/// Public operation #1: multi-pass DTW alignment of `reference_timeline`
/// (defined against `reference_audio`) onto `source_audio`.
pub fn align_using_dtw(
    source_audio: &RawAudio,
    reference_audio: &RawAudio,
    reference_timeline: &[TimelineEntry],
    granularities: &[Granularity],
    window_durations: &[f64],
    mfcc: &dyn MfccExtractor,
) -> Result<Vec<TimelineEntry>> {
    if granularities.is_empty() || granularities.len() != window_durations.len() {
        return Err(AlignmentError::InvariantViolation(format!(
            "granularities ({}) and windowDurations ({}) must be non-empty and equal length",
            granularities.len(),
            window_durations.len()
        )));
    }

    let source_duration = source_audio.duration_seconds();

    let mut prev_path: Option<CompactedPath> = None;
    let mut prev_source_len = 0usize;
    let mut fps = 0.0;

    for (pass, (&granularity, &window_duration)) in
        granularities.iter().zip(window_durations.iter()).enumerate()
    {
        if pass == 0 && window_duration < 0.2 * source_duration {
            log::warn!(
                "pass 1 window duration {:.3}s is narrower than 20% of source duration {:.3}s",
                window_duration,
                source_duration
            );
        }

        let params = granularity.params();
        let options: MfccOptions = params.into();
        fps = granularity.frames_per_second();

        let reference_mfccs = mfcc.compute(reference_audio, &options)?;
        let source_mfccs = mfcc.compute(source_audio, &options)?;
        if reference_mfccs.is_empty() || source_mfccs.is_empty() {
            return Err(AlignmentError::InvariantViolation(
                "MFCC extraction produced an empty sequence".into(),
            ));
        }

        let window = (window_duration * fps).floor().max(1.0) as usize;
        log::debug!(
            "pass {}: estimated cost matrix size {} bytes",
            pass + 1,
            crate::dtw::aligner::estimate_banded_matrix_bytes(reference_mfccs.len(), window)
        );

        let centers: Option<Vec<usize>> = prev_path.as_ref().map(|prev| {
            resample_centers(prev, prev_source_len, reference_mfccs.len(), source_mfccs.len())
        });

        let path = align_mfcc_dtw(&reference_mfccs, &source_mfccs, window, None, centers.as_deref())?;

        prev_source_len = source_mfccs.len();
        prev_path = Some(CompactedPath::compact(&path));
    }

    let compacted = prev_path.expect("the loop above always runs at least one pass");
    map_timeline(reference_timeline, &compacted, fps, source_audio)
}

/// Re-sample the previous pass's compacted-path center curve to the new
/// reference/source resolution (spec §4.3 step 4).
fn resample_centers(
    prev: &CompactedPath,
    prev_source_len: usize,
    new_reference_len: usize,
    new_source_len: usize,
) -> Vec<usize> {
    if prev.is_empty() || prev_source_len == 0 || new_reference_len == 0 {
        return vec![0; new_reference_len];
    }

    let rel_centers: Vec<f64> = prev
        .0
        .iter()
        .map(|range| ((range.first + range.last) as f64 / 2.0) / prev_source_len as f64)
        .collect();

    (0..new_reference_len)
        .map(|i| {
            let k = (i * rel_centers.len() / new_reference_len).min(rel_centers.len() - 1);
            let rel = rel_centers[k];
            ((rel * new_source_len as f64).floor() as usize).min(new_source_len.saturating_sub(1))
        })
        .collect()
}
