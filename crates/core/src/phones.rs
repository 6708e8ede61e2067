//! Phone-level sub-alignment (C6): bounded per-word DTW that refines a
//! word-level timeline down to its phones.

use crate::audio::io::extract_audio_range;
use crate::dtw::aligner::align_mfcc_dtw;
use crate::dtw::path::CompactedPath;
use crate::error::{AlignmentError, Result};
use crate::mfcc::MfccExtractor;
use crate::types::{Granularity, MfccOptions, RawAudio, TimelineEntry};

/// Granularity used for the word-bounded MFCC pass. Phone sub-alignment
/// windows are short (one word), so a fine hop is affordable.
const WORD_LEVEL_GRANULARITY: Granularity = Granularity::High;

/// Public operation #4: align a reference word's nested phone timeline onto
/// the corresponding span of `source_audio`, given the word's already-mapped
/// `source_word_timeline` entries (one per word, each carrying the reference
/// phone breakdown as its `timeline` field) and the matching
/// `reference_timeline` words (carrying the canonical phone durations).
pub fn align_phone_timelines(
    source_audio: &RawAudio,
    source_word_timeline: &[TimelineEntry],
    reference_audio: &RawAudio,
    reference_timeline: &[TimelineEntry],
    window_duration_seconds: f64,
    mfcc: &dyn MfccExtractor,
) -> Result<Vec<TimelineEntry>> {
    if source_word_timeline.len() != reference_timeline.len() {
        return Err(AlignmentError::InvariantViolation(format!(
            "source word count {} does not match reference word count {}",
            source_word_timeline.len(),
            reference_timeline.len()
        )));
    }

    source_word_timeline
        .iter()
        .zip(reference_timeline.iter())
        .map(|(source_word, reference_word)| {
            align_one_word(
                source_audio,
                source_word,
                reference_audio,
                reference_word,
                window_duration_seconds,
                mfcc,
            )
        })
        .collect()
}

fn align_one_word(
    source_audio: &RawAudio,
    source_word: &TimelineEntry,
    reference_audio: &RawAudio,
    reference_word: &TimelineEntry,
    window_duration_seconds: f64,
    mfcc: &dyn MfccExtractor,
) -> Result<TimelineEntry> {
    let reference_phones = match &reference_word.timeline {
        Some(phones) if !phones.is_empty() => phones,
        _ => {
            return Ok(TimelineEntry {
                kind: source_word.kind.clone(),
                text: source_word.text.clone(),
                start_time: source_word.start_time,
                end_time: source_word.end_time,
                timeline: None,
            })
        }
    };

    let source_word_audio = extract_audio_range(source_audio, source_word.start_time, source_word.end_time);
    let reference_word_audio =
        extract_audio_range(reference_audio, reference_word.start_time, reference_word.end_time);

    let params = WORD_LEVEL_GRANULARITY.params();
    let options: MfccOptions = params.into();
    let fps = WORD_LEVEL_GRANULARITY.frames_per_second();

    let reference_mfccs = mfcc.compute(&reference_word_audio, &options)?;
    let source_mfccs = mfcc.compute(&source_word_audio, &options)?;

    if reference_mfccs.is_empty() || source_mfccs.is_empty() {
        // Too short to extract a single frame from; fall back to the same
        // proportional-rescale interpolation the indirect-alignment path
        // uses for its cheap variant.
        return Ok(crate::indirect::interpolate_word(source_word, reference_word));
    }

    let window = (window_duration_seconds * fps).floor().max(1.0) as usize;
    let path = align_mfcc_dtw(&reference_mfccs, &source_mfccs, window, None, None)?;
    let compacted = CompactedPath::compact(&path);

    let reference_word_duration = reference_word.end_time - reference_word.start_time;

    let mapped_phones: Vec<TimelineEntry> = reference_phones
        .iter()
        .map(|phone| {
            let (rel_start, rel_end) = if reference_word_duration > 0.0 {
                (
                    (phone.start_time - reference_word.start_time) / reference_word_duration,
                    (phone.end_time - reference_word.start_time) / reference_word_duration,
                )
            } else {
                (0.0, 0.0)
            };

            let ref_frame_start =
                ((rel_start * reference_mfccs.len() as f64).floor() as usize).min(compacted.len().saturating_sub(1));
            let ref_frame_end =
                ((rel_end * reference_mfccs.len() as f64).floor() as usize).min(compacted.len().saturating_sub(1));

            let src_frame_start = compacted.0[ref_frame_start].first;
            let src_frame_end = compacted.0[ref_frame_end].last.max(src_frame_start);

            let samples_per_frame = (source_word_audio.sample_rate as f64 / fps).max(1.0);
            let start_time =
                source_word.start_time + (src_frame_start as f64 * samples_per_frame) / source_word_audio.sample_rate as f64;
            let mut end_time =
                source_word.start_time + (src_frame_end as f64 * samples_per_frame) / source_word_audio.sample_rate as f64;
            if end_time <= start_time {
                end_time = start_time + 1.0 / fps;
            }
            end_time = end_time.min(source_word.end_time).max(start_time);

            TimelineEntry::leaf(phone.kind.clone(), phone.text.clone(), start_time, end_time)
        })
        .collect();

    Ok(TimelineEntry {
        kind: source_word.kind.clone(),
        text: source_word.text.clone(),
        start_time: source_word.start_time,
        end_time: source_word.end_time,
        timeline: Some(mapped_phones),
    })
}
