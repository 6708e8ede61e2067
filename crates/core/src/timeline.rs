//! Timeline mapper (C4): project reference timeline entries through a
//! compacted DTW path onto source-audio time, trimming silence at interval
//! boundaries.

use crate::audio::analysis::{get_ending_silent_sample_count, get_starting_silent_sample_count};
use crate::dtw::path::{CompactedPath, FrameKind};
use crate::error::{AlignmentError, Result};
use crate::types::{RawAudio, TimelineEntry};

/// RMS-in-dBFS threshold below which a short analysis frame counts as
/// silence for boundary trimming (spec §4.4 / §6).
pub const SILENCE_THRESHOLD_DB: f64 = -40.0;

pub fn map_timeline(
    entries: &[TimelineEntry],
    compacted: &CompactedPath,
    fps: f64,
    source_audio: &RawAudio,
) -> Result<Vec<TimelineEntry>> {
    entries
        .iter()
        .map(|entry| map_entry(entry, compacted, fps, source_audio))
        .collect()
}

fn map_entry(
    entry: &TimelineEntry,
    compacted: &CompactedPath,
    fps: f64,
    source_audio: &RawAudio,
) -> Result<TimelineEntry> {
    if entry.start_time < 0.0 || entry.end_time < 0.0 {
        return Err(AlignmentError::InvariantViolation(format!(
            "negative timestamp in timeline entry '{}'",
            entry.text
        )));
    }

    let sample_rate = source_audio.sample_rate;
    let samples_per_frame = (sample_rate as f64 / fps).floor().max(1.0) as usize;

    let rs = (entry.start_time * fps).floor().max(0.0) as usize;
    let re = (entry.end_time * fps).floor().max(0.0) as usize;

    // Both endpoints deliberately map through `.first`, not `.last` for the
    // end. This is preserved as normative, not "fixed" — see DESIGN.md.
    let js = compacted.map_frame(rs, FrameKind::First);
    let je = compacted.map_frame(re, FrameKind::First);

    let mut sample_start = js * samples_per_frame;
    let mut sample_end = je * samples_per_frame;

    let samples = source_audio.channel0_f64();
    trim_silence(&samples, sample_rate, &mut sample_start, &mut sample_end);

    let children = match &entry.timeline {
        Some(kids) => Some(map_timeline(kids, compacted, fps, source_audio)?),
        None => None,
    };

    Ok(TimelineEntry {
        kind: entry.kind.clone(),
        text: entry.text.clone(),
        start_time: sample_start as f64 / sample_rate as f64,
        end_time: sample_end as f64 / sample_rate as f64,
        timeline: children,
    })
}

fn trim_silence(samples: &[f64], sample_rate: u32, start: &mut usize, end: &mut usize) {
    if *end > samples.len() {
        *end = samples.len();
    }
    if *start > *end {
        *start = *end;
    }
    if *start >= *end {
        return;
    }

    let segment = &samples[*start..*end];
    let leading = get_starting_silent_sample_count(segment, sample_rate, SILENCE_THRESHOLD_DB);
    let trailing = get_ending_silent_sample_count(segment, sample_rate, SILENCE_THRESHOLD_DB);

    let new_start = *start + leading;
    let new_end = end.saturating_sub(trailing);
    *start = new_start;
    *end = new_end.max(*start);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtw::path::FrameRange;
    use crate::types::TimelineItemKind;

    fn sine_audio(sr: u32, freq: f64, seconds: f64) -> RawAudio {
        let n = (sr as f64 * seconds) as usize;
        let samples: Vec<f32> = (0..n)
            .map(|i| ((i as f64 / sr as f64) * freq * std::f64::consts::TAU).sin() as f32)
            .collect();
        RawAudio::mono(samples, sr)
    }

    #[test]
    fn identity_path_preserves_timeline_within_one_hop() {
        let fps = 20.0; // 50ms hop
        let sr = 16000u32;
        let audio = sine_audio(sr, 440.0, 5.0);
        let samples_per_frame = (sr as f64 / fps) as usize;
        let frames = (audio.sample_count() / samples_per_frame) + 1;
        let compacted = CompactedPath((0..frames).map(|i| FrameRange { first: i, last: i }).collect());

        let entries = vec![
            TimelineEntry::leaf(TimelineItemKind::Word, "a", 0.0, 2.5),
            TimelineEntry::leaf(TimelineItemKind::Word, "b", 2.5, 5.0),
        ];
        let mapped = map_timeline(&entries, &compacted, fps, &audio).unwrap();
        assert_eq!(mapped.len(), 2);
        assert!((mapped[0].start_time - 0.0).abs() < 0.1);
        assert!((mapped[1].end_time - 5.0).abs() < 0.1);
    }

    #[test]
    fn negative_timestamp_is_rejected() {
        let fps = 20.0;
        let audio = sine_audio(16000, 440.0, 1.0);
        let compacted = CompactedPath(vec![FrameRange { first: 0, last: 0 }]);
        let entries = vec![TimelineEntry::leaf(TimelineItemKind::Word, "x", -1.0, 0.5)];
        assert!(map_timeline(&entries, &compacted, fps, &audio).is_err());
    }

    #[test]
    fn trailing_silence_is_trimmed() {
        let sr = 16000u32;
        let mut samples: Vec<f32> = (0..sr)
            .map(|i| ((i as f64 / sr as f64) * 440.0 * std::f64::consts::TAU).sin() as f32)
            .collect();
        samples.extend(vec![0.0f32; sr as usize * 3]); // 3s trailing silence
        let audio = RawAudio::mono(samples, sr);

        let fps = 20.0;
        let samples_per_frame = (sr as f64 / fps) as usize;
        let frame_count = audio.sample_count() / samples_per_frame + 1;
        let compacted = CompactedPath((0..frame_count).map(|i| FrameRange { first: i, last: i }).collect());

        let entries = vec![TimelineEntry::leaf(TimelineItemKind::Word, "hello", 0.0, 4.0)];
        let mapped = map_timeline(&entries, &compacted, fps, &audio).unwrap();
        assert!(mapped[0].end_time <= 1.2, "got {}", mapped[0].end_time);
    }

    #[test]
    fn children_are_mapped_recursively() {
        let fps = 20.0;
        let audio = sine_audio(16000, 440.0, 2.0);
        let samples_per_frame = (16000.0 / fps) as usize;
        let frame_count = audio.sample_count() / samples_per_frame + 1;
        let compacted = CompactedPath((0..frame_count).map(|i| FrameRange { first: i, last: i }).collect());

        let entries = vec![TimelineEntry {
            kind: TimelineItemKind::Word,
            text: "hi".into(),
            start_time: 0.0,
            end_time: 1.0,
            timeline: Some(vec![TimelineEntry::leaf(TimelineItemKind::Phone, "HH", 0.0, 0.5)]),
        }];
        let mapped = map_timeline(&entries, &compacted, fps, &audio).unwrap();
        assert!(mapped[0].timeline.is_some());
        assert_eq!(mapped[0].timeline.as_ref().unwrap().len(), 1);
    }
}
