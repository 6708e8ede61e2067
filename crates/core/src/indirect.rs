//! Indirect alignment (C5): align a reference timeline onto source audio
//! when no real reference recording exists, only an imprecise word-level
//! recognition timeline over the source audio itself. A synthesized
//! intermediate stands in for the missing reference recording: it is built
//! from the *recognized* words (so its own word/phone timeline corresponds
//! positionally to the recognition timeline), then the real reference
//! recording is aligned onto that synthesized audio via C3, and the result
//! is carried onto source/recognition time through a per-phone anchor table.

use crate::dtw::align_using_dtw;
use crate::error::{AlignmentError, Result};
use crate::mfcc::MfccExtractor;
use crate::phones;
use crate::tts::{create_alignment_reference, TtsEngine, TtsOptions};
use crate::types::{Granularity, RawAudio, TimelineEntry};

/// How to refine word-level boundaries down to phones once a source word
/// timeline has been composed against the recognition timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneAlignmentMethod {
    /// Proportionally rescale the reference's phone durations onto each
    /// composed source word span. Cheap, no DTW.
    Interpolation,
    /// Run bounded per-word DTW between the source audio and the reference
    /// audio (reuses `phones::align_phone_timelines`).
    Dtw,
}

impl TryFrom<&str> for PhoneAlignmentMethod {
    type Error = AlignmentError;

    fn try_from(s: &str) -> Result<Self> {
        match s {
            "interpolation" => Ok(Self::Interpolation),
            "dtw" => Ok(Self::Dtw),
            other => Err(AlignmentError::UnsupportedSelector(format!(
                "phoneAlignmentMethod: '{}'",
                other
            ))),
        }
    }
}

/// A correspondence between a timestamp on the synthesized-recognized
/// audio's own axis and the matching timestamp on source/recognition time.
#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    pub synth_time: f64,
    pub recognition_time: f64,
}

/// Build the anchor table bridging the synthesized-recognized audio's time
/// axis to source/recognition time. `synth_words` and `recognition_words`
/// correspond positionally (the synthesized audio was built from exactly
/// `recognition_words`'s texts, in order), so no text matching is needed.
/// Anchors are emitted at each word's start, at each of its phones' start
/// and end (when both sides carry a phone breakdown), and at the word's
/// end, so the nearest-anchor projection in `AnchorCursor` can interpolate
/// within a word rather than snapping it whole.
pub fn build_anchor_table(synth_words: &[TimelineEntry], recognition_words: &[TimelineEntry]) -> Vec<Anchor> {
    let mut anchors = Vec::new();

    for (synth_word, recognition_word) in synth_words.iter().zip(recognition_words.iter()) {
        anchors.push(Anchor {
            synth_time: synth_word.start_time,
            recognition_time: recognition_word.start_time,
        });

        if let (Some(synth_phones), Some(recognition_phones)) = (&synth_word.timeline, &recognition_word.timeline) {
            for (synth_phone, recognition_phone) in synth_phones.iter().zip(recognition_phones.iter()) {
                anchors.push(Anchor {
                    synth_time: synth_phone.start_time,
                    recognition_time: recognition_phone.start_time,
                });
                anchors.push(Anchor {
                    synth_time: synth_phone.end_time,
                    recognition_time: recognition_phone.end_time,
                });
            }
        }

        anchors.push(Anchor {
            synth_time: synth_word.end_time,
            recognition_time: recognition_word.end_time,
        });
    }

    anchors
}

/// Forward-only nearest-anchor time projector. Ties (equal distance to the
/// anchor on either side) resolve to the left (earlier) anchor. A fresh
/// cursor must be used for each independent timeline traversal: its internal
/// position only ever advances, so reusing one across unrelated traversals
/// would silently skip anchors the second traversal needed.
pub struct AnchorCursor<'a> {
    anchors: &'a [Anchor],
    pos: usize,
}

impl<'a> AnchorCursor<'a> {
    pub fn new(anchors: &'a [Anchor]) -> Self {
        Self { anchors, pos: 0 }
    }

    /// Project a synthesized-timeline timestamp onto recognition/source
    /// time. With no anchors at all, the mapping degenerates to the
    /// identity (the only sane fallback when nothing else is known).
    pub fn project(&mut self, synth_time: f64) -> f64 {
        if self.anchors.is_empty() {
            return synth_time;
        }
        while self.pos + 1 < self.anchors.len() && self.anchors[self.pos + 1].synth_time <= synth_time {
            self.pos += 1;
        }

        let left = &self.anchors[self.pos];
        let chosen = if self.pos + 1 < self.anchors.len() {
            let right = &self.anchors[self.pos + 1];
            let dl = (synth_time - left.synth_time).abs();
            let dr = (right.synth_time - synth_time).abs();
            if dr < dl {
                right
            } else {
                left
            }
        } else {
            left
        };

        chosen.recognition_time + (synth_time - chosen.synth_time)
    }
}

/// Scale every timestamp in `entries` (recursively, including nested phone
/// children) by `factor`. The degenerate fallback for an empty recognition
/// timeline: with nothing to anchor against, a uniform
/// `sourceDuration / referenceDuration` rescale is the only sane answer.
fn linear_rescale_timeline(entries: &[TimelineEntry], factor: f64) -> Vec<TimelineEntry> {
    entries
        .iter()
        .map(|entry| TimelineEntry {
            kind: entry.kind.clone(),
            text: entry.text.clone(),
            start_time: entry.start_time * factor,
            end_time: entry.end_time * factor,
            timeline: entry
                .timeline
                .as_ref()
                .map(|children| linear_rescale_timeline(children, factor)),
        })
        .collect()
}

/// Public operation #3: proportionally rescale each reference word's nested
/// phone durations onto the matching source word's span. No acoustic
/// information is used; this is the cheap fallback `phones::align_phone_timelines`
/// itself reaches for when a word is too short to extract a single MFCC frame.
pub fn interpolate_phone_timelines(
    source_word_timeline: &[TimelineEntry],
    reference_timeline: &[TimelineEntry],
) -> Result<Vec<TimelineEntry>> {
    if source_word_timeline.len() != reference_timeline.len() {
        return Err(AlignmentError::InvariantViolation(format!(
            "source word count {} does not match reference word count {}",
            source_word_timeline.len(),
            reference_timeline.len()
        )));
    }

    Ok(source_word_timeline
        .iter()
        .zip(reference_timeline.iter())
        .map(|(source_word, reference_word)| interpolate_word(source_word, reference_word))
        .collect())
}

pub(crate) fn interpolate_word(source_word: &TimelineEntry, reference_word: &TimelineEntry) -> TimelineEntry {
    let reference_phones = match &reference_word.timeline {
        Some(phones) if !phones.is_empty() => phones,
        _ => {
            return TimelineEntry {
                kind: source_word.kind.clone(),
                text: source_word.text.clone(),
                start_time: source_word.start_time,
                end_time: source_word.end_time,
                timeline: None,
            }
        }
    };

    let reference_duration = reference_word.end_time - reference_word.start_time;
    let source_duration = source_word.end_time - source_word.start_time;

    let mapped_phones: Vec<TimelineEntry> = reference_phones
        .iter()
        .map(|phone| {
            let (start_fraction, end_fraction) = if reference_duration > 0.0 {
                (
                    (phone.start_time - reference_word.start_time) / reference_duration,
                    (phone.end_time - reference_word.start_time) / reference_duration,
                )
            } else {
                (0.0, 0.0)
            };
            let start_time = source_word.start_time + start_fraction * source_duration;
            let end_time = (source_word.start_time + end_fraction * source_duration).max(start_time);
            TimelineEntry::leaf(phone.kind.clone(), phone.text.clone(), start_time, end_time)
        })
        .collect();

    TimelineEntry {
        kind: source_word.kind.clone(),
        text: source_word.text.clone(),
        start_time: source_word.start_time,
        end_time: source_word.end_time,
        timeline: Some(mapped_phones),
    }
}

/// Public operation #2: align `reference_timeline` (defined against
/// `reference_audio`) onto `source_audio`, when only a rough word-level
/// `recognition_timeline` over `source_audio` is available — no direct DTW
/// between source and reference audio is possible because they were not
/// spoken by the same voice at the same pace.
///
/// Algorithm (spec §4.5): if `recognition_timeline` is empty, there is
/// nothing to anchor against, so fall back to a uniform
/// `sourceDuration / referenceDuration` rescale of `reference_timeline`.
/// Otherwise, synthesize an intermediate recording from the recognized
/// words, align `reference_timeline` onto that synthesized audio via C3
/// (`align_using_dtw`), then carry those synthesized-axis timestamps onto
/// source time through a per-phone anchor table built from the synthesized
/// timeline and `recognition_timeline`. Phones are attached to the composed
/// word spans per `phone_method`.
#[allow(clippy::too_many_arguments)]
pub fn align_using_dtw_with_recognition(
    source_audio: &RawAudio,
    reference_audio: &RawAudio,
    reference_timeline: &[TimelineEntry],
    recognition_timeline: &[TimelineEntry],
    granularities: &[Granularity],
    window_durations: &[f64],
    tts_options: &TtsOptions,
    phone_method: PhoneAlignmentMethod,
    tts: &dyn TtsEngine,
    mfcc: &dyn MfccExtractor,
) -> Result<Vec<TimelineEntry>> {
    if recognition_timeline.is_empty() {
        let reference_duration = reference_audio.duration_seconds();
        let factor = if reference_duration > 0.0 {
            source_audio.duration_seconds() / reference_duration
        } else {
            0.0
        };
        return Ok(linear_rescale_timeline(reference_timeline, factor));
    }

    let recognized_words: Vec<&str> = recognition_timeline.iter().map(|e| e.text.as_str()).collect();
    let synth = create_alignment_reference(&recognized_words, tts, tts_options)?;

    let mapped_on_synth_axis = align_using_dtw(
        &synth.reference_audio,
        reference_audio,
        reference_timeline,
        granularities,
        window_durations,
        mfcc,
    )?;

    let anchors = build_anchor_table(&synth.reference_timeline, recognition_timeline);
    let mut cursor = AnchorCursor::new(&anchors);
    let composed_words: Vec<TimelineEntry> = mapped_on_synth_axis
        .iter()
        .map(|entry| {
            let start = cursor.project(entry.start_time);
            let end = cursor.project(entry.end_time).max(start);
            TimelineEntry::leaf(entry.kind.clone(), entry.text.clone(), start, end)
        })
        .collect();

    match phone_method {
        PhoneAlignmentMethod::Interpolation => interpolate_phone_timelines(&composed_words, reference_timeline),
        PhoneAlignmentMethod::Dtw => {
            phones::align_phone_timelines(source_audio, &composed_words, reference_audio, reference_timeline, 60.0, mfcc)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mfcc::DefaultMfccExtractor;
    use crate::tts::SilentTtsEngine;
    use crate::types::TimelineItemKind;

    fn word(text: &str, start: f64, end: f64) -> TimelineEntry {
        TimelineEntry::leaf(TimelineItemKind::Word, text, start, end)
    }

    fn word_with_phones(text: &str, start: f64, end: f64) -> TimelineEntry {
        let mid = (start + end) / 2.0;
        TimelineEntry {
            kind: TimelineItemKind::Word,
            text: text.into(),
            start_time: start,
            end_time: end,
            timeline: Some(vec![
                TimelineEntry::leaf(TimelineItemKind::Phone, "a", start, mid),
                TimelineEntry::leaf(TimelineItemKind::Phone, "b", mid, end),
            ]),
        }
    }

    fn sine_audio(sr: u32, freq: f64, seconds: f64) -> RawAudio {
        let n = (sr as f64 * seconds) as usize;
        let samples: Vec<f32> = (0..n)
            .map(|i| ((i as f64 / sr as f64) * freq * std::f64::consts::TAU).sin() as f32)
            .collect();
        RawAudio::mono(samples, sr)
    }

    #[test]
    fn phone_alignment_method_rejects_unknown_string() {
        let result = PhoneAlignmentMethod::try_from("fuzzy");
        assert!(matches!(result, Err(AlignmentError::UnsupportedSelector(_))));
    }

    #[test]
    fn anchor_table_includes_phone_anchors_when_both_sides_have_phones() {
        let synth = vec![word_with_phones("the", 0.0, 0.4), word_with_phones("fox", 0.4, 1.2)];
        let recognition = vec![word_with_phones("the", 0.1, 0.5), word_with_phones("fox", 0.5, 1.3)];
        let anchors = build_anchor_table(&synth, &recognition);
        // 2 words * (word-start + 2 phones * 2 boundaries + word-end) = 2 * 6 = 12
        assert_eq!(anchors.len(), 12);
    }

    #[test]
    fn anchor_table_falls_back_to_word_anchors_without_phone_children() {
        let synth = vec![word("the", 0.0, 0.4), word("fox", 0.4, 1.2)];
        let recognition = vec![word("the", 0.1, 0.5), word("fox", 0.5, 1.3)];
        let anchors = build_anchor_table(&synth, &recognition);
        assert_eq!(anchors.len(), 4);
    }

    #[test]
    fn anchor_cursor_prefers_left_anchor_on_tie() {
        let anchors = vec![
            Anchor { synth_time: 0.0, recognition_time: 0.0 },
            Anchor { synth_time: 2.0, recognition_time: 10.0 },
        ];
        let mut cursor = AnchorCursor::new(&anchors);
        // 1.0 is equidistant (1.0) from both anchors; left wins.
        let projected = cursor.project(1.0);
        assert_eq!(projected, 0.0 + (1.0 - 0.0));
    }

    #[test]
    fn anchor_cursor_is_identity_with_no_anchors() {
        let anchors: Vec<Anchor> = vec![];
        let mut cursor = AnchorCursor::new(&anchors);
        assert_eq!(cursor.project(3.5), 3.5);
    }

    #[test]
    fn interpolate_phone_timelines_rejects_mismatched_word_counts() {
        let source = vec![word("a", 0.0, 1.0)];
        let reference = vec![];
        assert!(interpolate_phone_timelines(&source, &reference).is_err());
    }

    #[test]
    fn empty_recognition_timeline_uses_linear_rescale_fallback() {
        // spec scenario 4: source is 2x the reference's duration, recognition
        // unavailable, so every reference timestamp is simply doubled.
        let reference_timeline = vec![word("x", 0.0, 1.0), word("y", 1.0, 2.0)];
        let reference_audio = RawAudio::mono(vec![0.0; 16000 * 2], 16000);
        let source_audio = RawAudio::mono(vec![0.0; 16000 * 4], 16000);
        let tts = SilentTtsEngine::default();
        let mfcc = DefaultMfccExtractor::default();

        let mapped = align_using_dtw_with_recognition(
            &source_audio,
            &reference_audio,
            &reference_timeline,
            &[],
            &[Granularity::Medium],
            &[2.0],
            &TtsOptions::default(),
            PhoneAlignmentMethod::Interpolation,
            &tts,
            &mfcc,
        )
        .unwrap();

        assert_eq!(mapped.len(), 2);
        assert!((mapped[0].start_time - 0.0).abs() < 1e-9);
        assert!((mapped[0].end_time - 2.0).abs() < 1e-9);
        assert!((mapped[1].start_time - 2.0).abs() < 1e-9);
        assert!((mapped[1].end_time - 4.0).abs() < 1e-9);
    }

    #[test]
    fn align_using_dtw_with_recognition_interpolation_produces_one_word_per_reference_word() {
        let source_audio = sine_audio(16000, 440.0, 2.0);
        let reference_audio = sine_audio(16000, 440.0, 2.0);
        let reference_timeline = vec![word("hi", 0.0, 1.0), word("there", 1.0, 2.0)];
        let recognition_timeline = vec![word("hi", 0.0, 1.0), word("there", 1.0, 2.0)];
        let tts = SilentTtsEngine::default();
        let mfcc = DefaultMfccExtractor::default();

        let mapped = align_using_dtw_with_recognition(
            &source_audio,
            &reference_audio,
            &reference_timeline,
            &recognition_timeline,
            &[Granularity::Medium],
            &[2.0],
            &TtsOptions::default(),
            PhoneAlignmentMethod::Interpolation,
            &tts,
            &mfcc,
        )
        .unwrap();

        assert_eq!(mapped.len(), 2);
        assert_eq!(mapped[0].text, "hi");
        assert_eq!(mapped[1].text, "there");
    }
}
