//! Synthesized-reference generation used by indirect alignment (C5): turn a
//! recognized-text timeline into an intermediate audio + phone timeline that
//! direct DTW can anchor against when no real reference recording exists.

use crate::error::{AlignmentError, Result};
use crate::types::{RawAudio, TimelineEntry, TimelineItemKind};

#[derive(Debug, Clone)]
pub struct TtsOptions {
    pub voice_name: String,
    pub sample_rate: u32,
}

impl Default for TtsOptions {
    fn default() -> Self {
        Self {
            voice_name: "default".to_string(),
            sample_rate: 16000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SynthesizedFragments {
    pub audio: RawAudio,
    pub timeline: Vec<TimelineEntry>,
}

/// Pluggable text-to-speech backend, mirroring the `MfccExtractor`
/// trait/factory pattern used for the DSP frontend.
pub trait TtsEngine: Send + Sync {
    fn synthesize(&self, words: &[&str], options: &TtsOptions) -> Result<SynthesizedFragments>;
}

/// Deterministic placeholder engine: produces silence sized to a fixed
/// per-word duration, with phones spaced evenly inside each word. Useful for
/// tests and for callers that only need the anchor-table machinery exercised,
/// not acoustic realism.
pub struct SilentTtsEngine {
    pub seconds_per_word: f64,
}

impl Default for SilentTtsEngine {
    fn default() -> Self {
        Self { seconds_per_word: 0.4 }
    }
}

impl TtsEngine for SilentTtsEngine {
    fn synthesize(&self, words: &[&str], options: &TtsOptions) -> Result<SynthesizedFragments> {
        if words.is_empty() {
            return Err(AlignmentError::InvariantViolation(
                "cannot synthesize an empty word list".into(),
            ));
        }

        let mut timeline = Vec::with_capacity(words.len());
        let mut cursor = 0.0;
        for &word in words {
            let start = cursor;
            let end = cursor + self.seconds_per_word;

            let phones = synthetic_phones(word, start, end);
            timeline.push(TimelineEntry {
                kind: TimelineItemKind::Word,
                text: word.to_string(),
                start_time: start,
                end_time: end,
                timeline: Some(phones),
            });
            cursor = end;
        }

        let sample_count = (cursor * options.sample_rate as f64).ceil() as usize;
        let audio = RawAudio::mono(vec![0.0f32; sample_count], options.sample_rate);

        Ok(SynthesizedFragments { audio, timeline })
    }
}

/// A crude grapheme-per-phone placeholder: each character of `word` becomes
/// one evenly-spaced phone. Good enough to exercise anchor-table alignment
/// without a real phonemizer.
fn synthetic_phones(word: &str, start: f64, end: f64) -> Vec<TimelineEntry> {
    let chars: Vec<char> = word.chars().collect();
    if chars.is_empty() {
        return vec![];
    }
    let duration = end - start;
    let step = duration / chars.len() as f64;
    chars
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let phone_start = start + i as f64 * step;
            let phone_end = if i + 1 == chars.len() { end } else { phone_start + step };
            TimelineEntry::leaf(TimelineItemKind::Phone, c.to_string(), phone_start, phone_end)
        })
        .collect()
}

/// Select a `TtsEngine` by name, following the same selector-factory
/// convention as `get_mfcc_extractor`.
pub fn get_tts_engine(selector: &str) -> Result<Box<dyn TtsEngine>> {
    match selector {
        "default" | "silent" => Ok(Box::new(SilentTtsEngine::default())),
        other => Err(AlignmentError::UnsupportedSelector(format!("ttsEngine: '{}'", other))),
    }
}

/// An intermediate reference built purely from recognized text: synthesized
/// audio paired with the phone timeline that generated it.
#[derive(Debug, Clone)]
pub struct AlignmentReference {
    pub reference_audio: RawAudio,
    pub reference_timeline: Vec<TimelineEntry>,
    pub voice_name: String,
}

/// Public operation #5: synthesize a reference recording and phone timeline
/// for the given word sequence, for use when no natural reference recording
/// is available.
pub fn create_alignment_reference(
    words: &[&str],
    tts: &dyn TtsEngine,
    options: &TtsOptions,
) -> Result<AlignmentReference> {
    let fragments = tts.synthesize(words, options)?;
    Ok(AlignmentReference {
        reference_audio: fragments.audio,
        reference_timeline: fragments.timeline,
        voice_name: options.voice_name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_engine_rejects_empty_word_list() {
        let engine = SilentTtsEngine::default();
        let result = engine.synthesize(&[], &TtsOptions::default());
        assert!(matches!(result, Err(AlignmentError::InvariantViolation(_))));
    }

    #[test]
    fn silent_engine_produces_word_and_phone_timeline() {
        let engine = SilentTtsEngine::default();
        let fragments = engine.synthesize(&["hi", "there"], &TtsOptions::default()).unwrap();
        assert_eq!(fragments.timeline.len(), 2);
        assert!(fragments.timeline[0].timeline.as_ref().unwrap().len() == 2);
        assert!(fragments.audio.duration_seconds() > 0.0);
    }

    #[test]
    fn get_tts_engine_rejects_unknown_selector() {
        let result = get_tts_engine("cloud-neural-voice");
        assert!(matches!(result, Err(AlignmentError::UnsupportedSelector(_))));
    }

    #[test]
    fn create_alignment_reference_wires_voice_name_through() {
        let tts = SilentTtsEngine::default();
        let options = TtsOptions {
            voice_name: "narrator".into(),
            sample_rate: 16000,
        };
        let reference = create_alignment_reference(&["go"], &tts, &options).unwrap();
        assert_eq!(reference.voice_name, "narrator");
        assert_eq!(reference.reference_timeline.len(), 1);
    }
}
