//! Core data model: raw audio, timelines, and granularity presets.

use serde::{Deserialize, Serialize};

/// A multi-channel PCM recording held entirely in memory.
///
/// Samples are 32-bit floats in `[-1, 1]`; DSP code converts to `f64`
/// internally, mirroring how the whisper-rs boundary converts in the other
/// direction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawAudio {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl RawAudio {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
        }
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(vec![samples], sample_rate)
    }

    /// Number of samples in channel 0, or 0 if there are no channels.
    pub fn sample_count(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_count() as f64 / self.sample_rate as f64
    }

    /// Channel 0 as `f64`, the precision DSP code works in throughout.
    pub fn channel0_f64(&self) -> Vec<f64> {
        self.channels
            .first()
            .map(|c| c.iter().map(|&s| s as f64).collect())
            .unwrap_or_default()
    }
}

/// Category tag for a `TimelineEntry`. Opaque to the alignment core;
/// preserved through a pass unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum TimelineItemKind {
    Segment,
    Sentence,
    Word,
    Token,
    Phone,
    Custom(String),
}

impl From<String> for TimelineItemKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "segment" => TimelineItemKind::Segment,
            "sentence" => TimelineItemKind::Sentence,
            "word" => TimelineItemKind::Word,
            "token" => TimelineItemKind::Token,
            "phone" => TimelineItemKind::Phone,
            _ => TimelineItemKind::Custom(s),
        }
    }
}

impl From<TimelineItemKind> for String {
    fn from(kind: TimelineItemKind) -> Self {
        match kind {
            TimelineItemKind::Segment => "segment".to_string(),
            TimelineItemKind::Sentence => "sentence".to_string(),
            TimelineItemKind::Word => "word".to_string(),
            TimelineItemKind::Token => "token".to_string(),
            TimelineItemKind::Phone => "phone".to_string(),
            TimelineItemKind::Custom(s) => s,
        }
    }
}

/// A labeled half-open time interval, optionally with a nested child
/// timeline (segment → word → phone, etc).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub kind: TimelineItemKind,
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Vec<TimelineEntry>>,
}

impl TimelineEntry {
    pub fn leaf(kind: TimelineItemKind, text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            kind,
            text: text.into(),
            start_time: start,
            end_time: end,
            timeline: None,
        }
    }
}

/// MFCC window/hop/FFT presets. Coarser granularities locate the global
/// alignment corridor cheaply; finer ones refine inside a narrow band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    XxLow,
    XLow,
    Low,
    Medium,
    High,
    XHigh,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GranularityParams {
    pub window_duration: f64,
    pub hop_duration: f64,
    pub fft_order: usize,
}

impl Granularity {
    pub fn params(&self) -> GranularityParams {
        let (window_duration, hop_duration, fft_order) = match self {
            Granularity::XxLow => (0.400, 0.160, 8192),
            Granularity::XLow => (0.200, 0.080, 4096),
            Granularity::Low => (0.100, 0.040, 2048),
            Granularity::Medium => (0.050, 0.020, 1024),
            Granularity::High => (0.025, 0.010, 512),
            Granularity::XHigh => (0.020, 0.005, 512),
        };
        GranularityParams {
            window_duration,
            hop_duration,
            fft_order,
        }
    }

    pub fn frames_per_second(&self) -> f64 {
        1.0 / self.params().hop_duration
    }
}

/// Options passed to an `MfccExtractor`. The multi-pass driver always forces
/// `zero_first_coefficient = true` (energy invariance), but the field is
/// exposed so other callers (e.g. C6's word-level sub-alignment) can set it
/// explicitly too.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MfccOptions {
    pub window_duration: f64,
    pub hop_duration: f64,
    pub fft_order: usize,
    pub zero_first_coefficient: bool,
}

impl From<GranularityParams> for MfccOptions {
    fn from(params: GranularityParams) -> Self {
        Self {
            window_duration: params.window_duration,
            hop_duration: params.hop_duration,
            fft_order: params.fft_order,
            zero_first_coefficient: true,
        }
    }
}
