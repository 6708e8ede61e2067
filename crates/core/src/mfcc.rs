//! MFCC feature extraction, consumed only through the `MfccExtractor` trait
//! (spec §6's external interface). `DefaultMfccExtractor` is a real,
//! self-contained implementation — framing, Hamming window, FFT via
//! `rustfft`, mel filterbank, log, DCT-II — so the DTW engine has something
//! concrete to run against; callers that have a production frontend can
//! implement the trait themselves and never touch this one.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::{AlignmentError, Result};
use crate::types::{MfccOptions, RawAudio};

pub trait MfccExtractor: Send + Sync {
    fn compute(&self, audio: &RawAudio, options: &MfccOptions) -> Result<Vec<Vec<f64>>>;
}

/// rustfft-backed MFCC pipeline: 26 mel filters, 13 cepstral coefficients.
pub struct DefaultMfccExtractor {
    pub num_mel_filters: usize,
    pub num_coefficients: usize,
}

impl Default for DefaultMfccExtractor {
    fn default() -> Self {
        Self {
            num_mel_filters: 26,
            num_coefficients: 13,
        }
    }
}

impl MfccExtractor for DefaultMfccExtractor {
    fn compute(&self, audio: &RawAudio, options: &MfccOptions) -> Result<Vec<Vec<f64>>> {
        let samples = audio.channel0_f64();
        let sample_rate = audio.sample_rate as f64;
        if samples.is_empty() || sample_rate <= 0.0 {
            return Ok(vec![]);
        }

        let window_len = ((options.window_duration * sample_rate).round() as usize).max(1);
        let hop_len = ((options.hop_duration * sample_rate).round() as usize).max(1);
        let fft_len = options.fft_order.max(window_len.next_power_of_two());

        let hamming = hamming_window(window_len);
        let mel_filters = build_mel_filterbank(self.num_mel_filters, fft_len, sample_rate);

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(fft_len);

        let frame_count = if samples.len() <= window_len {
            1
        } else {
            (samples.len() - window_len) / hop_len + 1
        };

        let mut frames = Vec::with_capacity(frame_count);
        for frame_idx in 0..frame_count {
            let start = frame_idx * hop_len;
            let mut buf = vec![Complex::new(0.0, 0.0); fft_len];
            for k in 0..window_len {
                let sample = samples.get(start + k).copied().unwrap_or(0.0);
                buf[k] = Complex::new(sample * hamming[k], 0.0);
            }
            fft.process(&mut buf);

            let power: Vec<f64> = buf[..fft_len / 2 + 1].iter().map(|c| c.norm_sqr()).collect();
            let log_mel_energies: Vec<f64> = mel_filters
                .iter()
                .map(|filter| {
                    let energy: f64 = filter.iter().zip(power.iter()).map(|(w, p)| w * p).sum();
                    energy.max(1e-10).ln()
                })
                .collect();

            let mut cepstrum = dct2(&log_mel_energies, self.num_coefficients);
            if options.zero_first_coefficient {
                if let Some(first) = cepstrum.first_mut() {
                    *first = 0.0;
                }
            }
            frames.push(cepstrum);
        }

        Ok(frames)
    }
}

fn hamming_window(len: usize) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    (0..len)
        .map(|n| 0.54 - 0.46 * (std::f64::consts::TAU * n as f64 / (len - 1) as f64).cos())
        .collect()
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank over the one-sided power spectrum of an
/// `fft_len`-point FFT.
fn build_mel_filterbank(num_filters: usize, fft_len: usize, sample_rate: f64) -> Vec<Vec<f64>> {
    let num_bins = fft_len / 2 + 1;
    let mel_min = hz_to_mel(0.0);
    let mel_max = hz_to_mel(sample_rate / 2.0);

    let mel_points: Vec<f64> = (0..=num_filters + 1)
        .map(|i| mel_min + (mel_max - mel_min) * i as f64 / (num_filters + 1) as f64)
        .collect();
    let bin_points: Vec<usize> = mel_points
        .iter()
        .map(|&mel| {
            let hz = mel_to_hz(mel);
            ((fft_len as f64 + 1.0) * hz / sample_rate).floor() as usize
        })
        .map(|bin| bin.min(num_bins - 1))
        .collect();

    (0..num_filters)
        .map(|m| {
            let mut filter = vec![0.0; num_bins];
            let (left, center, right) = (bin_points[m], bin_points[m + 1], bin_points[m + 2]);
            for bin in left..center {
                if center > left {
                    filter[bin] = (bin - left) as f64 / (center - left) as f64;
                }
            }
            for bin in center..right {
                if right > center {
                    filter[bin] = (right - bin) as f64 / (right - center) as f64;
                }
            }
            filter
        })
        .collect()
}

/// Type-II DCT, keeping only the first `num_coefficients` outputs.
fn dct2(input: &[f64], num_coefficients: usize) -> Vec<f64> {
    let n = input.len();
    if n == 0 {
        return vec![0.0; num_coefficients];
    }
    (0..num_coefficients)
        .map(|k| {
            input
                .iter()
                .enumerate()
                .map(|(i, &x)| x * (std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n as f64)).cos())
                .sum()
        })
        .collect()
}

/// Select an `MfccExtractor` by name, mirroring the aligner-selection factory
/// pattern used throughout this codebase.
pub fn get_mfcc_extractor(selector: &str) -> Result<Box<dyn MfccExtractor>> {
    match selector {
        "default" | "auto" => Ok(Box::new(DefaultMfccExtractor::default())),
        other => Err(AlignmentError::UnsupportedSelector(format!(
            "mfccExtractor: '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Granularity, RawAudio};

    fn sine_audio(sr: u32, freq: f64, seconds: f64) -> RawAudio {
        let n = (sr as f64 * seconds) as usize;
        let samples: Vec<f32> = (0..n)
            .map(|i| ((i as f64 / sr as f64) * freq * std::f64::consts::TAU).sin() as f32)
            .collect();
        RawAudio::mono(samples, sr)
    }

    #[test]
    fn compute_returns_frames_for_nonempty_audio() {
        let audio = sine_audio(16000, 440.0, 1.0);
        let options: MfccOptions = Granularity::Medium.params().into();
        let extractor = DefaultMfccExtractor::default();
        let frames = extractor.compute(&audio, &options).unwrap();
        assert!(!frames.is_empty());
        assert!(frames.iter().all(|f| f.len() == extractor.num_coefficients));
    }

    #[test]
    fn compute_zeroes_first_coefficient_when_requested() {
        let audio = sine_audio(16000, 440.0, 0.5);
        let mut options: MfccOptions = Granularity::High.params().into();
        options.zero_first_coefficient = true;
        let extractor = DefaultMfccExtractor::default();
        let frames = extractor.compute(&audio, &options).unwrap();
        assert!(frames.iter().all(|f| f[0] == 0.0));
    }

    #[test]
    fn compute_empty_audio_returns_empty() {
        let audio = RawAudio::mono(vec![], 16000);
        let options: MfccOptions = Granularity::Medium.params().into();
        let extractor = DefaultMfccExtractor::default();
        let frames = extractor.compute(&audio, &options).unwrap();
        assert!(frames.is_empty());
    }

    #[test]
    fn compute_shorter_than_one_window_yields_one_frame() {
        let audio = sine_audio(16000, 440.0, 0.01);
        let options: MfccOptions = Granularity::Low.params().into();
        let extractor = DefaultMfccExtractor::default();
        let frames = extractor.compute(&audio, &options).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn get_mfcc_extractor_rejects_unknown_selector() {
        let result = get_mfcc_extractor("neural-frontend-v2");
        assert!(matches!(result, Err(AlignmentError::UnsupportedSelector(_))));
    }

    #[test]
    fn mel_filterbank_rows_sum_to_nonzero_energy() {
        let filters = build_mel_filterbank(26, 1024, 16000.0);
        assert_eq!(filters.len(), 26);
        assert!(filters.iter().all(|f| f.iter().sum::<f64>() > 0.0));
    }
}
