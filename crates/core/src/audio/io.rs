//! Audio I/O: WAV read/write, resampling, range extraction, downmixing.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

use crate::types::RawAudio;

/// Read a WAV file and return (samples_f64_normalized, sample_rate).
///
/// - Normalizes int16/int32 to f64 in [-1, 1]
/// - Passes through float WAVs as f64
/// - Takes the first channel if stereo/multi-channel
pub fn read_wav(path: &Path) -> Result<(Vec<f64>, u32)> {
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();
    let sample_rate = spec.sample_rate;
    let channels = spec.channels as usize;

    let samples: Vec<f64> = match spec.sample_format {
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            let max_val = (1i64 << (bits - 1)) as f64;
            reader
                .into_samples::<i32>()
                .enumerate()
                .filter_map(|(i, s)| {
                    if i % channels == 0 {
                        Some(s.map(|v| v as f64 / max_val))
                    } else {
                        let _ = s;
                        None
                    }
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to read WAV samples")?
        }
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .enumerate()
            .filter_map(|(i, s)| {
                if i % channels == 0 {
                    Some(s.map(|v| v as f64))
                } else {
                    let _ = s;
                    None
                }
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to read WAV samples")?,
    };

    Ok((samples, sample_rate))
}

/// Read a WAV file directly into a mono `RawAudio`.
pub fn read_wav_audio(path: &Path) -> Result<RawAudio> {
    let (samples, sample_rate) = read_wav(path)?;
    Ok(RawAudio::mono(
        samples.into_iter().map(|s| s as f32).collect(),
        sample_rate,
    ))
}

/// Write f64 samples to a 16-bit PCM WAV file. Clips to [-1, 1].
pub fn write_wav(path: &Path, samples: &[f64], sample_rate: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;

    for &sample in samples {
        let clipped = sample.clamp(-1.0, 1.0);
        let int16 = (clipped * 32767.0) as i16;
        writer.write_sample(int16)?;
    }

    writer.finalize().context("Failed to finalize WAV file")?;
    Ok(())
}

/// Write a mono `RawAudio` to a 16-bit PCM WAV file.
pub fn write_wav_audio(path: &Path, audio: &RawAudio) -> Result<()> {
    write_wav(path, &audio.channel0_f64(), audio.sample_rate)
}

/// Get duration of a WAV file in seconds.
pub fn get_wav_duration(path: &Path) -> Result<f64> {
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;
    let spec = reader.spec();
    let num_samples = reader.len() as f64;
    let channels = spec.channels as f64;
    Ok(num_samples / channels / spec.sample_rate as f64)
}

/// Extract a time range from samples. Returns the slice as a new Vec, clamped
/// to valid bounds.
pub fn extract_range(samples: &[f64], sample_rate: u32, start_s: f64, end_s: f64) -> Vec<f64> {
    let start_idx = (start_s * sample_rate as f64).round().max(0.0) as usize;
    let end_idx = (end_s * sample_rate as f64).round().max(0.0) as usize;
    let start_idx = start_idx.min(samples.len());
    let end_idx = end_idx.min(samples.len());
    if start_idx >= end_idx {
        return vec![];
    }
    samples[start_idx..end_idx].to_vec()
}

/// Extract a time range from a `RawAudio` as a new mono `RawAudio`.
pub fn extract_audio_range(audio: &RawAudio, start_s: f64, end_s: f64) -> RawAudio {
    let mono = audio.channel0_f64();
    let extracted = extract_range(&mono, audio.sample_rate, start_s, end_s);
    RawAudio::mono(
        extracted.into_iter().map(|s| s as f32).collect(),
        audio.sample_rate,
    )
}

/// Downmix all channels to mono by averaging, then peak-normalize to [-1, 1].
pub fn downmix_to_mono_and_normalize(audio: &RawAudio) -> Vec<f64> {
    if audio.channels.is_empty() {
        return vec![];
    }
    let len = audio.channels.iter().map(|c| c.len()).max().unwrap_or(0);
    let mut mono = vec![0.0f64; len];
    for channel in &audio.channels {
        for (i, &sample) in channel.iter().enumerate() {
            mono[i] += sample as f64;
        }
    }
    let n = audio.channels.len() as f64;
    for sample in mono.iter_mut() {
        *sample /= n;
    }
    let peak = mono.iter().map(|v| v.abs()).fold(0.0f64, f64::max);
    if peak > 1e-12 {
        for sample in mono.iter_mut() {
            *sample /= peak;
        }
    }
    mono
}

/// Resample audio from source sample rate to target sample rate using rubato.
pub fn resample(samples: &[f64], from_sr: u32, to_sr: u32) -> Result<Vec<f64>> {
    if from_sr == to_sr {
        return Ok(samples.to_vec());
    }
    if samples.is_empty() {
        return Ok(vec![]);
    }

    use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_sr as f64 / from_sr as f64;
    let mut resampler = SincFixedIn::<f64>::new(ratio, 2.0, params, samples.len(), 1)?;

    let input = vec![samples.to_vec()];
    let output = resampler.process(&input, None)?;

    Ok(output.into_iter().next().unwrap_or_default())
}

/// Resample to the 16 kHz mono rate the alignment reference builder and most
/// MFCC pipelines expect.
pub fn resample_to_16k(samples: &[f64], from_sr: u32) -> Result<Vec<f64>> {
    resample(samples, from_sr, 16000)
}
