//! Audio analysis: RMS energy and dBFS-based silence detection used by the
//! timeline mapper's silence trim (spec threshold: -40 dBFS).

/// Compute RMS energy of an entire signal.
pub fn compute_rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// RMS-in-dBFS of a signal. `-inf` for perfect silence, matching the
/// convention that silence never passes a finite threshold.
pub fn rms_dbfs(samples: &[f64]) -> f64 {
    let rms = compute_rms(samples);
    if rms <= 0.0 {
        return f64::NEG_INFINITY;
    }
    20.0 * rms.log10()
}

const ANALYSIS_FRAME_MS: u64 = 10;

fn analysis_frame_len(sample_rate: u32) -> usize {
    ((sample_rate as u64 * ANALYSIS_FRAME_MS) / 1000).max(1) as usize
}

/// Count of samples at the start of `samples` covered by consecutive short
/// analysis frames below `threshold_db` RMS-in-dBFS.
pub fn get_starting_silent_sample_count(samples: &[f64], sample_rate: u32, threshold_db: f64) -> usize {
    let frame_len = analysis_frame_len(sample_rate);
    let mut idx = 0;
    while idx < samples.len() {
        let end = (idx + frame_len).min(samples.len());
        if rms_dbfs(&samples[idx..end]) >= threshold_db {
            break;
        }
        idx = end;
    }
    idx
}

/// Count of samples at the end of `samples` covered by consecutive short
/// analysis frames below `threshold_db` RMS-in-dBFS.
pub fn get_ending_silent_sample_count(samples: &[f64], sample_rate: u32, threshold_db: f64) -> usize {
    let frame_len = analysis_frame_len(sample_rate);
    let mut idx = samples.len();
    while idx > 0 {
        let start = idx.saturating_sub(frame_len);
        if rms_dbfs(&samples[start..idx]) >= threshold_db {
            break;
        }
        idx = start;
    }
    samples.len() - idx
}
