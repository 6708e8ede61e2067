//! Windowed DTW aligner (C2): minimum-cost monotone path under a band
//! constraint, either a fixed Sakoe-Chiba diagonal band or a per-row band
//! centered on a prior pass's result.

use crate::dtw::path::{AlignmentPath, PathPoint};
use crate::error::{AlignmentError, Result};

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Bytes a ragged banded cost matrix of `r` rows and half-width `window`
/// would occupy, for callers to check before allocating (spec §5/§9).
pub fn estimate_banded_matrix_bytes(r: usize, window: usize) -> usize {
    r * (2 * window + 1) * std::mem::size_of::<f64>()
}

#[derive(Debug, Clone, Copy)]
enum Predecessor {
    Diagonal,
    Up,
    Left,
    None,
}

/// Align `reference` against `source` under a band of half-width `window`.
/// `centers[i]`, when given, recenters row `i`'s band instead of the
/// diagonal Sakoe-Chiba default.
pub fn align_mfcc_dtw(
    reference: &[Vec<f64>],
    source: &[Vec<f64>],
    window: usize,
    cost_fn: Option<&dyn Fn(&[f64], &[f64]) -> f64>,
    centers: Option<&[usize]>,
) -> Result<AlignmentPath> {
    let r = reference.len();
    let s = source.len();
    if r == 0 || s == 0 {
        return Err(AlignmentError::InvariantViolation(
            "align_mfcc_dtw requires non-empty reference and source sequences".into(),
        ));
    }
    let window = window.max(1);
    let cost: &dyn Fn(&[f64], &[f64]) -> f64 = match cost_fn {
        Some(f) => f,
        None => &euclidean_distance,
    };

    let band: Vec<(usize, usize)> = (0..r)
        .map(|i| {
            let center = match centers {
                Some(c) if !c.is_empty() => c[i.min(c.len() - 1)],
                _ => (((i * s) as f64) / r as f64).round() as usize,
            };
            let center = center.min(s - 1);
            let lo = center.saturating_sub(window);
            let hi = (center + window).min(s - 1);
            (lo, hi)
        })
        .collect();

    let mut d: Vec<Vec<f64>> = Vec::with_capacity(r);
    let mut back: Vec<Vec<Predecessor>> = Vec::with_capacity(r);

    for i in 0..r {
        let (lo, hi) = band[i];
        let width = hi - lo + 1;
        let mut row = vec![f64::INFINITY; width];
        let mut back_row = vec![Predecessor::None; width];

        for j in lo..=hi {
            let local = j - lo;
            let c = cost(&reference[i], &source[j]);

            let diag = if i > 0 && j > 0 {
                band_cell(&d, &band, i - 1, j - 1)
            } else {
                None
            };
            let up = if i > 0 { band_cell(&d, &band, i - 1, j) } else { None };
            let left = if j > lo { Some(row[local - 1]) } else { None };

            let mut best = f64::INFINITY;
            let mut predecessor = Predecessor::None;
            for (value, kind) in [
                (diag, Predecessor::Diagonal),
                (up, Predecessor::Up),
                (left, Predecessor::Left),
            ] {
                if let Some(v) = value {
                    if v < best {
                        best = v;
                        predecessor = kind;
                    }
                }
            }

            row[local] = c + if best.is_finite() { best } else { 0.0 };
            back_row[local] = predecessor;
        }
        d.push(row);
        back.push(back_row);
    }

    // Backtrack from (r-1, s-1). If a caller-supplied `centers` band is too
    // narrow to cover the true end cell, clamp into the last row's band
    // instead of failing (spec §4.2 failure modes).
    let (last_lo, last_hi) = band[r - 1];
    let mut i = r - 1;
    let mut j = (s - 1).clamp(last_lo, last_hi);

    let mut path = Vec::with_capacity(r.max(s));
    loop {
        path.push(PathPoint {
            reference_frame: i,
            source_frame: j,
        });
        let (lo, _) = band[i];
        let local = j - lo;
        match back[i][local] {
            Predecessor::Diagonal => {
                i -= 1;
                j -= 1;
            }
            Predecessor::Up => {
                i -= 1;
            }
            Predecessor::Left => {
                j -= 1;
            }
            Predecessor::None => break,
        }
    }
    path.reverse();
    Ok(path)
}

fn band_cell(d: &[Vec<f64>], band: &[(usize, usize)], i: usize, j: usize) -> Option<f64> {
    let (lo, hi) = band[i];
    if j < lo || j > hi {
        return None;
    }
    Some(d[i][j - lo])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_sequences() {
        let empty: Vec<Vec<f64>> = vec![];
        let one = vec![vec![0.0]];
        assert!(align_mfcc_dtw(&empty, &one, 2, None, None).is_err());
        assert!(align_mfcc_dtw(&one, &empty, 2, None, None).is_err());
    }

    #[test]
    fn identity_alignment_is_diagonal() {
        let seq: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let path = align_mfcc_dtw(&seq, &seq, 3, None, None).unwrap();
        assert_eq!(path.first().unwrap(), &PathPoint { reference_frame: 0, source_frame: 0 });
        assert_eq!(path.last().unwrap(), &PathPoint { reference_frame: 9, source_frame: 9 });
        for w in path.windows(2) {
            assert!(w[1].reference_frame >= w[0].reference_frame);
            assert!(w[1].source_frame >= w[0].source_frame);
        }
    }

    #[test]
    fn two_times_stretched_source_tracks_diagonal_of_slope_two() {
        let reference: Vec<Vec<f64>> = (0..10).map(|i| vec![(i as f64).sin()]).collect();
        // source is reference stretched 2x: frame i of reference corresponds
        // to frame 2i of source (constant-value interpolation).
        let source: Vec<Vec<f64>> = (0..20).map(|i| vec![(i as f64 / 2.0).sin()]).collect();
        let path = align_mfcc_dtw(&reference, &source, 5, None, None).unwrap();
        assert_eq!(path.first().unwrap().reference_frame, 0);
        assert_eq!(path.last().unwrap().reference_frame, 9);
        assert_eq!(path.last().unwrap().source_frame, 19);
    }

    #[test]
    fn monotonicity_holds_under_row_centered_band() {
        let reference: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64]).collect();
        let source: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64]).collect();
        let centers: Vec<usize> = (0..8).collect();
        let path = align_mfcc_dtw(&reference, &source, 1, None, Some(&centers)).unwrap();
        for w in path.windows(2) {
            assert!(w[1].reference_frame >= w[0].reference_frame);
            assert!(w[1].source_frame >= w[0].source_frame);
        }
    }

    #[test]
    fn narrow_custom_centers_clamp_instead_of_failing() {
        let reference: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64]).collect();
        let source: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64]).collect();
        // centers all point at column 0, far from the true end cell (4,4);
        // the aligner must still return a full path, not fail.
        let centers = vec![0usize; 5];
        let path = align_mfcc_dtw(&reference, &source, 1, None, Some(&centers)).unwrap();
        assert_eq!(path.last().unwrap().reference_frame, 4);
    }

    #[test]
    fn estimate_banded_matrix_bytes_scales_with_rows_and_window() {
        let small = estimate_banded_matrix_bytes(100, 5);
        let large = estimate_banded_matrix_bytes(100, 50);
        assert!(large > small);
    }

    #[test]
    fn custom_cost_function_is_used() {
        let reference = vec![vec![0.0], vec![1.0]];
        let source = vec![vec![0.0], vec![1.0]];
        let calls = std::cell::Cell::new(0);
        let cost = |a: &[f64], b: &[f64]| {
            calls.set(calls.get() + 1);
            euclidean_distance(a, b)
        };
        let path = align_mfcc_dtw(&reference, &source, 1, Some(&cost), None).unwrap();
        assert!(!path.is_empty());
        assert!(calls.get() > 0);
    }
}
