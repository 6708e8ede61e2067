//! Path representation (C1): compact a monotone DTW warp path into a
//! per-reference-frame contiguous range on the source axis.

use serde::{Deserialize, Serialize};

/// One step of a DTW warp path. Named for what each axis is rather than the
/// historical `source`/`dest` terminology: `reference_frame` indexes the
/// reference MFCC sequence, `source_frame` indexes the source-audio one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPoint {
    pub reference_frame: usize,
    pub source_frame: usize,
}

pub type AlignmentPath = Vec<PathPoint>;

/// The minimum and maximum source-axis indices visited at one reference
/// frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub first: usize,
    pub last: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactedPath(pub Vec<FrameRange>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    First,
    Last,
}

impl CompactedPath {
    /// Walk the path in order; a new reference frame opens a new row, a
    /// repeated one extends the current row's `last`.
    pub fn compact(path: &[PathPoint]) -> Self {
        let mut rows: Vec<FrameRange> = Vec::new();
        for point in path {
            if rows.len() == point.reference_frame + 1 {
                if let Some(last_row) = rows.last_mut() {
                    last_row.last = point.source_frame;
                }
            } else {
                while rows.len() < point.reference_frame {
                    rows.push(FrameRange {
                        first: point.source_frame,
                        last: point.source_frame,
                    });
                }
                rows.push(FrameRange {
                    first: point.source_frame,
                    last: point.source_frame,
                });
            }
        }
        CompactedPath(rows)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Non-interpolating frame lookup, clamped into range. Returns 0 for an
    /// empty path.
    pub fn map_frame(&self, i: usize, kind: FrameKind) -> usize {
        if self.0.is_empty() {
            return 0;
        }
        let idx = i.min(self.0.len() - 1);
        match kind {
            FrameKind::First => self.0[idx].first,
            FrameKind::Last => self.0[idx].last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(r: usize, s: usize) -> PathPoint {
        PathPoint {
            reference_frame: r,
            source_frame: s,
        }
    }

    #[test]
    fn compact_diagonal_path_is_identity() {
        let path = vec![point(0, 0), point(1, 1), point(2, 2)];
        let compacted = CompactedPath::compact(&path);
        assert_eq!(compacted.len(), 3);
        for (i, range) in compacted.0.iter().enumerate() {
            assert_eq!(range.first, i);
            assert_eq!(range.last, i);
        }
    }

    #[test]
    fn compact_extends_row_on_repeated_reference_frame() {
        // reference frame 0 maps to source frames 0..=2 (several "left" steps)
        let path = vec![point(0, 0), point(0, 1), point(0, 2), point(1, 3)];
        let compacted = CompactedPath::compact(&path);
        assert_eq!(compacted.0[0], FrameRange { first: 0, last: 2 });
        assert_eq!(compacted.0[1], FrameRange { first: 3, last: 3 });
    }

    #[test]
    fn map_frame_clamps_out_of_range_index() {
        let path = vec![point(0, 0), point(1, 1)];
        let compacted = CompactedPath::compact(&path);
        assert_eq!(compacted.map_frame(50, FrameKind::First), 1);
        assert_eq!(compacted.map_frame(50, FrameKind::Last), 1);
    }

    #[test]
    fn map_frame_on_empty_path_returns_zero() {
        let compacted = CompactedPath(vec![]);
        assert_eq!(compacted.map_frame(3, FrameKind::First), 0);
    }

    #[test]
    fn coverage_invariant_first_and_last_entries() {
        let path = vec![point(0, 0), point(1, 0), point(2, 1), point(2, 2)];
        let compacted = CompactedPath::compact(&path);
        assert_eq!(compacted.0.first().unwrap().first, 0);
        assert_eq!(compacted.0.last().unwrap().last, 2);
    }
}
