//! DTW engine: path representation (C1), windowed aligner (C2), and the
//! multi-pass driver (C3).

pub mod aligner;
pub mod driver;
pub mod path;

pub use aligner::{align_mfcc_dtw, estimate_banded_matrix_bytes, euclidean_distance};
pub use driver::align_using_dtw;
pub use path::{AlignmentPath, CompactedPath, FrameKind, FrameRange, PathPoint};
