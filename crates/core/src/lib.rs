//! Forced-alignment core: multi-pass DTW over MFCC features, with timeline
//! remapping from a reference recording (or a synthesized stand-in) onto a
//! source recording.

pub mod audio;
pub mod cache;
pub mod dtw;
pub mod error;
pub mod indirect;
pub mod mfcc;
pub mod phones;
pub mod timeline;
pub mod tts;
pub mod types;

pub use dtw::align_using_dtw;
pub use error::{AlignmentError, Result};
pub use indirect::{align_using_dtw_with_recognition, interpolate_phone_timelines, PhoneAlignmentMethod};
pub use phones::align_phone_timelines;
pub use tts::{create_alignment_reference, AlignmentReference};
