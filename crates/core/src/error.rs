//! Error taxonomy for the alignment core.
//!
//! Three kinds matter to callers: a caller-side mistake that should fail
//! fast (`InvariantViolation`), an unrecognized selector string at a
//! boundary (`UnsupportedSelector`), and anything that bubbled up from an
//! external collaborator (MFCC extraction, TTS synthesis, audio I/O).

#[derive(Debug, thiserror::Error)]
pub enum AlignmentError {
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),

    #[error(transparent)]
    External(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AlignmentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invariant_violation() {
        let e = AlignmentError::InvariantViolation("granularities must not be empty".into());
        assert_eq!(
            e.to_string(),
            "invariant violation: granularities must not be empty"
        );
    }

    #[test]
    fn display_unsupported_selector() {
        let e = AlignmentError::UnsupportedSelector("phoneAlignmentMethod: 'fuzzy'".into());
        assert_eq!(
            e.to_string(),
            "unsupported selector: phoneAlignmentMethod: 'fuzzy'"
        );
    }

    #[test]
    fn wraps_external_error() {
        let inner = anyhow::anyhow!("mfcc extractor failed");
        let e: AlignmentError = inner.into();
        assert_eq!(e.to_string(), "mfcc extractor failed");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AlignmentError>();
    }
}
