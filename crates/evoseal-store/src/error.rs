// crates/evoseal-store/src/error.rs
// ============================================================================
// Module: Store Errors
// Description: Shared failure type for metrics, checkpoint, and version stores.
// Purpose: Let callers distinguish I/O, integrity, and validation failures.
// Dependencies: evoseal-core
// ============================================================================

use evoseal_core::ErrorClass;
use evoseal_core::ErrorKind;

/// Failure modes shared by every store in this crate.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem or database I/O failure.
    #[error("store io error: {0}")]
    Io(String),
    /// Underlying database engine failure.
    #[error("store db error: {0}")]
    Db(String),
    /// A checkpoint's content hash did not match its stored payload.
    #[error("store integrity failure: {0}")]
    Corrupt(String),
    /// The caller supplied data that fails a store invariant.
    #[error("store validation failure: {0}")]
    Invalid(String),
    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl ErrorClass for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::TransientIo,
            Self::Db(_) => ErrorKind::Component,
            Self::Corrupt(_) => ErrorKind::Integrity,
            Self::Invalid(_) | Self::NotFound(_) => ErrorKind::Validation,
        }
    }
}
