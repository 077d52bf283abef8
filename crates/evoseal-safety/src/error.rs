// crates/evoseal-safety/src/error.rs
// ============================================================================
// Module: Safety Errors
// Description: Failure modes shared by the regression detector, rollback
//              manager, and safety integration.
// Purpose: Let callers distinguish policy rejection from store/integrity
//          failure without matching concrete store error types.
// Dependencies: evoseal-core, evoseal-store
// ============================================================================

use evoseal_core::ErrorClass;
use evoseal_core::ErrorKind;
use evoseal_store::StoreError;

/// Failure modes raised by this crate.
#[derive(Debug, thiserror::Error)]
pub enum SafetyError {
    /// The requested rollback target has no checkpoint, or no known-good
    /// version exists.
    #[error("no known-good version available: {0}")]
    NoKnownGoodVersion(String),
    /// A policy check rejected the requested action (disabled, missing
    /// `auth_token`, or attempt budget exhausted).
    #[error("rollback policy rejected the request: {0}")]
    PolicyRejected(String),
    /// Post-rollback verification failed (empty working directory or
    /// content-hash mismatch).
    #[error("post-rollback verification failed: {0}")]
    VerificationFailed(String),
    /// An underlying store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorClass for SafetyError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NoKnownGoodVersion(_) => ErrorKind::Integrity,
            Self::PolicyRejected(_) => ErrorKind::Policy,
            Self::VerificationFailed(_) => ErrorKind::Integrity,
            Self::Store(err) => err.kind(),
        }
    }
}
