// crates/evoseal-adapters/src/error.rs
// ============================================================================
// Module: Adapter Errors
// Description: Failure modes shared by every component adapter.
// Purpose: Let callers distinguish a rejected state transition from an
//          underlying engine/network failure without matching concrete
//          adapter types.
// Dependencies: evoseal-core
// ============================================================================

use evoseal_core::ErrorClass;
use evoseal_core::ErrorKind;

use crate::state::AdapterState;

/// Failure modes raised by this crate.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The requested operation is not valid from the adapter's current
    /// state (e.g. `execute` before `start`).
    #[error("invalid transition from {from:?} via {action}")]
    InvalidTransition {
        /// State the adapter was in.
        from: AdapterState,
        /// Action attempted.
        action: String,
    },
    /// `execute` was called with an operation name the adapter does not
    /// recognize.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    /// The underlying engine or remote job rejected the request or
    /// reported a failure.
    #[error("component failure: {0}")]
    Component(String),
    /// A remote job's HTTP request failed after exhausting retries.
    #[error("transient network failure: {0}")]
    Network(String),
    /// A rate limit was exceeded and the caller should back off.
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),
}

impl ErrorClass for AdapterError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTransition { .. } | Self::UnknownOperation(_) => ErrorKind::Validation,
            Self::Component(_) => ErrorKind::Component,
            Self::Network(_) => ErrorKind::TransientIo,
            Self::RateLimited(_) => ErrorKind::Policy,
        }
    }
}
