// crates/evoseal-dashboard/src/error.rs
// ============================================================================
// Module: Dashboard Error
// Description: Error taxonomy for the dashboard server.
// Purpose: Classify bind/serve failures for ErrorClass-based handling.
// Dependencies: evoseal-core, thiserror
// ============================================================================

use evoseal_core::ErrorClass;
use evoseal_core::ErrorKind;

/// Errors the dashboard server can report.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// The configured bind address could not be parsed.
    #[error("invalid bind address: {0}")]
    InvalidBindAddress(String),
    /// Binding the listening socket failed.
    #[error("bind failed: {0}")]
    Bind(String),
    /// Serving accepted connections failed.
    #[error("serve failed: {0}")]
    Serve(String),
}

impl ErrorClass for DashboardError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBindAddress(_) => ErrorKind::Validation,
            Self::Bind(_) | Self::Serve(_) => ErrorKind::TransientIo,
        }
    }
}
