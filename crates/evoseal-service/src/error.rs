// crates/evoseal-service/src/error.rs
// ============================================================================
// Module: Service Errors
// Description: Failure type for the continuous evolution service's loops.
// Purpose: Let health/training failures branch on failure kind via
//          ErrorClass.
// Dependencies: evoseal-core, thiserror
// ============================================================================

use evoseal_core::ErrorClass;
use evoseal_core::ErrorKind;

/// Failure modes raised while running the continuous evolution service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A training cycle was requested while one was already in flight.
    #[error("a training cycle is already running")]
    TrainingAlreadyInProgress,
    /// The external model trainer reported a failure.
    #[error("model trainer failure: {0}")]
    Trainer(String),
    /// The external model endpoint failed a health probe.
    #[error("model endpoint unhealthy: {0}")]
    Unhealthy(String),
    /// A workflow run invoked by the evolution loop failed.
    #[error("workflow failure: {0}")]
    Workflow(#[from] evoseal_orchestrator::OrchestratorError),
    /// A persistence operation failed.
    #[error("store failure: {0}")]
    Store(#[from] evoseal_store::StoreError),
}

impl ErrorClass for ServiceError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::TrainingAlreadyInProgress => ErrorKind::Validation,
            Self::Trainer(_) => ErrorKind::Component,
            Self::Unhealthy(_) => ErrorKind::TransientIo,
            Self::Workflow(err) => err.kind(),
            Self::Store(err) => err.kind(),
        }
    }
}
