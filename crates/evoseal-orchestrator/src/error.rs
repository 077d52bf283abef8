// crates/evoseal-orchestrator/src/error.rs
// ============================================================================
// Module: Orchestrator Errors
// Description: Failure type for DAG validation, step execution, and
//              workflow state transitions.
// Purpose: Let recovery strategies branch on failure kind via ErrorClass.
// Dependencies: evoseal-core, thiserror
// ============================================================================

use evoseal_core::ErrorClass;
use evoseal_core::ErrorKind;

/// Failure modes raised while validating or driving a workflow.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The step graph contains a cycle or references an unknown step.
    #[error("invalid workflow graph: {0}")]
    InvalidGraph(String),
    /// A requested state transition is not legal from the orchestrator's
    /// current state.
    #[error("invalid orchestrator transition: {0}")]
    InvalidTransition(String),
    /// A critical step exhausted every recovery strategy.
    #[error("critical step {step_id} failed: {detail}")]
    CriticalStepFailed {
        /// The step that could not be recovered.
        step_id: String,
        /// Human-readable detail of the last failure.
        detail: String,
    },
    /// A step exceeded its configured timeout.
    #[error("step {0} timed out")]
    StepTimedOut(String),
    /// The underlying adapter reported a failure.
    #[error("adapter failure: {0}")]
    Adapter(#[from] evoseal_adapters::AdapterError),
    /// A persistence operation failed.
    #[error("store failure: {0}")]
    Store(#[from] evoseal_store::StoreError),
}

impl ErrorClass for OrchestratorError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidGraph(_) | Self::InvalidTransition(_) => ErrorKind::Validation,
            Self::CriticalStepFailed { .. } => ErrorKind::Fatal,
            Self::StepTimedOut(_) => ErrorKind::TransientIo,
            Self::Adapter(err) => err.kind(),
            Self::Store(err) => err.kind(),
        }
    }
}
