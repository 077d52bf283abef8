// crates/evoseal-orchestrator/src/lib.rs
// ============================================================================
// Crate: evoseal-orchestrator
// Description: Drives a workflow's step DAG through iterations, dispatch,
//              checkpointing, recovery, and pause/resume/cancel control.
// Purpose: The C8 component of the evolution-and-training orchestrator.
// ============================================================================

//! ## Overview
//! This crate owns exactly one responsibility: turning a validated
//! [`config::WorkflowConfig`] into a sequence of dispatched, checkpointed,
//! and — where necessary — recovered [`evoseal_core::model::WorkflowStep`]
//! executions. It does not implement any adapter, evolutionary algorithm,
//! or training loop itself; those are supplied by
//! [`evoseal_adapters::ComponentAdapter`] implementations registered with
//! [`orchestrator::WorkflowOrchestrator::new`].

pub mod config;
pub mod dag;
pub mod error;
pub mod orchestrator;
pub mod recovery;
pub mod resource;
pub mod state;

pub use config::ExecutionStrategy;
pub use config::WorkflowConfig;
pub use dag::topological_waves;
pub use dag::Waves;
pub use error::OrchestratorError;
pub use orchestrator::OrchestratorControl;
pub use orchestrator::WorkflowOrchestrator;
pub use recovery::backoff_delay;
pub use recovery::CustomRecoveryAction;
pub use recovery::RecoveryLadder;
pub use recovery::RecoveryOutcome;
pub use resource::AlertLevel;
pub use resource::ResourceAlert;
pub use resource::ResourceMonitor;
pub use resource::ResourceSample;
pub use resource::ResourceSampler;
pub use state::RunState;
pub use state::RunStateCell;
