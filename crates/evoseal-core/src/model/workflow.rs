// crates/evoseal-core/src/model/workflow.rs
// ============================================================================
// Module: Workflow Step, Result, Execution Context
// Description: The DAG-of-steps shapes executed by the workflow orchestrator.
// Purpose: Canonical WorkflowStep/StepResult/ExecutionContext shared shapes.
// Dependencies: crate::identifiers, crate::time, serde
// ============================================================================

//! ## Overview
//! [`WorkflowStep`] describes one node in the orchestrator's DAG.
//! `dependencies` must form a DAG across the full step set; cycle detection
//! lives in `evoseal-orchestrator`, not here — this module only carries the
//! data shape.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::AdapterId;
use crate::identifiers::StepId;
use crate::identifiers::VersionId;
use crate::identifiers::WorkflowId;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Workflow Step
// ============================================================================

/// One node in a workflow's DAG of steps.
///
/// # Invariants
/// - `dependencies` refer only to other steps within the same workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Unique identifier within the owning workflow.
    pub step_id: StepId,
    /// Human-readable name.
    pub name: String,
    /// Adapter this step invokes.
    pub component_ref: AdapterId,
    /// Operation name passed to the adapter's `execute`.
    pub operation_name: String,
    /// Opaque operation parameters.
    pub params: serde_json::Value,
    /// Step identifiers that must succeed before this step may run.
    pub dependencies: Vec<StepId>,
    /// Maximum duration for a single attempt.
    #[serde(with = "duration_as_millis")]
    pub timeout: Duration,
    /// Maximum number of attempts (including the first).
    pub retry_count: u32,
    /// Base delay between retries; actual delay grows by `backoff_multiplier`.
    #[serde(with = "duration_as_millis")]
    pub retry_delay: Duration,
    /// Whether failure of this step after recovery is exhausted fails the
    /// whole workflow.
    pub critical: bool,
    /// Optional parallel execution group; steps sharing a group and whose
    /// dependencies are satisfied may run concurrently.
    pub parallel_group: Option<String>,
    /// Dispatch priority; higher runs first among otherwise-ready steps.
    pub priority: i32,
}

/// Serializes a [`Duration`] as milliseconds, since the wire contract uses
/// plain integers rather than a structured duration type.
mod duration_as_millis {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    /// Serializes `duration` as its whole-millisecond count.
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        #[expect(clippy::cast_possible_truncation, reason = "timeouts fit in u64 milliseconds")]
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    /// Deserializes a whole-millisecond count into a [`Duration`].
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// ============================================================================
// SECTION: Step Result
// ============================================================================

/// Lifecycle status of a single step attempt sequence.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not yet dispatched.
    Pending,
    /// Currently executing.
    Running,
    /// Completed successfully.
    Succeeded,
    /// Exhausted retries or recovery without success.
    Failed,
    /// Skipped because a dependency failed or the step was unreachable.
    Skipped,
    /// Exceeded its configured timeout.
    TimedOut,
    /// Cancelled by an operator or workflow cancellation.
    Cancelled,
}

impl StepStatus {
    /// Returns whether this status represents a final, non-retriable
    /// outcome for the step.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

/// The outcome of executing one [`WorkflowStep`].
///
/// # Invariants
/// - `attempts` is always >= 1 once `status` is no longer `Pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Step this result belongs to.
    pub step_id: StepId,
    /// Final or current status.
    pub status: StepStatus,
    /// Timestamp of the first attempt.
    pub started_at: Option<Timestamp>,
    /// Timestamp of the last attempt's completion.
    pub ended_at: Option<Timestamp>,
    /// Number of attempts made so far.
    pub attempts: u32,
    /// Opaque operation output, present only on success.
    pub output: Option<serde_json::Value>,
    /// Error description, present only on failure-like statuses.
    pub error: Option<String>,
}

impl StepResult {
    /// Builds a fresh, not-yet-started result for `step_id`.
    #[must_use]
    pub fn pending(step_id: StepId) -> Self {
        Self {
            step_id,
            status: StepStatus::Pending,
            started_at: None,
            ended_at: None,
            attempts: 0,
            output: None,
            error: None,
        }
    }
}

// ============================================================================
// SECTION: Execution Context
// ============================================================================

/// The orchestrator's mutable view over one workflow run.
///
/// # Invariants
/// - Exclusively owned by the workflow orchestrator during a run; other
///   components only observe snapshots published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Workflow being executed.
    pub workflow_id: WorkflowId,
    /// Owning experiment.
    pub experiment_id: crate::identifiers::ExperimentId,
    /// Current iteration number (1-based).
    pub current_iteration: u64,
    /// Total number of iterations configured for this run.
    pub total_iterations: u64,
    /// Human-readable current stage label, for dashboard display.
    pub current_stage: String,
    /// Latest result per step, keyed by step id.
    pub per_step_results: BTreeMap<StepId, StepResult>,
    /// Most recent checkpoint created during this run, if any.
    pub last_checkpoint_id: Option<crate::identifiers::CheckpointId>,
    /// Version currently considered "current" for rollback purposes.
    pub current_version_id: Option<VersionId>,
}

impl ExecutionContext {
    /// Creates a fresh execution context for a new workflow run.
    #[must_use]
    pub fn new(
        workflow_id: WorkflowId,
        experiment_id: crate::identifiers::ExperimentId,
        total_iterations: u64,
    ) -> Self {
        Self {
            workflow_id,
            experiment_id,
            current_iteration: 0,
            total_iterations,
            current_stage: "initializing".to_string(),
            per_step_results: BTreeMap::new(),
            last_checkpoint_id: None,
            current_version_id: None,
        }
    }

    /// Returns whether every step result currently on record is terminal.
    #[must_use]
    pub fn all_steps_settled(&self) -> bool {
        self.per_step_results.values().all(|r| r.status.is_terminal())
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions and debug output.
    #![allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        clippy::dbg_macro,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "Test-only output and panic-based assertions are permitted."
    )]
    use super::*;

    #[test]
    fn terminal_statuses_exclude_pending_and_running() {
        assert!(!StepStatus::Pending.is_terminal());
        assert!(!StepStatus::Running.is_terminal());
        assert!(StepStatus::Succeeded.is_terminal());
        assert!(StepStatus::Failed.is_terminal());
        assert!(StepStatus::TimedOut.is_terminal());
    }

    #[test]
    fn fresh_context_has_no_results() {
        let ctx = ExecutionContext::new(
            WorkflowId::new("wf1").expect("valid"),
            crate::identifiers::ExperimentId::new("e1").expect("valid"),
            10,
        );
        assert!(ctx.all_steps_settled());
    }

    #[test]
    fn settled_requires_every_result_terminal() {
        let mut ctx = ExecutionContext::new(
            WorkflowId::new("wf1").expect("valid"),
            crate::identifiers::ExperimentId::new("e1").expect("valid"),
            10,
        );
        let step = StepId::new("s1").expect("valid");
        ctx.per_step_results.insert(step.clone(), StepResult::pending(step));
        assert!(!ctx.all_steps_settled());
    }
}
