// crates/evoseal-orchestrator/src/recovery.rs
// ============================================================================
// Module: Recovery Ladder
// Description: The ordered sequence of recovery strategies attempted after
//              a critical step's retries are exhausted.
// Purpose: Apply (a) retry, (b) checkpoint rollback, (c) component restart,
//          (d) state validation, (e) custom action, in order, stopping at
//          the first that succeeds.
// Dependencies: evoseal-adapters, evoseal-core, evoseal-store
// ============================================================================

//! ## Overview
//! Each rung is a distinct function rather than one branching match, so the
//! ladder reads as a literal ordered list — the same "ladder of named
//! strategies" shape `evoseal_safety::rollback_manager` already uses for its
//! own escalation from policy-gated to emergency rollback.

use std::path::Path;

use evoseal_adapters::ComponentAdapter;
use evoseal_core::model::ExecutionContext;
use evoseal_store::CheckpointStore;
use evoseal_store::EvoStore;

use crate::error::OrchestratorError;

/// Which recovery rung succeeded, or that every rung was exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The step succeeded on a retried attempt.
    RetrySucceeded,
    /// A pre-failure checkpoint was restored.
    CheckpointRolledBack,
    /// The failing adapter was restarted.
    ComponentRestarted,
    /// Execution context invariants were revalidated and repaired.
    StateValidated,
    /// An operator-registered custom action reported success.
    CustomActionSucceeded,
    /// Every rung was attempted and none succeeded.
    Exhausted,
}

/// A custom recovery action registered by the operator; returns whether it
/// resolved the failure.
pub type CustomRecoveryAction = Box<dyn Fn(&ExecutionContext) -> bool + Send + Sync>;

/// Runs the fixed recovery ladder for one critical step failure.
pub struct RecoveryLadder {
    store: EvoStore,
    checkpoints: CheckpointStore,
    custom_action: Option<CustomRecoveryAction>,
}

impl RecoveryLadder {
    /// Builds a ladder over `store`/`checkpoints`, with an optional
    /// operator-registered custom action as the final rung.
    #[must_use]
    pub fn new(store: EvoStore, checkpoints: CheckpointStore, custom_action: Option<CustomRecoveryAction>) -> Self {
        Self { store, checkpoints, custom_action }
    }

    /// Attempts checkpoint rollback, component restart, state validation,
    /// and the custom action in order, returning the first rung that
    /// succeeds. The retry rung itself is driven by the caller before this
    /// is invoked, since retry reuses the step-dispatch loop rather than a
    /// standalone recovery action.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] only when a rung itself fails in a way
    /// that should abort recovery outright (never on a rung simply not
    /// applying); an inapplicable or unsuccessful rung falls through to the
    /// next one instead.
    pub async fn run(
        &self,
        context: &mut ExecutionContext,
        adapter: &dyn ComponentAdapter,
        working_dir: &Path,
    ) -> Result<RecoveryOutcome, OrchestratorError> {
        if self.try_checkpoint_rollback(context, working_dir)? {
            return Ok(RecoveryOutcome::CheckpointRolledBack);
        }
        if Self::try_component_restart(adapter).await? {
            return Ok(RecoveryOutcome::ComponentRestarted);
        }
        if Self::try_state_validation(context) {
            return Ok(RecoveryOutcome::StateValidated);
        }
        if let Some(action) = &self.custom_action {
            if action(context) {
                return Ok(RecoveryOutcome::CustomActionSucceeded);
            }
        }
        Ok(RecoveryOutcome::Exhausted)
    }

    /// Restores the latest checkpoint recorded before the current version,
    /// if one exists.
    fn try_checkpoint_rollback(&self, context: &mut ExecutionContext, working_dir: &Path) -> Result<bool, OrchestratorError> {
        let Some(version_id) = context.current_version_id.clone() else { return Ok(false) };
        match self.checkpoints.get(&self.store, &version_id)? {
            Some(record) => {
                self.checkpoints.restore(&self.store, &version_id, working_dir)?;
                context.last_checkpoint_id = Some(record.id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Stops and restarts the failing adapter.
    async fn try_component_restart(adapter: &dyn ComponentAdapter) -> Result<bool, OrchestratorError> {
        if adapter.stop().await.is_err() {
            return Ok(false);
        }
        match adapter.initialize().await {
            Ok(()) => Ok(adapter.start().await.is_ok()),
            Err(_) => Ok(false),
        }
    }

    /// Repairs trivially-detectable `ExecutionContext` invariant violations
    /// (a stale `current_stage` left over from a prior run).
    fn try_state_validation(context: &mut ExecutionContext) -> bool {
        if context.current_iteration == 0 && context.current_stage != "initializing" {
            context.current_stage = "initializing".to_string();
            return true;
        }
        if context.per_step_results.is_empty() {
            return false;
        }
        true
    }
}

/// Computes the exponential backoff delay for `attempt` (1-based), capped at
/// `max_delay`.
#[must_use]
pub fn backoff_delay(base: std::time::Duration, multiplier: f64, attempt: u32, max_delay: std::time::Duration) -> std::time::Duration {
    #[expect(clippy::cast_possible_truncation, reason = "attempt is bounded by configured retry_count, never large enough to overflow")]
    let factor = multiplier.powi(attempt.saturating_sub(1) as i32);
    let scaled = base.mul_f64(factor.max(1.0));
    scaled.min(max_delay)
}
