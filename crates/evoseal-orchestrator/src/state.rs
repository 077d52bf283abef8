// crates/evoseal-orchestrator/src/state.rs
// ============================================================================
// Module: Orchestrator State Machine
// Description: The workflow run's top-level lifecycle state, as an explicit
//              enum plus a transition guard.
// Purpose: Keep pause/resume/cancel/checkpoint/recovery transitions as
//          data, not ad hoc boolean flags.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Mirrors this workspace's existing state-machine-as-data style
//! (`evoseal_adapters::AdapterState`, `Experiment::status`): an enum plus a
//! `can_transition_to` predicate, so illegal transitions are rejected at one
//! seam rather than scattered across call sites.

/// The workflow orchestrator's run-level lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run in progress.
    Idle,
    /// Validating the DAG and preparing execution context.
    Initializing,
    /// Dispatching steps.
    Running,
    /// Suspended after the current step finished; resumable.
    Paused,
    /// Taking a checkpoint mid-run; returns to `Running` after.
    Checkpointing,
    /// Running a recovery strategy after a critical step failure.
    Recovering,
    /// Finished all iterations successfully.
    Completed,
    /// A critical step exhausted recovery.
    Failed,
    /// Cancelled by an operator.
    Cancelled,
}

impl RunState {
    /// Returns whether `next` is a legal transition from this state.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Initializing)
                | (Self::Initializing, Self::Running)
                | (Self::Initializing, Self::Failed)
                | (Self::Running, Self::Paused)
                | (Self::Paused, Self::Running)
                | (Self::Running, Self::Checkpointing)
                | (Self::Checkpointing, Self::Running)
                | (Self::Running, Self::Recovering)
                | (Self::Recovering, Self::Running)
                | (Self::Recovering, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Cancelled)
                | (Self::Paused, Self::Cancelled)
                | (Self::Initializing, Self::Cancelled)
        )
    }

    /// Returns whether this state is final — no further transition is ever
    /// legal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// A `Mutex`-guarded [`RunState`] with a validating transition method,
/// mirroring `evoseal_adapters::state::StateCell`.
pub struct RunStateCell {
    state: std::sync::Mutex<RunState>,
}

impl RunStateCell {
    /// Builds a cell starting at [`RunState::Idle`].
    #[must_use]
    pub const fn new() -> Self {
        Self { state: std::sync::Mutex::new(RunState::Idle) }
    }

    /// Returns the current state.
    #[must_use]
    pub fn get(&self) -> RunState {
        *self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Attempts to move to `next`, returning the prior state on success or
    /// the current state (unchanged) on an illegal transition.
    ///
    /// # Errors
    ///
    /// Returns `Err(current)` when `current.can_transition_to(next)` is
    /// `false`.
    pub fn transition(&self, next: RunState) -> Result<RunState, RunState> {
        let mut guard = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if !guard.can_transition_to(next) {
            return Err(*guard);
        }
        let prior = *guard;
        *guard = next;
        Ok(prior)
    }
}

impl Default for RunStateCell {
    fn default() -> Self {
        Self::new()
    }
}
