// crates/evoseal-core/src/model/experiment.rs
// ============================================================================
// Module: Experiment
// Description: The top-level container owning versions, metrics, checkpoints.
// Purpose: Canonical Experiment shape and its lifecycle state machine.
// Dependencies: crate::identifiers, crate::time, serde
// ============================================================================

//! ## Overview
//! An [`Experiment`] is created, explicitly started, and explicitly
//! terminated. [`ExperimentStatus`] transitions form the DAG:
//! `created -> running -> {paused <-> running} ->
//! {completed | failed | cancelled}`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::ExperimentId;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Experiment Status
// ============================================================================

/// Lifecycle status of an [`Experiment`].
///
/// # Invariants
/// - Transitions are validated by [`ExperimentStatus::can_transition_to`];
///   no caller may set status directly without going through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    /// Created but not yet started.
    Created,
    /// Actively running.
    Running,
    /// Paused; may resume to `Running`.
    Paused,
    /// Terminated successfully.
    Completed,
    /// Terminated by failure.
    Failed,
    /// Terminated by operator cancellation.
    Cancelled,
}

impl ExperimentStatus {
    /// Returns whether a transition from `self` to `next` is permitted by
    /// the experiment lifecycle DAG.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use ExperimentStatus::{Cancelled, Completed, Created, Failed, Paused, Running};
        matches!(
            (self, next),
            (Created, Running)
                | (Running, Paused)
                | (Paused, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
                | (Paused, Cancelled)
        )
    }

    /// Returns whether this status is terminal (no further transitions are
    /// valid).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

// ============================================================================
// SECTION: Experiment
// ============================================================================

/// A named, tagged container owning a version lineage, its metrics,
/// artifacts, and checkpoints.
///
/// # Invariants
/// - `status` transitions only through [`ExperimentStatus::can_transition_to`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    /// Unique identifier.
    pub id: ExperimentId,
    /// Human-readable name.
    pub name: String,
    /// Opaque, operator-supplied configuration blob.
    pub config: String,
    /// Current lifecycle status.
    pub status: ExperimentStatus,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Start timestamp, set when transitioning out of `Created`.
    pub started_at: Option<Timestamp>,
    /// Completion timestamp, set on any terminal transition.
    pub completed_at: Option<Timestamp>,
    /// Operator-supplied tags.
    pub tags: Vec<String>,
}

impl Experiment {
    /// Attempts the transition to `next`, returning `false` without
    /// mutating `self` if the transition is not permitted.
    #[must_use]
    pub fn try_transition(&mut self, next: ExperimentStatus, now: Timestamp) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        if self.status == ExperimentStatus::Created {
            self.started_at = Some(now);
        }
        if next.is_terminal() {
            self.completed_at = Some(now);
        }
        self.status = next;
        true
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

    fn sample() -> Experiment {
        Experiment {
            id: ExperimentId::new("e1").expect("valid"),
            name: "exp".to_string(),
            config: String::new(),
            status: ExperimentStatus::Created,
            created_at: Timestamp::now(),
            started_at: None,
            completed_at: None,
            tags: vec![],
        }
    }

    #[test]
    fn created_to_running_sets_started_at() {
        let mut exp = sample();
        assert!(exp.try_transition(ExperimentStatus::Running, Timestamp::now()));
        assert!(exp.started_at.is_some());
    }

    #[test]
    fn cannot_skip_to_completed_from_created() {
        let mut exp = sample();
        assert!(!exp.try_transition(ExperimentStatus::Completed, Timestamp::now()));
        assert_eq!(exp.status, ExperimentStatus::Created);
    }

    #[test]
    fn terminal_transition_sets_completed_at() {
        let mut exp = sample();
        assert!(exp.try_transition(ExperimentStatus::Running, Timestamp::now()));
        assert!(exp.try_transition(ExperimentStatus::Failed, Timestamp::now()));
        assert!(exp.completed_at.is_some());
        assert!(exp.status.is_terminal());
    }

    #[test]
    fn pause_resume_round_trip() {
        let mut exp = sample();
        assert!(exp.try_transition(ExperimentStatus::Running, Timestamp::now()));
        assert!(exp.try_transition(ExperimentStatus::Paused, Timestamp::now()));
        assert!(exp.try_transition(ExperimentStatus::Running, Timestamp::now()));
        assert_eq!(exp.status, ExperimentStatus::Running);
    }
}
