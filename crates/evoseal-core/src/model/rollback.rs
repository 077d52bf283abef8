// crates/evoseal-core/src/model/rollback.rs
// ============================================================================
// Module: Rollback Record
// Description: A historical record of one rollback attempt.
// Purpose: Canonical RollbackRecord shape produced by the rollback manager.
// Dependencies: crate::identifiers, crate::time, serde
// ============================================================================

//! ## Overview
//! One [`RollbackRecord`] is appended for every rollback attempt, whether it
//! succeeds or not, so that cascading-rollback and audit tooling can
//! reconstruct the full recovery history for an experiment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::CheckpointId;
use crate::identifiers::VersionId;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Rollback Trigger
// ============================================================================

/// What caused a rollback attempt to be initiated.
///
/// # Invariants
/// - Variants are stable for serialization and audit queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackTrigger {
    /// The regression detector flagged a version as a regression.
    RegressionDetected,
    /// A workflow step failed and exhausted its recovery ladder.
    StepFailureRecovery,
    /// An operator requested a manual rollback.
    ManualRequest,
    /// A resource alert crossed the configured critical threshold.
    ResourceAlert,
}

/// The outcome of one rollback attempt.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackOutcome {
    /// The target version was restored and re-verified.
    Succeeded,
    /// No known-good version could be found within the configured lookback.
    NoKnownGoodVersion,
    /// The restored payload failed content-hash verification.
    IntegrityCheckFailed,
    /// An underlying store or adapter error aborted the attempt.
    Aborted,
}

// ============================================================================
// SECTION: Rollback Record
// ============================================================================

/// A single rollback attempt, successful or not.
///
/// # Invariants
/// - `from_version_id` is always the version active immediately before the
///   attempt; it is unrelated to whether the attempt succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackRecord {
    /// Version active immediately before this attempt.
    pub from_version_id: VersionId,
    /// Version targeted for restoration, when a candidate was found.
    pub to_version_id: Option<VersionId>,
    /// Checkpoint restored from, when a candidate was found.
    pub to_checkpoint_id: Option<CheckpointId>,
    /// What triggered this attempt.
    pub trigger: RollbackTrigger,
    /// Result of the attempt.
    pub outcome: RollbackOutcome,
    /// Number of prior versions walked back through before settling on
    /// `to_version_id`, or exhausting the configured lookback.
    pub versions_walked: u32,
    /// Timestamp the attempt was recorded.
    pub recorded_at: Timestamp,
    /// Human-readable detail, particularly useful when `outcome` is not
    /// `Succeeded`.
    pub detail: String,
}

impl RollbackRecord {
    /// Returns whether this attempt restored a working version.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self.outcome, RollbackOutcome::Succeeded)
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
    fn succeeded_matches_only_succeeded_outcome() {
        let mut record = RollbackRecord {
            from_version_id: VersionId::new("v2").expect("valid"),
            to_version_id: Some(VersionId::new("v1").expect("valid")),
            to_checkpoint_id: Some(CheckpointId::new("chk_v1").expect("valid")),
            trigger: RollbackTrigger::RegressionDetected,
            outcome: RollbackOutcome::Succeeded,
            versions_walked: 1,
            recorded_at: Timestamp::now(),
            detail: String::new(),
        };
        assert!(record.succeeded());
        record.outcome = RollbackOutcome::NoKnownGoodVersion;
        assert!(!record.succeeded());
    }
}
