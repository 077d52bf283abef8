// crates/evoseal-core/src/model/checkpoint.rs
// ============================================================================
// Module: Checkpoint
// Description: Metadata describing a content-addressed version snapshot.
// Purpose: Canonical Checkpoint shape shared by the checkpoint store and
//          rollback manager.
// Dependencies: crate::hashing, crate::identifiers, crate::time, serde
// ============================================================================

//! ## Overview
//! A [`Checkpoint`] records where a version's payload bytes live on disk and
//! the hash that must re-verify on every restore. `payload_location` is
//! always relative to the configured checkpoint directory; see
//! `evoseal-store` for the on-disk layout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::hashing::HexDigest;
use crate::identifiers::VersionId;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Checkpoint Kind
// ============================================================================

/// Reason a checkpoint was created.
///
/// # Invariants
/// - Variants are stable for serialization and retention policy matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    /// Created at operator request.
    Manual,
    /// Created by the orchestrator's periodic checkpoint interval.
    Automatic,
    /// Created to mark a significant version; never deleted by retention.
    Milestone,
    /// Created immediately before a rollback attempt.
    PreRecovery,
    /// Created immediately after a successful rollback.
    PostRecovery,
    /// Created in response to a critical resource alert.
    Emergency,
}

impl CheckpointKind {
    /// Returns whether retention cleanup must never delete checkpoints of
    /// this kind.
    #[must_use]
    pub const fn is_retained_by_default(self) -> bool {
        matches!(self, Self::Milestone)
    }
}

// ============================================================================
// SECTION: Checkpoint
// ============================================================================

/// A content-addressed snapshot of a version's payload plus metadata.
///
/// # Invariants
/// - `content_hash` must verify against the stored payload on every load;
///   mismatch marks the checkpoint corrupt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Version this checkpoint snapshots.
    pub version_id: VersionId,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Reason this checkpoint was created.
    pub checkpoint_kind: CheckpointKind,
    /// Canonical content hash of the payload tree.
    pub content_hash: HexDigest,
    /// Location of the payload on disk, relative to the checkpoint directory root.
    pub payload_location: String,
    /// Opaque operator-supplied metadata.
    pub metadata: BTreeMap<String, String>,
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
    fn only_milestone_is_retained_by_default() {
        assert!(CheckpointKind::Milestone.is_retained_by_default());
        assert!(!CheckpointKind::Automatic.is_retained_by_default());
        assert!(!CheckpointKind::PreRecovery.is_retained_by_default());
    }
}
