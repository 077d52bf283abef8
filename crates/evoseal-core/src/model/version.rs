// crates/evoseal-core/src/model/version.rs
// ============================================================================
// Module: Version
// Description: The immutable artifact produced by one evolution iteration.
// Purpose: Canonical Version/Metric/Checkpoint shapes shared across crates.
// Dependencies: crate::identifiers, crate::time, serde
// ============================================================================

//! ## Overview
//! A [`Version`] is created once, on iteration success, and never mutated
//! afterward. Its `parent_ids` form the evolution lineage DAG; an empty
//! list marks a root version.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::ExperimentId;
use crate::identifiers::VersionId;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Version
// ============================================================================

/// One artifact produced by one iteration of evolution.
///
/// # Invariants
/// - Immutable once constructed.
/// - `parent_ids` is empty only for root versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Unique identifier, scoped to `experiment_id`.
    pub id: VersionId,
    /// Ordered parent version identifiers; empty for roots.
    pub parent_ids: Vec<VersionId>,
    /// Opaque payload: runpack-relative path to file bytes.
    pub payload: BTreeMap<String, Vec<u8>>,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Non-negative generation counter.
    pub generation: u32,
    /// Owning experiment.
    pub experiment_id: ExperimentId,
}

impl Version {
    /// Returns true when this version has no parents.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_ids.is_empty()
    }

    /// Returns the first parent, used by cascading rollback's "walk the
    /// primary lineage" strategy.
    #[must_use]
    pub fn primary_parent(&self) -> Option<&VersionId> {
        self.parent_ids.first()
    }
}
