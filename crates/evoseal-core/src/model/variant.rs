// crates/evoseal-core/src/model/variant.rs
// ============================================================================
// Module: Variant
// Description: A candidate solution produced by the evolution engine.
// Purpose: Canonical Variant shape persisted and ranked by the version/
//          experiment store, distinct from the checkpointed Version
//          lineage the orchestrator restores.
// Dependencies: crate::identifiers, crate::time, serde
// ============================================================================

//! ## Overview
//! A [`Variant`] is a candidate produced by one evolution-engine mutation
//! step: source text, the tests it was run against, a fitness `score`, and
//! its `parents` for lineage reconstruction. It is tracked alongside
//! [`super::Version`] but is not itself checkpointed; only variants promoted
//! to a `Version` are ever restored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::ExperimentId;
use crate::identifiers::VariantId;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Variant
// ============================================================================

/// A candidate solution generated by one evolution mutation step.
///
/// # Invariants
/// - `parents` lists only previously recorded variant identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Unique identifier.
    pub id: VariantId,
    /// Candidate source payload (opaque to this crate).
    pub source: String,
    /// Names or descriptions of tests run against this candidate.
    pub tests: Vec<String>,
    /// Fitness score; higher is better by convention.
    pub score: f64,
    /// Ordered parent variant identifiers; empty for an initial candidate.
    pub parents: Vec<VariantId>,
    /// Non-negative generation counter.
    pub generation: u32,
    /// Free-form label for the mutation that produced this candidate.
    pub mutation_kind: String,
    /// Owning experiment.
    pub experiment_id: ExperimentId,
    /// Creation timestamp.
    pub created_at: Timestamp,
}
