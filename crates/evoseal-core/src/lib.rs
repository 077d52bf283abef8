// crates/evoseal-core/src/lib.rs
// ============================================================================
// Crate: evoseal-core
// Description: Shared domain types, identifiers, hashing, and error taxonomy
//              used by every other EVOSEAL crate.
// Purpose: Give every component the same vocabulary for versions, metrics,
//          checkpoints, workflows, events, and errors.
// ============================================================================

//! # evoseal-core
//!
//! Foundational types shared across the EVOSEAL workspace: opaque
//! identifiers, the canonical [`time::Timestamp`] and content-hashing
//! primitives, the shared error taxonomy, and the domain model (versions,
//! metrics, checkpoints, experiments, workflow steps, events, rollback
//! records, regression reports).
//!
//! No module in this crate performs I/O; it exists purely to give every
//! other crate in the workspace the same vocabulary.

pub mod errors;
pub mod hashing;
pub mod identifiers;
pub mod model;
pub mod time;

pub use errors::ErrorClass;
pub use errors::ErrorKind;
pub use hashing::HashError;
pub use hashing::HexDigest;
pub use identifiers::AdapterId;
pub use identifiers::CheckpointId;
pub use identifiers::ExperimentId;
pub use identifiers::IdError;
pub use identifiers::ModelVersionId;
pub use identifiers::StepId;
pub use identifiers::SubscriptionId;
pub use identifiers::VariantId;
pub use identifiers::VersionId;
pub use identifiers::WorkflowId;
pub use time::Timestamp;
pub use time::TimestampError;
