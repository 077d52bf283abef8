// crates/evoseal-store/src/lib.rs
// ============================================================================
// Crate: evoseal-store
// Description: SQLite-backed persistence for metrics, checkpoints metadata,
//              experiments, versions, variants, and the rollback audit log.
// Purpose: The single durable-storage crate backing C2 (Metrics Store), C3
//          (Checkpoint Store metadata; payload bytes live on the filesystem)
//          and C11 (Version/Experiment Store).
// ============================================================================

//! # evoseal-store
//!
//! One `SQLite` database file backs every durable record this workspace
//! keeps: metrics ([`metrics`]), checkpoint metadata and payload files
//! ([`checkpoints`]), and experiments, versions, variants, and the rollback
//! audit log ([`versions`]). [`EvoStore`] owns the shared connection; the
//! [`checkpoints::CheckpointStore`] additionally owns a filesystem root for
//! payload bytes, since checkpoint content is never stored as a database
//! blob.

pub mod checkpoints;
pub mod connection;
pub mod error;
pub mod metrics;
pub mod versions;

pub use checkpoints::CheckpointRecord;
pub use checkpoints::CheckpointStore;
pub use checkpoints::RestoreOutcome;
pub use connection::EvoStore;
pub use error::StoreError;
pub use versions::ExperimentFilter;
