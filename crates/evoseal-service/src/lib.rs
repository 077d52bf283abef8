// crates/evoseal-service/src/lib.rs
// ============================================================================
// Crate: evoseal-service
// Description: The continuous evolution service — evolution monitor,
//              training monitor, and health loops over injected adapters.
// Purpose: The C9 component of the evolution-and-training orchestrator.
// ============================================================================

//! ## Overview
//! This crate never implements an evolutionary algorithm, training loop, or
//! model itself; [`training::ModelTrainer`] and [`health::HealthProbe`] are
//! the seams a caller fills in. What it owns is the outer shape: data
//! collection (serialized behind a single mutex), single-concurrency
//! training cycles (an atomic compare-exchange guard, not a mutex queue),
//! fixed five-category validation, and cooperative cancellation across all
//! three long-lived loops.

pub mod data_collector;
pub mod error;
pub mod health;
pub mod model;
pub mod service;
pub mod training;

pub use data_collector::EvolutionDataCollector;
pub use error::ServiceError;
pub use health::HealthProbe;
pub use health::HealthState;
pub use model::EvolutionSample;
pub use model::ModelVersion;
pub use model::ValidationReport;
pub use model::ValidationScores;
pub use service::ContinuousEvolutionService;
pub use service::IterationFeed;
pub use service::ServiceStats;
pub use training::ModelTrainer;
pub use training::TrainingDecision;
pub use training::TrainingGuard;
