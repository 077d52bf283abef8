// crates/evoseal-service/src/training.rs
// ============================================================================
// Module: Training Cycle
// Description: Single-concurrency training cycle: build a dataset, invoke
//              the external fine-tuner, validate the candidate, deploy or
//              roll back.
// Purpose: Enforce "at most one active training at a time" with an atomic
//          compare-exchange guard rather than a mutex, so a second trigger
//          is rejected instantly instead of queuing.
// Dependencies: evoseal-core, tokio
// ============================================================================

//! ## Overview
//! [`ModelTrainer`] is the seam supplied by the caller — this crate invokes
//! it but never implements a fine-tuning algorithm itself, per the explicit
//! non-goal of implementing any specific evolutionary algorithm, training
//! loop, or model.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use evoseal_core::identifiers::ModelVersionId;

use crate::error::ServiceError;
use crate::model::EvolutionSample;
use crate::model::ModelVersion;
use crate::model::ValidationReport;

/// Fine-tunes and validates a candidate model version from a training
/// dataset; supplied by the caller.
#[async_trait]
pub trait ModelTrainer: Send + Sync {
    /// Trains a candidate model from `dataset`, returning an opaque handle
    /// the trainer can later validate.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Trainer`] when training itself fails.
    async fn fine_tune(&self, dataset: &[EvolutionSample]) -> Result<ModelVersionId, ServiceError>;

    /// Validates `candidate` across the five fixed categories.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Trainer`] when validation itself fails.
    async fn validate(&self, candidate: &ModelVersionId) -> Result<ValidationReport, ServiceError>;
}

/// Guards a training cycle so at most one runs at a time.
pub struct TrainingGuard {
    /// `true` while a training cycle is in flight.
    in_progress: AtomicBool,
}

/// What a completed training cycle decided.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingDecision {
    /// The candidate cleared the deployment bar and is now current.
    Deployed(ModelVersion),
    /// The candidate was discarded; the current model is retained.
    RolledBack {
        /// The rejected candidate's validation report.
        report: ValidationReport,
    },
}

impl TrainingGuard {
    /// Builds a guard with no training in progress.
    #[must_use]
    pub const fn new() -> Self {
        Self { in_progress: AtomicBool::new(false) }
    }

    /// Runs one training cycle if none is currently in flight.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::TrainingAlreadyInProgress`] when a cycle is
    /// already running, or propagates [`ServiceError::Trainer`] from the
    /// trainer itself.
    pub async fn run_cycle(
        &self,
        trainer: &dyn ModelTrainer,
        dataset: &[EvolutionSample],
        min_quality_for_deploy: f64,
        hard_floor: f64,
    ) -> Result<TrainingDecision, ServiceError> {
        if self.in_progress.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return Err(ServiceError::TrainingAlreadyInProgress);
        }
        let outcome = self.run_cycle_inner(trainer, dataset, min_quality_for_deploy, hard_floor).await;
        self.in_progress.store(false, Ordering::SeqCst);
        outcome
    }

    /// Returns whether a training cycle is currently running.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    async fn run_cycle_inner(
        &self,
        trainer: &dyn ModelTrainer,
        dataset: &[EvolutionSample],
        min_quality_for_deploy: f64,
        hard_floor: f64,
    ) -> Result<TrainingDecision, ServiceError> {
        let candidate_id = trainer.fine_tune(dataset).await?;
        let report = trainer.validate(&candidate_id).await?;
        if report.clears_deployment_bar(min_quality_for_deploy, hard_floor) {
            Ok(TrainingDecision::Deployed(ModelVersion {
                id: candidate_id,
                trained_on_samples: dataset.len(),
                validation: report,
                created_at: evoseal_core::time::Timestamp::now(),
            }))
        } else {
            Ok(TrainingDecision::RolledBack { report })
        }
    }
}

impl Default for TrainingGuard {
    fn default() -> Self {
        Self::new()
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
    use std::sync::Arc;

    use crate::model::ValidationScores;

    use super::*;

    struct StubTrainer {
        scores: ValidationScores,
    }

    #[async_trait]
    impl ModelTrainer for StubTrainer {
        async fn fine_tune(&self, _dataset: &[EvolutionSample]) -> Result<ModelVersionId, ServiceError> {
            Ok(ModelVersionId::generate())
        }

        async fn validate(&self, _candidate: &ModelVersionId) -> Result<ValidationReport, ServiceError> {
            Ok(ValidationReport::new(self.scores))
        }
    }

    fn passing_scores() -> ValidationScores {
        ValidationScores {
            functional_correctness: 0.9,
            output_quality: 0.9,
            instruction_following: 0.9,
            safety_alignment: 0.9,
            performance_latency: 0.9,
        }
    }

    fn failing_scores() -> ValidationScores {
        ValidationScores {
            functional_correctness: 0.1,
            output_quality: 0.1,
            instruction_following: 0.1,
            safety_alignment: 0.1,
            performance_latency: 0.1,
        }
    }

    #[tokio::test]
    async fn clearing_the_bar_deploys() {
        let guard = TrainingGuard::new();
        let trainer = StubTrainer { scores: passing_scores() };
        let decision = guard.run_cycle(&trainer, &[], 0.7, 0.5).await.expect("cycle");
        assert!(matches!(decision, TrainingDecision::Deployed(_)));
        assert!(!guard.is_in_progress());
    }

    #[tokio::test]
    async fn missing_the_bar_rolls_back() {
        let guard = TrainingGuard::new();
        let trainer = StubTrainer { scores: failing_scores() };
        let decision = guard.run_cycle(&trainer, &[], 0.7, 0.5).await.expect("cycle");
        assert!(matches!(decision, TrainingDecision::RolledBack { .. }));
    }

    #[tokio::test]
    async fn concurrent_cycle_is_rejected() {
        let guard = Arc::new(TrainingGuard::new());
        guard.in_progress.store(true, Ordering::SeqCst);
        let trainer = StubTrainer { scores: passing_scores() };
        let result = guard.run_cycle(&trainer, &[], 0.7, 0.5).await;
        assert!(matches!(result, Err(ServiceError::TrainingAlreadyInProgress)));
    }
}
