// crates/evoseal-safety/src/safety_integration.rs
// ============================================================================
// Module: Safety Integration (C6)
// Description: Composes checkpoint creation, candidate installation,
//              regression detection, and rollback into one guarded step.
// Purpose: The single entry point the orchestrator calls per evolution step
//          instead of touching C2-C5 directly.
// Dependencies: evoseal-core, evoseal-eventbus, evoseal-store
// ============================================================================

//! ## Overview
//! [`SafetyIntegration::execute_safe_evolution_step`] is the five-step
//! composition: checkpoint the current version if unchecked, install the
//! candidate, run regression detection, decide accept/rollback/manual, and
//! publish the corresponding event. Nothing else in this crate emits
//! events; every other module is deliberately bus-agnostic so it can be
//! exercised without a running bus.

use std::collections::BTreeMap;
use std::path::Path;

use evoseal_core::identifiers::ExperimentId;
use evoseal_core::identifiers::VersionId;
use evoseal_core::model::CheckpointKind;
use evoseal_core::model::Event;
use evoseal_core::model::EventTopic;
use evoseal_core::model::Metric;
use evoseal_core::model::RegressionReport;
use evoseal_core::model::RollbackRecord;
use evoseal_core::model::TestOutcome;
use evoseal_core::model::Version;
use evoseal_core::time::Timestamp;
use evoseal_eventbus::EventBusHandle;
use evoseal_store::CheckpointStore;
use evoseal_store::EvoStore;

use crate::error::SafetyError;
use crate::regression_detector::RegressionDetector;
use crate::rollback_manager::RollbackManager;

/// Result of one guarded evolution step.
#[derive(Debug, Clone)]
pub enum SafetyOutcome {
    /// The candidate passed every test and carried no critical regression;
    /// it is now the active version.
    Accepted {
        /// The accepted candidate.
        version_id: VersionId,
        /// Its regression report, kept for audit even on acceptance.
        report: RegressionReport,
    },
    /// The candidate failed a test or regressed critically and was rolled
    /// back to `current_version_id`.
    RolledBack {
        /// The rejected candidate.
        rejected_version_id: VersionId,
        /// The regression report that (possibly, alongside test failures)
        /// triggered the rollback.
        report: RegressionReport,
        /// The rollback attempt's outcome.
        rollback: RollbackRecord,
    },
    /// The candidate failed or regressed, but automatic rollback is
    /// disabled; an operator must decide.
    RequiresManualDecision {
        /// The candidate awaiting a decision.
        candidate_version_id: VersionId,
        /// Its regression report.
        report: RegressionReport,
    },
}

/// Composes the regression detector and rollback manager into the guarded
/// evolution step.
pub struct SafetyIntegration {
    store: EvoStore,
    checkpoints: CheckpointStore,
    detector: RegressionDetector,
    rollback: RollbackManager,
    auto_rollback: bool,
    events: Option<EventBusHandle>,
}

impl SafetyIntegration {
    /// Builds a safety integration over already-constructed components.
    #[must_use]
    pub fn new(
        store: EvoStore,
        checkpoints: CheckpointStore,
        detector: RegressionDetector,
        rollback: RollbackManager,
        auto_rollback: bool,
        events: Option<EventBusHandle>,
    ) -> Self {
        Self { store, checkpoints, detector, rollback, auto_rollback, events }
    }

    /// Runs the guarded step, installing `new_payload` under `new_version_id`
    /// as a candidate against `current_version_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError`] when the current version cannot be read, the
    /// candidate cannot be saved, a metric fails to record, or regression
    /// detection or rollback itself fails outright (as distinct from
    /// rejecting the candidate, which is a normal outcome variant).
    #[allow(clippy::too_many_arguments, reason = "every parameter is a distinct input the composed step needs")]
    pub async fn execute_safe_evolution_step(
        &self,
        experiment_id: &ExperimentId,
        current_version_id: &VersionId,
        new_payload: BTreeMap<String, Vec<u8>>,
        new_version_id: VersionId,
        metrics: &[Metric],
        test_results: &[TestOutcome],
        working_dir: &Path,
    ) -> Result<SafetyOutcome, SafetyError> {
        let current = self
            .store
            .get_version(current_version_id)?
            .ok_or_else(|| SafetyError::NoKnownGoodVersion(format!("current version {current_version_id} not found")))?;

        self.ensure_checkpointed(&current)?;

        let candidate = Version {
            id: new_version_id.clone(),
            parent_ids: vec![current_version_id.clone()],
            payload: new_payload,
            created_at: Timestamp::now(),
            generation: current.generation + 1,
            experiment_id: experiment_id.clone(),
        };
        self.store.save_version(&candidate)?;
        for metric in metrics {
            self.store.record_metric(experiment_id, metric)?;
        }

        let report = self.detector.evaluate(experiment_id, current_version_id, &new_version_id)?;
        let tests_failed = TestOutcome::any_failed(test_results);
        let regressed = report.is_critical;

        let outcome = if !tests_failed && !regressed {
            self.publish(EventTopic::VersionCreated, experiment_id, format!("accepted candidate {new_version_id}")).await;
            SafetyOutcome::Accepted { version_id: new_version_id, report }
        } else if self.auto_rollback {
            let rollback = self.rollback.rollback_to(
                &new_version_id,
                current_version_id,
                working_dir,
                evoseal_core::model::RollbackTrigger::RegressionDetected,
            )?;
            self.publish(EventTopic::RollbackCompleted, experiment_id, format!("rolled back candidate {new_version_id}")).await;
            SafetyOutcome::RolledBack { rejected_version_id: new_version_id, report, rollback }
        } else {
            self.publish(EventTopic::RegressionDetected, experiment_id, format!("candidate {new_version_id} requires manual review")).await;
            SafetyOutcome::RequiresManualDecision { candidate_version_id: new_version_id, report }
        };

        Ok(outcome)
    }

    /// Creates an `automatic` checkpoint for `version` if none is recorded
    /// yet.
    fn ensure_checkpointed(&self, version: &Version) -> Result<(), SafetyError> {
        if self.checkpoints.get(&self.store, &version.id)?.is_some() {
            return Ok(());
        }
        self.checkpoints.create(&self.store, &version.id, &version.payload, CheckpointKind::Automatic, BTreeMap::new())?;
        Ok(())
    }

    /// Publishes one event to the bus, when one is configured.
    async fn publish(&self, topic: EventTopic, experiment_id: &ExperimentId, message: String) {
        if let Some(bus) = &self.events {
            let mut event = Event::new(topic, "evoseal-safety", message);
            event.experiment_id = Some(experiment_id.clone());
            bus.publish(event).await;
        }
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
    use evoseal_config::RollbackPolicyConfig;
    use evoseal_core::model::MetricKind;
    use evoseal_core::model::TestStatus;
    use crate::regression_detector::DetectorThresholds;

    fn sample_integration(dir: &std::path::Path, store: EvoStore) -> SafetyIntegration {
        let checkpoints = CheckpointStore::new(dir.join("checkpoints"));
        let detector = RegressionDetector::new(store.clone(), DetectorThresholds::default());
        let rollback = RollbackManager::new(store.clone(), CheckpointStore::new(dir.join("checkpoints")), RollbackPolicyConfig::default());
        SafetyIntegration::new(store, checkpoints, detector, rollback, true, None)
    }

    fn root_version(experiment_id: &ExperimentId, id: &str) -> Version {
        Version {
            id: VersionId::new(id).expect("valid"),
            parent_ids: Vec::new(),
            payload: BTreeMap::new(),
            created_at: Timestamp::now(),
            generation: 0,
            experiment_id: experiment_id.clone(),
        }
    }

    #[tokio::test]
    async fn accepts_candidate_with_no_regression_and_passing_tests() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = EvoStore::open_in_memory().expect("open");
        let experiment_id = ExperimentId::new("exp1").expect("valid");
        let current = root_version(&experiment_id, "v1");
        store.save_version(&current).expect("save");

        let integration = sample_integration(dir.path(), store);
        let passing = vec![TestOutcome { name: "acceptance".to_string(), status: TestStatus::Pass, detail: String::new() }];
        let metric = Metric {
            name: "success_rate".to_string(),
            value: 0.9,
            kind: MetricKind::QualityHigherBetter,
            version_id: VersionId::new("v2").expect("valid"),
            iteration: 1,
            step: 0,
            timestamp: Timestamp::now(),
        };

        let outcome = integration
            .execute_safe_evolution_step(
                &experiment_id,
                &current.id,
                BTreeMap::new(),
                VersionId::new("v2").expect("valid"),
                std::slice::from_ref(&metric),
                &passing,
                &dir.path().join("work"),
            )
            .await
            .expect("execute");
        assert!(matches!(outcome, SafetyOutcome::Accepted { .. }));
    }

    #[tokio::test]
    async fn rolls_back_candidate_on_test_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = EvoStore::open_in_memory().expect("open");
        let experiment_id = ExperimentId::new("exp1").expect("valid");
        let current = root_version(&experiment_id, "v1");
        store.save_version(&current).expect("save");

        let integration = sample_integration(dir.path(), store);
        let failing = vec![TestOutcome { name: "acceptance".to_string(), status: TestStatus::Fail, detail: "boom".to_string() }];

        let outcome = integration
            .execute_safe_evolution_step(
                &experiment_id,
                &current.id,
                BTreeMap::new(),
                VersionId::new("v2").expect("valid"),
                &[],
                &failing,
                &dir.path().join("work"),
            )
            .await
            .expect("execute");
        assert!(matches!(outcome, SafetyOutcome::RolledBack { .. }));
    }

    #[tokio::test]
    async fn requires_manual_decision_when_auto_rollback_disabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = EvoStore::open_in_memory().expect("open");
        let experiment_id = ExperimentId::new("exp1").expect("valid");
        let current = root_version(&experiment_id, "v1");
        store.save_version(&current).expect("save");

        let checkpoints = CheckpointStore::new(dir.path().join("checkpoints"));
        let detector = RegressionDetector::new(store.clone(), DetectorThresholds::default());
        let rollback = RollbackManager::new(store.clone(), CheckpointStore::new(dir.path().join("checkpoints")), RollbackPolicyConfig::default());
        let integration = SafetyIntegration::new(store, checkpoints, detector, rollback, false, None);

        let failing = vec![TestOutcome { name: "acceptance".to_string(), status: TestStatus::Fail, detail: "boom".to_string() }];
        let outcome = integration
            .execute_safe_evolution_step(
                &experiment_id,
                &current.id,
                BTreeMap::new(),
                VersionId::new("v2").expect("valid"),
                &[],
                &failing,
                &dir.path().join("work"),
            )
            .await
            .expect("execute");
        assert!(matches!(outcome, SafetyOutcome::RequiresManualDecision { .. }));
    }
}
