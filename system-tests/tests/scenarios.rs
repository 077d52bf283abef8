// system-tests/tests/scenarios.rs
// ============================================================================
// Module: System Scenarios
// Description: End-to-end exercises of the six concrete evolution scenarios,
//              each driving two or more crates together the way a real
//              embedding application would.
// Purpose: Catch integration regressions unit tests within a single crate
//          cannot see.
// Dependencies: evoseal-adapters, evoseal-config, evoseal-core,
//               evoseal-orchestrator, evoseal-safety, evoseal-service,
//               evoseal-store, tokio
// ============================================================================
#![cfg(feature = "system-tests")]
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

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use evoseal_adapters::AdapterError;
use evoseal_adapters::AdapterState;
use evoseal_adapters::AdapterStatus;
use evoseal_adapters::ComponentAdapter;
use evoseal_config::RollbackPolicyConfig;
use evoseal_core::identifiers::AdapterId;
use evoseal_core::identifiers::ExperimentId;
use evoseal_core::identifiers::StepId;
use evoseal_core::identifiers::VersionId;
use evoseal_core::identifiers::WorkflowId;
use evoseal_core::model::CheckpointKind;
use evoseal_core::model::Metric;
use evoseal_core::model::MetricKind;
use evoseal_core::model::TestOutcome;
use evoseal_core::model::TestStatus;
use evoseal_core::model::Version;
use evoseal_core::model::WorkflowStep;
use evoseal_core::time::Timestamp;
use evoseal_orchestrator::OrchestratorError;
use evoseal_orchestrator::ResourceSample;
use evoseal_orchestrator::ResourceSampler;
use evoseal_orchestrator::WorkflowConfig;
use evoseal_orchestrator::WorkflowOrchestrator;
use evoseal_orchestrator::ExecutionStrategy;
use evoseal_safety::DetectorThresholds;
use evoseal_safety::RegressionDetector;
use evoseal_safety::RollbackManager;
use evoseal_safety::SafetyIntegration;
use evoseal_safety::SafetyOutcome;
use evoseal_service::EvolutionDataCollector;
use evoseal_service::EvolutionSample;
use evoseal_service::ModelTrainer;
use evoseal_service::ServiceError;
use evoseal_service::TrainingDecision;
use evoseal_service::TrainingGuard;
use evoseal_service::ValidationReport;
use evoseal_service::ValidationScores;
use evoseal_store::CheckpointStore;
use evoseal_store::EvoStore;

// ============================================================================
// SECTION: Shared fixtures
// ============================================================================

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

fn quality_metric(version: &str, value: f64) -> Metric {
    Metric {
        name: "success_rate".to_string(),
        value,
        kind: MetricKind::QualityHigherBetter,
        version_id: VersionId::new(version).expect("valid"),
        iteration: 1,
        step: 0,
        timestamp: Timestamp::now(),
    }
}

fn sample_payload() -> BTreeMap<String, Vec<u8>> {
    let mut payload = BTreeMap::new();
    payload.insert("src/main.rs".to_string(), b"fn main() {}".to_vec());
    payload
}

fn build_integration(dir: &Path, store: EvoStore, auto_rollback: bool) -> SafetyIntegration {
    let checkpoints = CheckpointStore::new(dir.join("checkpoints"));
    let detector = RegressionDetector::new(store.clone(), DetectorThresholds::default());
    let rollback =
        RollbackManager::new(store.clone(), CheckpointStore::new(dir.join("checkpoints")), RollbackPolicyConfig::default());
    SafetyIntegration::new(store, checkpoints, detector, rollback, auto_rollback, None)
}

// ============================================================================
// SECTION: S1 - happy path accepts a healthy candidate
// ============================================================================

#[tokio::test]
async fn s1_happy_path_accepts_candidate_without_regression() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = EvoStore::open_in_memory().expect("open");
    let experiment_id = ExperimentId::new("exp_s1").expect("valid");
    let current = root_version(&experiment_id, "v1");
    store.save_version(&current).expect("save current");

    let integration = build_integration(dir.path(), store, true);
    let passing = vec![TestOutcome { name: "acceptance".to_string(), status: TestStatus::Pass, detail: String::new() }];
    let metric = quality_metric("v2", 0.92);

    let outcome = integration
        .execute_safe_evolution_step(
            &experiment_id,
            &current.id,
            sample_payload(),
            VersionId::new("v2").expect("valid"),
            std::slice::from_ref(&metric),
            &passing,
            &dir.path().join("work"),
        )
        .await
        .expect("execute");

    match outcome {
        SafetyOutcome::Accepted { version_id, report } => {
            assert_eq!(version_id.as_str(), "v2");
            assert!(!report.requires_rollback());
        }
        other => panic!("expected acceptance, got {other:?}"),
    }
}

// ============================================================================
// SECTION: S2 - critical regression triggers rollback
// ============================================================================

#[tokio::test]
async fn s2_critical_regression_triggers_rollback() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = EvoStore::open_in_memory().expect("open");
    let experiment_id = ExperimentId::new("exp_s2").expect("valid");
    let current = root_version(&experiment_id, "v1");
    store.save_version(&current).expect("save current");

    // A steady, low-variance history on the baseline version gives the
    // detector enough signal to flag both a worsening trend and an anomaly,
    // promoting the finding twice and saturating at Severity::Critical.
    for (step, value) in [0.95_f64, 0.94, 0.96, 0.95, 0.93, 0.96, 0.94, 0.95].into_iter().enumerate() {
        let mut history_metric = quality_metric("v1", value);
        history_metric.step = step as u64;
        store.record_metric(&experiment_id, &history_metric).expect("record history");
    }

    let checkpoints = CheckpointStore::new(dir.path().join("checkpoints"));
    checkpoints
        .create(&store, &current.id, &sample_payload(), CheckpointKind::Automatic, BTreeMap::new())
        .expect("checkpoint current");

    let integration = build_integration(dir.path(), store, true);
    let passing = vec![TestOutcome { name: "acceptance".to_string(), status: TestStatus::Pass, detail: String::new() }];
    let metric = quality_metric("v2", 0.30);

    let outcome = integration
        .execute_safe_evolution_step(
            &experiment_id,
            &current.id,
            sample_payload(),
            VersionId::new("v2").expect("valid"),
            std::slice::from_ref(&metric),
            &passing,
            &dir.path().join("work"),
        )
        .await
        .expect("execute");

    match outcome {
        SafetyOutcome::RolledBack { rejected_version_id, report, rollback } => {
            assert_eq!(rejected_version_id.as_str(), "v2");
            assert!(report.requires_rollback());
            assert!(rollback.succeeded());
            assert_eq!(rollback.to_version_id, Some(current.id));
        }
        other => panic!("expected rollback, got {other:?}"),
    }
}

// ============================================================================
// SECTION: S3 - test failure with auto-rollback disabled requires a manual decision
// ============================================================================

#[tokio::test]
async fn s3_test_failure_with_auto_rollback_disabled_requires_manual_decision() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = EvoStore::open_in_memory().expect("open");
    let experiment_id = ExperimentId::new("exp_s3").expect("valid");
    let current = root_version(&experiment_id, "v1");
    store.save_version(&current).expect("save current");

    let integration = build_integration(dir.path(), store, false);
    let failing = vec![TestOutcome { name: "acceptance".to_string(), status: TestStatus::Fail, detail: "assertion failed".to_string() }];

    let outcome = integration
        .execute_safe_evolution_step(
            &experiment_id,
            &current.id,
            sample_payload(),
            VersionId::new("v2").expect("valid"),
            &[],
            &failing,
            &dir.path().join("work"),
        )
        .await
        .expect("execute");

    match outcome {
        SafetyOutcome::RequiresManualDecision { candidate_version_id, .. } => {
            assert_eq!(candidate_version_id.as_str(), "v2");
        }
        other => panic!("expected a manual decision, got {other:?}"),
    }
}

// ============================================================================
// SECTION: S4 - cascading rollback skips a corrupt checkpoint
// ============================================================================

#[tokio::test]
async fn s4_cascading_rollback_skips_corrupt_checkpoint() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = EvoStore::open_in_memory().expect("open");
    let experiment_id = ExperimentId::new("exp_s4").expect("valid");

    // v1 <- v2 <- v3, where v2's checkpoint is tampered after creation so
    // restoring it fails its content-hash check; cascading_rollback must
    // walk past it to v1.
    let v1 = root_version(&experiment_id, "v1");
    store.save_version(&v1).expect("save v1");
    let mut v2 = root_version(&experiment_id, "v2");
    v2.parent_ids = vec![v1.id.clone()];
    v2.generation = 1;
    store.save_version(&v2).expect("save v2");
    let mut v3 = root_version(&experiment_id, "v3");
    v3.parent_ids = vec![v2.id.clone()];
    v3.generation = 2;
    store.save_version(&v3).expect("save v3");

    let checkpoints = CheckpointStore::new(dir.path().join("checkpoints"));
    checkpoints.create(&store, &v1.id, &sample_payload(), CheckpointKind::Automatic, BTreeMap::new()).expect("checkpoint v1");
    checkpoints.create(&store, &v2.id, &sample_payload(), CheckpointKind::Automatic, BTreeMap::new()).expect("checkpoint v2");
    std::fs::write(
        dir.path().join("checkpoints").join("v2").join("payload").join("src/main.rs"),
        b"tampered",
    )
    .expect("tamper v2's checkpoint");

    let rollback = RollbackManager::new(store, checkpoints, RollbackPolicyConfig { max_attempts: 5, ..RollbackPolicyConfig::default() });
    let record = rollback.cascading_rollback(&v3.id, &dir.path().join("work")).expect("cascading rollback");
    assert!(record.succeeded());
    assert_eq!(record.to_version_id, Some(v1.id));
}

// ============================================================================
// SECTION: S5 - workflow recovers via retry before exhausting a critical step
// ============================================================================

struct FlakyAdapter {
    failures_remaining: AtomicU32,
}

#[async_trait]
impl ComponentAdapter for FlakyAdapter {
    async fn initialize(&self) -> Result<(), AdapterError> {
        Ok(())
    }
    async fn start(&self) -> Result<(), AdapterError> {
        Ok(())
    }
    async fn pause(&self) -> Result<(), AdapterError> {
        Ok(())
    }
    async fn resume(&self) -> Result<(), AdapterError> {
        Ok(())
    }
    async fn stop(&self) -> Result<(), AdapterError> {
        Ok(())
    }
    async fn execute(&self, _operation_name: &str, _args: serde_json::Value) -> Result<serde_json::Value, AdapterError> {
        if self.failures_remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| if n == 0 { None } else { Some(n - 1) }).is_ok() {
            Err(AdapterError::Component("transient failure".to_string()))
        } else {
            Ok(serde_json::json!({ "ok": true }))
        }
    }
    fn get_status(&self) -> AdapterStatus {
        AdapterStatus { state: AdapterState::Running, detail: String::new() }
    }
    fn get_metrics(&self) -> BTreeMap<String, f64> {
        BTreeMap::new()
    }
}

struct NoopSampler;
impl ResourceSampler for NoopSampler {
    fn sample(&self) -> ResourceSample {
        ResourceSample::default()
    }
}

#[tokio::test]
async fn s5_workflow_recovers_via_retry_before_exhausting_critical_step() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = EvoStore::open_in_memory().expect("open store");
    let checkpoints = CheckpointStore::new(dir.path().join("checkpoints"));

    let adapter_id = AdapterId::new("adp_flaky").expect("valid");
    let mut adapters: BTreeMap<AdapterId, Arc<dyn ComponentAdapter>> = BTreeMap::new();
    adapters.insert(adapter_id.clone(), Arc::new(FlakyAdapter { failures_remaining: AtomicU32::new(2) }));

    let orchestrator = WorkflowOrchestrator::new(store, checkpoints, None, adapters);
    let step = WorkflowStep {
        step_id: StepId::new("flaky_step").expect("valid"),
        name: "flaky_step".to_string(),
        component_ref: adapter_id,
        operation_name: "run".to_string(),
        params: serde_json::Value::Null,
        dependencies: Vec::new(),
        timeout: Duration::from_secs(1),
        retry_count: 3,
        retry_delay: Duration::from_millis(1),
        critical: true,
        parallel_group: None,
        priority: 0,
    };
    let config = WorkflowConfig {
        workflow_id: WorkflowId::new("wf_s5").expect("valid"),
        experiment_id: ExperimentId::new("exp_s5").expect("valid"),
        iterations: 1,
        steps: vec![step],
        execution_strategy: ExecutionStrategy::Sequential,
        checkpoint_interval: 1,
        resource_thresholds: BTreeMap::new(),
        monitoring_interval: Duration::from_millis(10),
        retry_backoff_multiplier: 1.0,
        max_retry_delay: Duration::from_millis(5),
    };

    let context = orchestrator
        .run(config, dir.path(), Box::new(NoopSampler), None)
        .await
        .expect("run should recover within its retry budget");
    let result = context.per_step_results.values().next().expect("one step result");
    assert_eq!(result.status, evoseal_core::model::StepStatus::Succeeded);
    assert_eq!(result.attempts, 3);
}

#[tokio::test]
async fn s5_workflow_fails_when_retries_are_exhausted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = EvoStore::open_in_memory().expect("open store");
    let checkpoints = CheckpointStore::new(dir.path().join("checkpoints"));

    let adapter_id = AdapterId::new("adp_flaky").expect("valid");
    let mut adapters: BTreeMap<AdapterId, Arc<dyn ComponentAdapter>> = BTreeMap::new();
    adapters.insert(adapter_id.clone(), Arc::new(FlakyAdapter { failures_remaining: AtomicU32::new(10) }));

    let orchestrator = WorkflowOrchestrator::new(store, checkpoints, None, adapters);
    let step = WorkflowStep {
        step_id: StepId::new("flaky_step").expect("valid"),
        name: "flaky_step".to_string(),
        component_ref: adapter_id,
        operation_name: "run".to_string(),
        params: serde_json::Value::Null,
        dependencies: Vec::new(),
        timeout: Duration::from_secs(1),
        retry_count: 2,
        retry_delay: Duration::from_millis(1),
        critical: true,
        parallel_group: None,
        priority: 0,
    };
    let config = WorkflowConfig {
        workflow_id: WorkflowId::new("wf_s5b").expect("valid"),
        experiment_id: ExperimentId::new("exp_s5b").expect("valid"),
        iterations: 1,
        steps: vec![step],
        execution_strategy: ExecutionStrategy::Sequential,
        checkpoint_interval: 1,
        resource_thresholds: BTreeMap::new(),
        monitoring_interval: Duration::from_millis(10),
        retry_backoff_multiplier: 1.0,
        max_retry_delay: Duration::from_millis(5),
    };

    let result = orchestrator.run(config, dir.path(), Box::new(NoopSampler), None).await;
    assert!(matches!(result, Err(OrchestratorError::CriticalStepFailed { .. })));
}

// ============================================================================
// SECTION: S6 - training is gated by accumulated sample count
// ============================================================================

struct StubTrainer {
    scores: ValidationScores,
}

#[async_trait]
impl ModelTrainer for StubTrainer {
    async fn fine_tune(&self, _dataset: &[EvolutionSample]) -> Result<evoseal_core::identifiers::ModelVersionId, ServiceError> {
        Ok(evoseal_core::identifiers::ModelVersionId::generate())
    }

    async fn validate(&self, _candidate: &evoseal_core::identifiers::ModelVersionId) -> Result<ValidationReport, ServiceError> {
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

fn sample(score: f64) -> EvolutionSample {
    EvolutionSample {
        prompt_context: "implement a sort".to_string(),
        generated_code: "fn sort() {}".to_string(),
        evaluation_score: score,
        pattern_tags: Vec::new(),
        recorded_at: Timestamp::now(),
    }
}

#[tokio::test]
async fn s6_training_gated_by_sample_count() {
    let collector = EvolutionDataCollector::new();
    for _ in 0..4 {
        collector.record(sample(0.9)).await;
    }
    assert!(!collector.ready_for_training(5, 0.8, 0.5).await, "four samples must not satisfy a floor of five");

    collector.record(sample(0.95)).await;
    assert!(collector.ready_for_training(5, 0.8, 0.5).await, "five qualifying samples must satisfy the floor");

    let guard = TrainingGuard::new();
    let trainer = StubTrainer { scores: passing_scores() };
    let recent = collector.recent_patterns(5).await;
    let decision = guard.run_cycle(&trainer, &recent, 0.7, 0.5).await.expect("cycle");
    assert!(matches!(decision, TrainingDecision::Deployed(_)));
}
