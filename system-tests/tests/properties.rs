// system-tests/tests/properties.rs
// ============================================================================
// Module: System Properties
// Description: Cross-crate checks of the invariants the system as a whole is
//              expected to uphold, independent of any one scenario.
// Purpose: Guard the properties a careful reviewer would check by hand:
//          checkpoint integrity, safe fallback targets, event ordering,
//          dependency ordering, training single-concurrency, regression
//          monotonicity, rollback determinism, and experiment round-trips.
// Dependencies: evoseal-core, evoseal-eventbus, evoseal-safety,
//               evoseal-service, evoseal-store, tokio
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
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use evoseal_config::RollbackPolicyConfig;
use evoseal_core::identifiers::ExperimentId;
use evoseal_core::identifiers::ModelVersionId;
use evoseal_core::identifiers::VersionId;
use evoseal_core::model::CheckpointKind;
use evoseal_core::model::Event;
use evoseal_core::model::EventTopic;
use evoseal_core::model::Metric;
use evoseal_core::model::MetricKind;
use evoseal_core::model::Severity;
use evoseal_core::model::TestOutcome;
use evoseal_core::model::TestStatus;
use evoseal_core::model::Version;
use evoseal_core::time::Timestamp;
use evoseal_eventbus::DispatchControl;
use evoseal_eventbus::EventBusHandle;
use evoseal_eventbus::EventHandler;
use evoseal_eventbus::HandlerError;
use evoseal_safety::DetectorThresholds;
use evoseal_safety::RegressionDetector;
use evoseal_safety::RollbackManager;
use evoseal_service::EvolutionSample;
use evoseal_service::ModelTrainer;
use evoseal_service::ServiceError;
use evoseal_service::TrainingDecision;
use evoseal_service::TrainingGuard;
use evoseal_service::ValidationReport;
use evoseal_service::ValidationScores;
use evoseal_store::CheckpointStore;
use evoseal_store::EvoStore;

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

fn sample_payload() -> BTreeMap<String, Vec<u8>> {
    let mut payload = BTreeMap::new();
    payload.insert("src/lib.rs".to_string(), b"pub fn lib() {}".to_vec());
    payload
}

// ============================================================================
// SECTION: Property 1 - checkpoint integrity
// ============================================================================

#[test]
fn checkpoint_round_trip_preserves_payload_and_detects_corruption() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = EvoStore::open_in_memory().expect("open");
    let experiment_id = ExperimentId::new("exp_ckpt").expect("valid");
    let version = root_version(&experiment_id, "v1");
    store.save_version(&version).expect("save");

    let checkpoints = CheckpointStore::new(dir.path().join("checkpoints"));
    checkpoints
        .create(&store, &version.id, &sample_payload(), CheckpointKind::Automatic, BTreeMap::new())
        .expect("create checkpoint");

    let restored = checkpoints.restore(&store, &version.id, &dir.path().join("restore_ok")).expect("restore should succeed");
    assert_eq!(restored.payload, sample_payload());
    assert!(!restored.redirected);

    // Flip a byte in the payload on disk; restoring must now fail its
    // content-hash verification rather than silently serving stale bytes.
    let payload_file = dir.path().join("checkpoints").join("v1").join("payload").join("src/lib.rs");
    std::fs::write(&payload_file, b"pub fn corrupted() {}").expect("tamper");

    let restored_after_tamper = checkpoints.restore(&store, &version.id, &dir.path().join("restore_bad"));
    assert!(restored_after_tamper.is_err(), "a tampered payload must fail its content-hash check");
}

// ============================================================================
// SECTION: Property 2 - rollback target never lands on a protected path
// ============================================================================

#[test]
fn rollback_restore_target_is_redirected_away_from_protected_paths() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = EvoStore::open_in_memory().expect("open");
    let experiment_id = ExperimentId::new("exp_guard").expect("valid");
    let version = root_version(&experiment_id, "v1");
    store.save_version(&version).expect("save");

    let checkpoints = CheckpointStore::new(dir.path().join("checkpoints"));
    checkpoints.create(&store, &version.id, &sample_payload(), CheckpointKind::Automatic, BTreeMap::new()).expect("checkpoint");

    // Ask to restore directly into a protected system path; the guard must
    // redirect to a safe location under the checkpoint root instead of
    // writing there.
    let restored = checkpoints
        .restore(&store, &version.id, std::path::Path::new("/etc"))
        .expect("restore should be redirected, not rejected");
    assert!(restored.redirected);
    assert!(!restored.written_to.starts_with("/etc"));
}

// ============================================================================
// SECTION: Property 3 - event handlers fire in priority then insertion order
// ============================================================================

struct RecordingHandler {
    label: &'static str,
    order: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, _event: &Event) -> Result<DispatchControl, HandlerError> {
        self.order.lock().expect("lock").push(self.label);
        Ok(DispatchControl::Continue)
    }
}

#[tokio::test]
async fn event_handlers_dispatch_by_priority_then_registration_order() {
    let bus = EventBusHandle::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    // Registered low-to-high priority but out of label order, so a pure
    // insertion-order dispatch would be wrong; only priority-first,
    // insertion-order-tiebreak dispatch produces "high_a", "high_b", "low".
    bus.subscribe([EventTopic::Log], 0, Arc::new(RecordingHandler { label: "low", order: Arc::clone(&order) })).await;
    bus.subscribe([EventTopic::Log], 10, Arc::new(RecordingHandler { label: "high_a", order: Arc::clone(&order) })).await;
    bus.subscribe([EventTopic::Log], 10, Arc::new(RecordingHandler { label: "high_b", order: Arc::clone(&order) })).await;

    bus.publish(Event::log(evoseal_core::model::LogLevel::Info, "system-tests", "tick")).await;

    let observed = order.lock().expect("lock").clone();
    assert_eq!(observed, vec!["high_a", "high_b", "low"]);
}

// ============================================================================
// SECTION: Property 4 - metric series preserve temporal order across versions
// ============================================================================

#[test]
fn metric_series_preserves_temporal_order_across_versions() {
    let store = EvoStore::open_in_memory().expect("open");
    let experiment_id = ExperimentId::new("exp_order").expect("valid");
    for (index, (version_id, value)) in [("v1", 0.10_f64), ("v2", 0.20), ("v3", 0.30)].into_iter().enumerate() {
        let version = root_version(&experiment_id, version_id);
        store.save_version(&version).expect("save version");
        let metric = Metric {
            name: "latency_ms".to_string(),
            value,
            kind: MetricKind::PerformanceLowerBetter,
            version_id: version.id,
            iteration: 1,
            step: index as u64,
            timestamp: Timestamp::now(),
        };
        store.record_metric(&experiment_id, &metric).expect("record metric");
    }

    let series = store.metric_series(&experiment_id, "latency_ms", None).expect("series");
    let values: Vec<f64> = series.into_iter().map(|(_version_id, value)| value).collect();
    assert_eq!(values, vec![0.10, 0.20, 0.30], "series must be ordered oldest-first regardless of version insertion order");
}

// ============================================================================
// SECTION: Property 5 - at most one training cycle runs at a time
// ============================================================================

struct DelayedTrainer {
    scores: ValidationScores,
}

#[async_trait]
impl ModelTrainer for DelayedTrainer {
    async fn fine_tune(&self, _dataset: &[EvolutionSample]) -> Result<ModelVersionId, ServiceError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
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

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_training_cycles_never_interleave() {
    let guard = Arc::new(TrainingGuard::new());
    let trainer = Arc::new(DelayedTrainer { scores: passing_scores() });

    let guard_a = Arc::clone(&guard);
    let trainer_a = Arc::clone(&trainer);
    let first = tokio::spawn(async move { guard_a.run_cycle(trainer_a.as_ref(), &[], 0.7, 0.5).await });

    // Give the first cycle time to flip the atomic guard before the second
    // one starts its own call.
    tokio::time::sleep(Duration::from_millis(10)).await;

    let guard_b = Arc::clone(&guard);
    let trainer_b = Arc::clone(&trainer);
    let second = tokio::spawn(async move { guard_b.run_cycle(trainer_b.as_ref(), &[], 0.7, 0.5).await });

    let (first_result, second_result) = tokio::join!(first, second);
    let first_outcome = first_result.expect("join");
    let second_outcome = second_result.expect("join");

    let outcomes = [first_outcome, second_outcome];
    let succeeded = outcomes.iter().filter(|outcome| matches!(outcome, Ok(TrainingDecision::Deployed(_)))).count();
    let rejected = outcomes.iter().filter(|outcome| matches!(outcome, Err(ServiceError::TrainingAlreadyInProgress))).count();

    assert_eq!(succeeded, 1, "exactly one cycle should run to completion");
    assert_eq!(rejected, 1, "the overlapping cycle must be rejected immediately, not queued");
    assert!(!guard.is_in_progress());
}

// ============================================================================
// SECTION: Property 6 - regression severity is monotone in the size of the drop
// ============================================================================

#[test]
fn regression_severity_is_monotone_in_drop_magnitude() {
    fn severity_for_drop(drop_value: f64) -> Severity {
        let store = EvoStore::open_in_memory().expect("open");
        let experiment_id = ExperimentId::new("exp_mono").expect("valid");
        let baseline = root_version(&experiment_id, "baseline");
        store.save_version(&baseline).expect("save baseline");
        for step in 0..6u64 {
            let metric = Metric {
                name: "success_rate".to_string(),
                value: 0.9,
                kind: MetricKind::QualityHigherBetter,
                version_id: baseline.id.clone(),
                iteration: 1,
                step,
                timestamp: Timestamp::now(),
            };
            store.record_metric(&experiment_id, &metric).expect("record baseline metric");
        }

        let candidate = root_version(&experiment_id, "candidate");
        store.save_version(&candidate).expect("save candidate");
        let candidate_metric = Metric {
            name: "success_rate".to_string(),
            value: drop_value,
            kind: MetricKind::QualityHigherBetter,
            version_id: candidate.id.clone(),
            iteration: 1,
            step: 0,
            timestamp: Timestamp::now(),
        };
        store.record_metric(&experiment_id, &candidate_metric).expect("record candidate metric");

        let detector = RegressionDetector::new(store, DetectorThresholds::default());
        let report = detector.evaluate(&experiment_id, &baseline.id, &candidate.id).expect("evaluate");
        report.overall_severity
    }

    let mild = severity_for_drop(0.89);
    let moderate = severity_for_drop(0.75);
    let severe = severity_for_drop(0.20);

    assert!(mild <= moderate, "a smaller drop must never be rated more severe than a larger one");
    assert!(moderate <= severe, "a smaller drop must never be rated more severe than a larger one");

    // 0.9 -> 0.75 is a ~16.7% relative drop, past the default 10% critical_delta:
    // severity must be at least critical on threshold alone, per-anomaly promotion aside.
    assert_eq!(moderate, Severity::Critical, "a drop at or past critical_delta must be rated critical");
    assert_eq!(severe, Severity::Critical);
}

// ============================================================================
// SECTION: Property 7 - rollback decisions are deterministic
// ============================================================================

#[test]
fn rollback_decision_is_deterministic_for_identical_inputs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = EvoStore::open_in_memory().expect("open");
    let experiment_id = ExperimentId::new("exp_det").expect("valid");
    let v1 = root_version(&experiment_id, "v1");
    store.save_version(&v1).expect("save v1");
    let mut v2 = root_version(&experiment_id, "v2");
    v2.parent_ids = vec![v1.id.clone()];
    v2.generation = 1;
    store.save_version(&v2).expect("save v2");

    let checkpoints = CheckpointStore::new(dir.path().join("checkpoints"));
    checkpoints.create(&store, &v1.id, &sample_payload(), CheckpointKind::Automatic, BTreeMap::new()).expect("checkpoint v1");

    let rollback = RollbackManager::new(store, checkpoints, RollbackPolicyConfig::default());
    let failing = vec![TestOutcome { name: "acceptance".to_string(), status: TestStatus::Fail, detail: "boom".to_string() }];

    let first = rollback
        .auto_rollback_on_failure(&v1.id, &v2.id, &dir.path().join("work_first"), &failing, None)
        .expect("first rollback")
        .expect("a failing test must trigger a rollback attempt");
    let second = rollback
        .auto_rollback_on_failure(&v1.id, &v2.id, &dir.path().join("work_second"), &failing, None)
        .expect("second rollback")
        .expect("a failing test must trigger a rollback attempt");

    assert_eq!(first.succeeded(), second.succeeded());
    assert_eq!(first.to_version_id, second.to_version_id);
}

// ============================================================================
// SECTION: Property 8 - experiment data survives a full store round-trip
// ============================================================================

#[test]
fn experiment_lineage_and_metrics_round_trip_through_the_store() {
    let store = EvoStore::open_in_memory().expect("open");
    let experiment_id = ExperimentId::new("exp_roundtrip").expect("valid");

    let root = root_version(&experiment_id, "root");
    store.save_version(&root).expect("save root");
    let mut child = root_version(&experiment_id, "child");
    child.parent_ids = vec![root.id.clone()];
    child.generation = 1;
    store.save_version(&child).expect("save child");

    let metric = Metric {
        name: "success_rate".to_string(),
        value: 0.88,
        kind: MetricKind::QualityHigherBetter,
        version_id: child.id.clone(),
        iteration: 1,
        step: 0,
        timestamp: Timestamp::now(),
    };
    store.record_metric(&experiment_id, &metric).expect("record metric");

    let reloaded_child = store.get_version(&child.id).expect("load").expect("present");
    assert_eq!(reloaded_child.parent_ids, vec![root.id.clone()]);
    assert_eq!(reloaded_child.generation, 1);

    let reloaded_metric = store.get_metric(&child.id, "success_rate").expect("load metric").expect("present");
    assert!((reloaded_metric.value - 0.88).abs() < f64::EPSILON);

    let names = store.list_metric_names(&child.id).expect("names");
    assert!(names.contains(&"success_rate".to_string()));
}
