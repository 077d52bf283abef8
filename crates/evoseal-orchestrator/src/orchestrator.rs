// crates/evoseal-orchestrator/src/orchestrator.rs
// ============================================================================
// Module: Workflow Orchestrator
// Description: Drives an iterated DAG of WorkflowSteps through dispatch,
//              checkpointing, recovery, and resource monitoring.
// Purpose: C8's top-level driver — the only component that mutates an
//          ExecutionContext during a run.
// Dependencies: evoseal-adapters, evoseal-core, evoseal-eventbus,
//               evoseal-store, tokio
// ============================================================================

//! ## Overview
//! [`WorkflowOrchestrator::run`] validates the step DAG once via
//! [`crate::dag::topological_waves`], then drives iterations wave by wave,
//! dispatching each wave per [`ExecutionStrategy`]. Pause/resume/cancel are
//! signalled through the external [`OrchestratorControl`] handle returned by
//! [`WorkflowOrchestrator::control`], checked between steps so the current
//! step always finishes before a pause or cancel takes effect.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use evoseal_adapters::ComponentAdapter;
use evoseal_core::identifiers::AdapterId;
use evoseal_core::identifiers::CheckpointId;
use evoseal_core::model::CheckpointKind;
use evoseal_core::model::Event;
use evoseal_core::model::EventTopic;
use evoseal_core::model::ExecutionContext;
use evoseal_core::model::LogLevel;
use evoseal_core::model::StepResult;
use evoseal_core::model::StepStatus;
use evoseal_core::model::WorkflowStep;
use evoseal_eventbus::EventBusHandle;
use evoseal_store::CheckpointStore;
use evoseal_store::EvoStore;

use crate::config::ExecutionStrategy;
use crate::config::WorkflowConfig;
use crate::dag::topological_waves;
use crate::error::OrchestratorError;
use crate::recovery::CustomRecoveryAction;
use crate::recovery::RecoveryLadder;
use crate::recovery::RecoveryOutcome;
use crate::resource::ResourceMonitor;
use crate::resource::ResourceSampler;
use crate::state::RunState;
use crate::state::RunStateCell;

/// External pause/resume/cancel signalling for a running [`WorkflowOrchestrator`].
///
/// # Invariants
/// - Checked only between step dispatches; the step in flight always
///   completes (or times out) before a pause or cancel takes effect.
#[derive(Default)]
pub struct OrchestratorControl {
    /// Set to request a pause after the current step completes.
    pause_requested: AtomicBool,
    /// Set to request cancellation after the current step completes.
    cancel_requested: AtomicBool,
}

impl OrchestratorControl {
    /// Requests that the run pause after the current step finishes.
    pub fn pause(&self) {
        self.pause_requested.store(true, Ordering::SeqCst);
    }

    /// Clears a pending or active pause request, letting the run continue.
    pub fn resume(&self) {
        self.pause_requested.store(false, Ordering::SeqCst);
    }

    /// Requests that the run cancel after the current step finishes.
    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    /// Returns whether a pause is currently requested.
    #[must_use]
    pub fn is_pause_requested(&self) -> bool {
        self.pause_requested.load(Ordering::SeqCst)
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }
}

/// Drives one workflow run end to end.
pub struct WorkflowOrchestrator {
    /// Persists versions, experiments, and rollback history.
    store: EvoStore,
    /// Persists and restores checkpoint payloads.
    checkpoints: CheckpointStore,
    /// Optional sink for lifecycle and step-level events.
    events: Option<EventBusHandle>,
    /// Adapters available for dispatch, keyed by the id steps reference.
    adapters: BTreeMap<AdapterId, Arc<dyn ComponentAdapter>>,
    /// The run's current top-level lifecycle state.
    run_state: RunStateCell,
    /// Shared pause/resume/cancel signalling handle.
    control: Arc<OrchestratorControl>,
}

impl WorkflowOrchestrator {
    /// Builds an orchestrator over `adapters`, keyed by the [`AdapterId`]
    /// each [`WorkflowStep::component_ref`] names.
    #[must_use]
    pub fn new(
        store: EvoStore,
        checkpoints: CheckpointStore,
        events: Option<EventBusHandle>,
        adapters: BTreeMap<AdapterId, Arc<dyn ComponentAdapter>>,
    ) -> Self {
        Self {
            store,
            checkpoints,
            events,
            adapters,
            run_state: RunStateCell::new(),
            control: Arc::new(OrchestratorControl::default()),
        }
    }

    /// Returns a shared handle for pausing, resuming, or cancelling a run in
    /// progress.
    #[must_use]
    pub fn control(&self) -> Arc<OrchestratorControl> {
        Arc::clone(&self.control)
    }

    /// Returns the orchestrator's current run-level state.
    #[must_use]
    pub fn run_state(&self) -> RunState {
        self.run_state.get()
    }

    /// Executes `config` against `working_dir`, returning the final
    /// [`ExecutionContext`] regardless of whether the run completed, failed,
    /// or was cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidGraph`] when `config.steps`
    /// contains a cycle or unknown dependency, detected before any step
    /// runs.
    pub async fn run(
        &self,
        config: WorkflowConfig,
        working_dir: &Path,
        sampler: Box<dyn ResourceSampler>,
        custom_recovery: Option<CustomRecoveryAction>,
    ) -> Result<ExecutionContext, OrchestratorError> {
        self.run_state
            .transition(RunState::Initializing)
            .map_err(|from| OrchestratorError::InvalidTransition(format!("cannot start run from {from:?}")))?;

        let waves = match topological_waves(&config.steps) {
            Ok(waves) => waves,
            Err(err) => {
                let _ = self.run_state.transition(RunState::Failed);
                return Err(err);
            }
        };

        self.run_state
            .transition(RunState::Running)
            .map_err(|from| OrchestratorError::InvalidTransition(format!("{from:?} cannot move to running")))?;

        let mut context =
            ExecutionContext::new(config.workflow_id.clone(), config.experiment_id.clone(), config.iterations);
        let mut monitor =
            ResourceMonitor::new(sampler, config.resource_thresholds.clone(), 64);
        let recovery = RecoveryLadder::new(self.store.clone(), self.checkpoints.clone(), custom_recovery);
        let checkpoint_interval = config.checkpoint_interval.max(1);

        'iterations: for iteration in 1..=config.iterations {
            context.current_iteration = iteration;
            context.current_stage = "running".to_string();
            self.publish(EventTopic::IterationStarted, &context, format!("iteration {iteration} started")).await;

            for wave in &waves {
                if self.control.is_cancel_requested() {
                    self.run_state.transition(RunState::Cancelled).ok();
                    break 'iterations;
                }
                let critical_failure =
                    self.dispatch_wave(wave, &mut context, &config, &recovery, working_dir).await?;
                if let Some(step_id) = critical_failure {
                    self.run_state
                        .transition(RunState::Failed)
                        .map_err(|from| OrchestratorError::InvalidTransition(format!("{from:?} cannot move to failed")))?;
                    return Err(OrchestratorError::CriticalStepFailed {
                        step_id: step_id.to_string(),
                        detail: "critical step exhausted recovery".to_string(),
                    });
                }
                if self.control.is_pause_requested() {
                    self.pause_until_resumed().await?;
                }
                if self.control.is_cancel_requested() {
                    self.run_state.transition(RunState::Cancelled).ok();
                    break 'iterations;
                }
            }

            let alerts = monitor.poll();
            if alerts.iter().any(|alert| alert.level == crate::resource::AlertLevel::Critical) {
                self.checkpoint(&mut context, working_dir, CheckpointKind::Emergency).await?;
                self.publish(EventTopic::ResourceAlert, &context, "critical resource alert".to_string()).await;
                self.pause_until_resumed().await?;
            } else if iteration % checkpoint_interval == 0 {
                self.checkpoint(&mut context, working_dir, CheckpointKind::Automatic).await?;
            }

            self.publish(EventTopic::IterationCompleted, &context, format!("iteration {iteration} completed")).await;
        }

        if self.run_state.get() == RunState::Running {
            self.run_state
                .transition(RunState::Completed)
                .map_err(|from| OrchestratorError::InvalidTransition(format!("{from:?} cannot complete")))?;
        }
        Ok(context)
    }

    /// Dispatches one readiness wave per `config.execution_strategy`: a
    /// `sequential`/`priority` strategy runs each step's own retries one at
    /// a time, while `parallel`/`adaptive` dispatches every step's retries
    /// concurrently via a [`tokio::task::JoinSet`] — recovery itself still
    /// runs one step at a time afterward, since it mutates `context`.
    /// Returns the step id of a critical failure that exhausted recovery,
    /// if any.
    async fn dispatch_wave(
        &self,
        wave: &[WorkflowStep],
        context: &mut ExecutionContext,
        config: &WorkflowConfig,
        recovery: &RecoveryLadder,
        working_dir: &Path,
    ) -> Result<Option<evoseal_core::identifiers::StepId>, OrchestratorError> {
        let run_parallel = matches!(config.execution_strategy, ExecutionStrategy::Parallel)
            || matches!(config.execution_strategy, ExecutionStrategy::Adaptive);

        let outcomes: Vec<(WorkflowStep, Option<Arc<dyn ComponentAdapter>>, StepResult)> = if run_parallel {
            let mut join_set = tokio::task::JoinSet::new();
            for step in wave {
                let adapter = self.adapters.get(&step.component_ref).cloned();
                let step = step.clone();
                let multiplier = config.retry_backoff_multiplier;
                let max_retry_delay = config.max_retry_delay;
                join_set.spawn(async move {
                    let result = match &adapter {
                        Some(adapter) => Self::run_step_with_retries(&step, adapter.as_ref(), multiplier, max_retry_delay).await,
                        None => unresolved_adapter_result(&step),
                    };
                    (step, adapter, result)
                });
            }
            let mut outcomes = Vec::with_capacity(wave.len());
            while let Some(joined) = join_set.join_next().await {
                if let Ok(outcome) = joined {
                    outcomes.push(outcome);
                }
            }
            outcomes.sort_by(|a, b| a.0.step_id.as_str().cmp(b.0.step_id.as_str()));
            outcomes
        } else {
            let mut outcomes = Vec::with_capacity(wave.len());
            for step in wave {
                let adapter = self.adapters.get(&step.component_ref).cloned();
                let result = match &adapter {
                    Some(adapter) => Self::run_step_with_retries(step, adapter.as_ref(), config.retry_backoff_multiplier, config.max_retry_delay).await,
                    None => unresolved_adapter_result(step),
                };
                outcomes.push((step.clone(), adapter, result));
            }
            outcomes
        };

        for (step, adapter, result) in outcomes {
            if let Some(step_id) = self.finish_step(&step, adapter, result, context, config, recovery, working_dir).await? {
                return Ok(Some(step_id));
            }
        }
        Ok(None)
    }

    /// Records a step's outcome on `context`, publishes the matching event,
    /// and — for a failed critical step — drives the recovery ladder.
    async fn finish_step(
        &self,
        step: &WorkflowStep,
        adapter: Option<Arc<dyn ComponentAdapter>>,
        result: StepResult,
        context: &mut ExecutionContext,
        config: &WorkflowConfig,
        recovery: &RecoveryLadder,
        working_dir: &Path,
    ) -> Result<Option<evoseal_core::identifiers::StepId>, OrchestratorError> {
        let succeeded = result.status == StepStatus::Succeeded;
        context.per_step_results.insert(step.step_id.clone(), result);
        if succeeded {
            self.publish(EventTopic::Log, context, format!("step {} succeeded", step.step_id)).await;
            return Ok(None);
        }
        self.publish(EventTopic::Log, context, format!("step {} failed", step.step_id)).await;
        if !step.critical {
            return Ok(None);
        }
        let Some(adapter) = adapter else {
            return Ok(Some(step.step_id.clone()));
        };

        self.run_state
            .transition(RunState::Recovering)
            .map_err(|from| OrchestratorError::InvalidTransition(format!("{from:?} cannot enter recovery")))?;
        let outcome = recovery.run(context, adapter.as_ref(), working_dir).await?;
        if outcome == RecoveryOutcome::Exhausted {
            return Ok(Some(step.step_id.clone()));
        }
        self.run_state
            .transition(RunState::Running)
            .map_err(|from| OrchestratorError::InvalidTransition(format!("{from:?} cannot resume after recovery")))?;
        let retried = Self::run_step_with_retries(step, adapter.as_ref(), config.retry_backoff_multiplier, config.max_retry_delay).await;
        let retried_ok = retried.status == StepStatus::Succeeded;
        context.per_step_results.insert(step.step_id.clone(), retried);
        if retried_ok {
            Ok(None)
        } else {
            Ok(Some(step.step_id.clone()))
        }
    }

    /// Runs `step` via `adapter`, retrying up to `step.retry_count` times
    /// with exponential backoff from `step.retry_delay`. Takes no `&self` so
    /// it can run inside a spawned task alongside sibling steps in the same
    /// wave.
    async fn run_step_with_retries(step: &WorkflowStep, adapter: &dyn ComponentAdapter, backoff_multiplier: f64, max_retry_delay: Duration) -> StepResult {
        let mut result = StepResult::pending(step.step_id.clone());
        result.status = StepStatus::Running;
        result.started_at = Some(evoseal_core::time::Timestamp::now());

        for attempt in 1..=step.retry_count.max(1) {
            result.attempts = attempt;
            let dispatch = tokio::time::timeout(step.timeout, adapter.execute(&step.operation_name, step.params.clone())).await;
            match dispatch {
                Ok(Ok(output)) => {
                    result.status = StepStatus::Succeeded;
                    result.output = Some(output);
                    result.error = None;
                    break;
                }
                Ok(Err(err)) => {
                    result.status = StepStatus::Failed;
                    result.error = Some(err.to_string());
                }
                Err(_elapsed) => {
                    result.status = StepStatus::TimedOut;
                    result.error = Some(format!("step {} exceeded its {:?} timeout", step.step_id, step.timeout));
                }
            }
            if attempt < step.retry_count.max(1) {
                let delay = crate::recovery::backoff_delay(step.retry_delay, backoff_multiplier, attempt, max_retry_delay);
                tokio::time::sleep(delay).await;
            }
        }
        result.ended_at = Some(evoseal_core::time::Timestamp::now());
        result
    }

    /// Takes a checkpoint of `working_dir`'s contents, recording its id on
    /// `context`.
    async fn checkpoint(&self, context: &mut ExecutionContext, working_dir: &Path, kind: CheckpointKind) -> Result<CheckpointId, OrchestratorError> {
        self.run_state
            .transition(RunState::Checkpointing)
            .map_err(|from| OrchestratorError::InvalidTransition(format!("{from:?} cannot checkpoint")))?;
        let version_id = context
            .current_version_id
            .clone()
            .unwrap_or_else(evoseal_core::identifiers::VersionId::generate);
        let payload = read_working_tree(working_dir);
        let checkpoint_id = self.checkpoints.create(&self.store, &version_id, &payload, kind, BTreeMap::new())?;
        context.last_checkpoint_id = Some(checkpoint_id.clone());
        self.publish(EventTopic::CheckpointCreated, context, format!("checkpoint {checkpoint_id} created")).await;
        self.run_state
            .transition(RunState::Running)
            .map_err(|from| OrchestratorError::InvalidTransition(format!("{from:?} cannot resume after checkpoint")))?;
        Ok(checkpoint_id)
    }

    /// Spins while a pause is requested, then transitions back to running.
    async fn pause_until_resumed(&self) -> Result<(), OrchestratorError> {
        self.run_state
            .transition(RunState::Paused)
            .map_err(|from| OrchestratorError::InvalidTransition(format!("{from:?} cannot pause")))?;
        while self.control.is_pause_requested() && !self.control.is_cancel_requested() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        if self.control.is_cancel_requested() {
            return Ok(());
        }
        self.run_state
            .transition(RunState::Running)
            .map_err(|from| OrchestratorError::InvalidTransition(format!("{from:?} cannot resume")))?;
        Ok(())
    }

    /// Publishes `message` under `topic`, tagged with the run's experiment,
    /// when an event bus handle is configured.
    async fn publish(&self, topic: EventTopic, context: &ExecutionContext, message: String) {
        if let Some(events) = &self.events {
            let mut event = Event::new(topic, "orchestrator", message);
            event.experiment_id = Some(context.experiment_id.clone());
            if topic == EventTopic::Log {
                event.level = Some(LogLevel::Info);
            }
            events.publish(event).await;
        }
    }
}

/// Reads every regular file under `root` into an in-memory payload map,
/// keyed by its path relative to `root`.
fn read_working_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut payload = BTreeMap::new();
    let Ok(entries) = std::fs::read_dir(root) else { return payload };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            if let (Ok(bytes), Some(name)) = (std::fs::read(&path), path.file_name()) {
                payload.insert(name.to_string_lossy().into_owned(), bytes);
            }
        }
    }
    payload
}

/// Builds the `skipped` result recorded when a step names an
/// [`AdapterId`](evoseal_core::identifiers::AdapterId) with no registered
/// adapter.
fn unresolved_adapter_result(step: &WorkflowStep) -> StepResult {
    let mut result = StepResult::pending(step.step_id.clone());
    result.status = StepStatus::Skipped;
    result.error = Some(format!("no adapter registered for {}", step.component_ref));
    result
}
