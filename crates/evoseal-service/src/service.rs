// crates/evoseal-service/src/service.rs
// ============================================================================
// Module: Continuous Evolution Service
// Description: The outer coordinator — evolution monitor, training monitor,
//              and health loops, cumulative statistics, and cancellation.
// Purpose: C9's top-level driver, the outermost loop in the system.
// Dependencies: evoseal-config, evoseal-core, evoseal-eventbus, tokio
// ============================================================================

//! ## Overview
//! Each loop is its own Tokio task, honoring a shared `tokio::sync::watch<bool>`
//! cancellation signal checked at every loop boundary, per `spec.md` §5's
//! cooperative-cancellation model. [`IterationFeed`] is the seam through
//! which the evolution loop learns about newly completed workflow
//! iterations — supplied by the caller, since wiring to a specific running
//! [`evoseal_orchestrator::WorkflowOrchestrator`] instance is an integration
//! concern, not part of this crate's own algorithm.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use evoseal_config::EvolutionConfig;
use evoseal_core::model::Event;
use evoseal_core::model::EventTopic;
use evoseal_core::time::Timestamp;
use evoseal_eventbus::EventBusHandle;
use tokio::sync::watch;
use tokio::sync::Mutex;

use crate::data_collector::EvolutionDataCollector;
use crate::health::HealthProbe;
use crate::health::HealthState;
use crate::model::EvolutionSample;
use crate::training::ModelTrainer;
use crate::training::TrainingDecision;
use crate::training::TrainingGuard;

/// Per-category hard floor applied alongside `min_quality_for_deploy`.
const VALIDATION_HARD_FLOOR: f64 = 0.3;

/// Supplies newly completed workflow iterations to the evolution loop.
#[async_trait]
pub trait IterationFeed: Send + Sync {
    /// Returns every iteration completed since the previous call, already
    /// reduced to the `(prompt_context, generated_code, evaluation_score,
    /// pattern_tags)` shape the data collector stores.
    async fn poll_new_iterations(&self) -> Vec<EvolutionSample>;
}

/// Cumulative counters published alongside dashboard status.
#[derive(Debug, Default)]
pub struct ServiceStats {
    /// Total evolution cycles completed.
    pub evolution_cycles_completed: AtomicU64,
    /// Total training cycles triggered.
    pub training_cycles_triggered: AtomicU64,
    /// Training cycles that resulted in a deployed model version.
    pub successful_improvements: AtomicU64,
}

/// The continuous evolution service's outer coordinator.
pub struct ContinuousEvolutionService {
    config: EvolutionConfig,
    feed: Arc<dyn IterationFeed>,
    collector: Arc<EvolutionDataCollector>,
    trainer: Arc<dyn ModelTrainer>,
    health_probe: Arc<dyn HealthProbe>,
    events: Option<EventBusHandle>,
    stats: Arc<ServiceStats>,
    health: Arc<HealthState>,
    guard: Arc<TrainingGuard>,
    current_model: Arc<Mutex<Option<crate::model::ModelVersion>>>,
}

impl ContinuousEvolutionService {
    /// Builds a service over its injected collaborators.
    #[must_use]
    pub fn new(
        config: EvolutionConfig,
        feed: Arc<dyn IterationFeed>,
        trainer: Arc<dyn ModelTrainer>,
        health_probe: Arc<dyn HealthProbe>,
        events: Option<EventBusHandle>,
    ) -> Self {
        Self {
            config,
            feed,
            collector: Arc::new(EvolutionDataCollector::new()),
            trainer,
            health_probe,
            events,
            stats: Arc::new(ServiceStats::default()),
            health: Arc::new(HealthState::new()),
            guard: Arc::new(TrainingGuard::new()),
            current_model: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the shared statistics counters.
    #[must_use]
    pub fn stats(&self) -> Arc<ServiceStats> {
        Arc::clone(&self.stats)
    }

    /// Returns the shared health state.
    #[must_use]
    pub fn health(&self) -> Arc<HealthState> {
        Arc::clone(&self.health)
    }

    /// Returns the data collector, e.g. for a dashboard snapshot.
    #[must_use]
    pub fn collector(&self) -> Arc<EvolutionDataCollector> {
        Arc::clone(&self.collector)
    }

    /// Runs every loop until `cancel` is set, returning once all three have
    /// drained.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        let evolution = self.run_evolution_loop(cancel.clone());
        let training = self.run_training_loop(cancel.clone());
        let health = self.run_health_loop(cancel.clone());
        tokio::join!(evolution, training, health);
        let _ = cancel.changed().await;
    }

    /// Every `evolution_interval_secs`, pulls new completed iterations and
    /// appends them to the collector.
    async fn run_evolution_loop(&self, mut cancel: watch::Receiver<bool>) {
        let period = Duration::from_secs(self.config.evolution_interval_secs);
        loop {
            tokio::select! {
                () = tokio::time::sleep(period) => {}
                _ = cancel.changed() => { if *cancel.borrow() { break; } }
            }
            if *cancel.borrow() {
                break;
            }
            let samples = self.feed.poll_new_iterations().await;
            if samples.is_empty() {
                continue;
            }
            for sample in samples {
                self.collector.record(sample).await;
            }
            self.stats.evolution_cycles_completed.fetch_add(1, Ordering::SeqCst);
            self.publish(EventTopic::Log, "evolution cycle completed".to_string()).await;
        }
    }

    /// Every `training_interval_secs`, checks readiness and runs at most one
    /// training cycle.
    async fn run_training_loop(&self, mut cancel: watch::Receiver<bool>) {
        let period = Duration::from_secs(self.config.training_interval_secs);
        loop {
            tokio::select! {
                () = tokio::time::sleep(period) => {}
                _ = cancel.changed() => { if *cancel.borrow() { break; } }
            }
            if *cancel.borrow() {
                break;
            }
            let ready = self
                .collector
                .ready_for_training(self.config.min_samples_for_training, self.config.min_successful_ratio, 0.5)
                .await;
            if !ready {
                continue;
            }
            self.run_training_cycle().await;
        }
    }

    /// Runs a single training cycle over the collector's recent patterns.
    async fn run_training_cycle(&self) {
        #[expect(clippy::cast_possible_truncation, reason = "min_samples_for_training is an operator-configured small integer")]
        let dataset = self.collector.recent_patterns(self.config.min_samples_for_training as usize).await;
        self.stats.training_cycles_triggered.fetch_add(1, Ordering::SeqCst);
        let Ok(decision) = self
            .guard
            .run_cycle(self.trainer.as_ref(), &dataset, self.config.min_quality_for_deploy, VALIDATION_HARD_FLOOR)
            .await
        else {
            return;
        };
        match decision {
            TrainingDecision::Deployed(version) => {
                *self.current_model.lock().await = Some(version);
                self.stats.successful_improvements.fetch_add(1, Ordering::SeqCst);
                self.publish(EventTopic::TrainingGateEvaluated, "candidate model deployed".to_string()).await;
            }
            TrainingDecision::RolledBack { .. } => {
                self.publish(EventTopic::TrainingGateEvaluated, "candidate model rolled back".to_string()).await;
            }
        }
    }

    /// Periodic liveness probe of the external model endpoint.
    async fn run_health_loop(&self, mut cancel: watch::Receiver<bool>) {
        let period = Duration::from_secs(10);
        loop {
            tokio::select! {
                () = tokio::time::sleep(period) => {}
                _ = cancel.changed() => { if *cancel.borrow() { break; } }
            }
            if *cancel.borrow() {
                break;
            }
            let degraded = self.health.poll(self.health_probe.as_ref()).await;
            if degraded {
                self.publish(EventTopic::Log, "model endpoint degraded".to_string()).await;
            }
        }
    }

    async fn publish(&self, topic: EventTopic, message: String) {
        if let Some(events) = &self.events {
            let event = if topic == EventTopic::Log {
                Event::log(evoseal_core::model::LogLevel::Info, "evolution-service", message)
            } else {
                Event::new(topic, "evolution-service", message)
            };
            events.publish(event).await;
        }
    }
}
