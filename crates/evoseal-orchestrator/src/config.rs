// crates/evoseal-orchestrator/src/config.rs
// ============================================================================
// Module: Workflow Configuration
// Description: Per-run orchestrator input: the step set, execution
//              strategy, and timing parameters for one workflow run.
// Purpose: Keep run-scoped parameters separate from evoseal-config's
//          process-wide AppConfig, since no other crate reads them.
// Dependencies: evoseal-core
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use evoseal_config::ThresholdPair;
use evoseal_core::identifiers::ExperimentId;
use evoseal_core::identifiers::WorkflowId;
use evoseal_core::model::WorkflowStep;

/// How a readiness wave's steps are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// One step at a time, in priority/id order, regardless of grouping.
    Sequential,
    /// Every ready step in a wave runs concurrently.
    Parallel,
    /// Runs a wave in parallel when resources allow, else sequentially.
    Adaptive,
    /// One step at a time, strictly by descending `priority`.
    Priority,
}

/// The parameters of one workflow run, supplied by the caller.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Identifies this run for event correlation and checkpoint lookups.
    pub workflow_id: WorkflowId,
    /// Owning experiment.
    pub experiment_id: ExperimentId,
    /// Total number of iterations to execute.
    pub iterations: u64,
    /// The step DAG, validated once at `initializing`.
    pub steps: Vec<WorkflowStep>,
    /// How ready waves are dispatched.
    pub execution_strategy: ExecutionStrategy,
    /// Create an automatic checkpoint every `checkpoint_interval` iterations.
    pub checkpoint_interval: u64,
    /// Per-dimension `{warn, critical}` resource thresholds.
    pub resource_thresholds: BTreeMap<String, ThresholdPair>,
    /// Period between resource monitor samples.
    pub monitoring_interval: Duration,
    /// Base delay for a step's own exponential backoff between retries.
    pub retry_backoff_multiplier: f64,
    /// Upper bound on a single retry's backoff delay.
    pub max_retry_delay: Duration,
}
