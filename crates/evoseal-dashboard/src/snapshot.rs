// crates/evoseal-dashboard/src/snapshot.rs
// ============================================================================
// Module: Dashboard Snapshots
// Description: The read-only status/metrics/report shapes served over HTTP
//              and pushed over the streaming channel.
// Purpose: Decouple the dashboard's wire format from the service internals
//          it summarizes.
// Dependencies: evoseal-core, serde
// ============================================================================

use std::collections::BTreeMap;

use evoseal_core::time::Timestamp;
use serde::Deserialize;
use serde::Serialize;

/// `GET /api/status` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Whether the continuous evolution service is currently running.
    pub is_running: bool,
    /// When the service started.
    pub start_time: Timestamp,
    /// Seconds elapsed since `start_time`.
    pub uptime_seconds: u64,
    /// When the evolution monitor loop last ran, if ever.
    pub last_evolution_check: Option<Timestamp>,
    /// When the training monitor loop last ran, if ever.
    pub last_training_check: Option<Timestamp>,
    /// Cumulative counters, keyed by name for forward-compatible extension.
    pub statistics: BTreeMap<String, u64>,
}

/// `GET /api/metrics` response body: service, evolution, training, and
/// dashboard-local counters in one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total evolution cycles completed.
    pub evolution_cycles_completed: u64,
    /// Total training cycles triggered.
    pub training_cycles_triggered: u64,
    /// Training cycles that resulted in a deployed model version.
    pub successful_improvements: u64,
    /// Number of evolution samples currently held by the data collector.
    pub collected_samples: u64,
    /// Whether the external model endpoint is currently considered
    /// degraded.
    pub model_endpoint_degraded: bool,
    /// Number of dashboard streaming clients currently connected.
    pub connected_clients: u64,
}

/// One trend point in [`ReportSnapshot::recent_history`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// When this point was recorded.
    pub recorded_at: Timestamp,
    /// The metric label this point measures, e.g. `"evolution_cycles"`.
    pub label: String,
    /// The metric's value at `recorded_at`.
    pub value: f64,
}

/// `GET /api/report` response body: a comprehensive operator-facing report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSnapshot {
    /// The same counters `GET /api/metrics` exposes.
    pub metrics: MetricsSnapshot,
    /// Recent trend points, oldest first.
    pub recent_history: Vec<HistoryPoint>,
    /// Plain-language operator recommendations derived from the current
    /// counters, e.g. suggesting a lower `min_samples_for_training` when no
    /// training cycle has triggered in a long time.
    pub recommendations: Vec<String>,
}

/// One frame pushed over the streaming channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    /// Sent once, immediately after a client connects.
    InitialData {
        /// The status snapshot at connect time.
        data: StatusSnapshot,
        /// When this frame was produced.
        timestamp: Timestamp,
    },
    /// Sent every `update_interval` until the client disconnects.
    MetricsUpdate {
        /// The metrics snapshot at send time.
        data: MetricsSnapshot,
        /// When this frame was produced.
        timestamp: Timestamp,
    },
}
