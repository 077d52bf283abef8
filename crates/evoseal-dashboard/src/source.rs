// crates/evoseal-dashboard/src/source.rs
// ============================================================================
// Module: Dashboard Source
// Description: The seam through which the dashboard learns current service
//              state, decoupling it from any one service wiring.
// Purpose: Let the HTTP layer stay ignorant of how status/metrics/report are
//          actually computed.
// Dependencies: async-trait
// ============================================================================

use async_trait::async_trait;

use crate::snapshot::MetricsSnapshot;
use crate::snapshot::ReportSnapshot;
use crate::snapshot::StatusSnapshot;

/// Supplies the three read-only snapshots the dashboard serves; supplied by
/// the caller so this crate never depends on a single concrete service
/// wiring.
#[async_trait]
pub trait DashboardSource: Send + Sync {
    /// Builds the current `GET /api/status` snapshot.
    async fn status(&self) -> StatusSnapshot;

    /// Builds the current `GET /api/metrics` snapshot.
    async fn metrics(&self) -> MetricsSnapshot;

    /// Builds the current `GET /api/report` snapshot.
    async fn report(&self) -> ReportSnapshot;
}
