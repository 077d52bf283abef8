// crates/evoseal-dashboard/src/lib.rs
// ============================================================================
// Crate: evoseal-dashboard
// Description: Read-only HTTP + SSE status/metrics/report server.
// Purpose: The C10 component of the evolution-and-training orchestrator.
// ============================================================================

//! ## Overview
//! This crate never computes status/metrics/report itself; callers supply a
//! [`source::DashboardSource`] implementation. What it owns is the HTTP
//! surface (`axum`), the streaming channel (Server-Sent Events over a
//! bounded per-client queue), and CORS — all local-only by default, per the
//! non-public-interface requirement.

pub mod error;
pub mod router;
pub mod server;
pub mod snapshot;
pub mod source;
pub mod stream;

pub use error::DashboardError;
pub use router::build_router;
pub use server::run;
pub use server::DEFAULT_BIND;
pub use server::DEFAULT_UPDATE_INTERVAL;
pub use snapshot::HistoryPoint;
pub use snapshot::MetricsSnapshot;
pub use snapshot::ReportSnapshot;
pub use snapshot::StatusSnapshot;
pub use snapshot::StreamFrame;
pub use source::DashboardSource;
pub use stream::Broadcaster;
