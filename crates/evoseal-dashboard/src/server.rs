// crates/evoseal-dashboard/src/server.rs
// ============================================================================
// Module: Dashboard Server
// Description: Binds and serves the dashboard's axum router, and drives the
//              periodic metrics_update broadcast loop.
// Purpose: Tie router construction to a concrete listening socket.
// Dependencies: axum, tokio
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::DashboardError;
use crate::router::build_router;
use crate::source::DashboardSource;
use crate::stream::Broadcaster;

/// Bind address the dashboard listens on by default — loopback only, per
/// the non-public-interface requirement.
pub const DEFAULT_BIND: &str = "127.0.0.1:8787";

/// Default period between `metrics_update` frames.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(30);

/// Runs the dashboard server until `cancel` fires.
///
/// # Errors
///
/// Returns [`DashboardError::InvalidBindAddress`] when `bind` does not
/// parse, [`DashboardError::Bind`] when the socket cannot be acquired, and
/// [`DashboardError::Serve`] if the listener loop itself fails.
pub async fn run(
    bind: &str,
    update_interval: Duration,
    source: Arc<dyn DashboardSource>,
    cancel: watch::Receiver<bool>,
) -> Result<(), DashboardError> {
    let addr: SocketAddr = bind.parse().map_err(|_| DashboardError::InvalidBindAddress(bind.to_string()))?;
    let broadcaster = Arc::new(Broadcaster::new());
    let app = build_router(Arc::clone(&source), Arc::clone(&broadcaster));

    let broadcast_loop = {
        let broadcaster = Arc::clone(&broadcaster);
        let cancel = cancel.clone();
        tokio::spawn(async move { broadcaster.run_metrics_updates(source, update_interval, cancel).await })
    };

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|err| DashboardError::Bind(err.to_string()))?;
    let mut shutdown = cancel;
    let serve_result = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await;
    let _ = broadcast_loop.await;
    serve_result.map_err(|err| DashboardError::Serve(err.to_string()))
}
