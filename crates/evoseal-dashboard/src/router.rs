// crates/evoseal-dashboard/src/router.rs
// ============================================================================
// Module: HTTP Router
// Description: axum routes for status/metrics/report, the static landing
//              page, and the SSE streaming channel.
// Purpose: Wire spec.md §4.10's read-only HTTP surface.
// Dependencies: axum, tokio-stream, tower-http
// ============================================================================

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::Event as SseEvent;
use axum::response::sse::Sse;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;

use crate::snapshot::StreamFrame;
use crate::source::DashboardSource;
use crate::stream::Broadcaster;

/// Shared state visible to every handler.
struct DashboardState {
    /// Supplies status/metrics/report snapshots.
    source: Arc<dyn DashboardSource>,
    /// Registry of connected streaming clients.
    broadcaster: Arc<Broadcaster>,
}

const LANDING_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>EVOSEAL Dashboard</title></head>
<body>
<h1>EVOSEAL</h1>
<pre id="status">connecting…</pre>
<script>
const out = document.getElementById("status");
const source = new EventSource("/api/stream");
source.onmessage = (event) => { out.textContent = event.data; };
</script>
</body>
</html>
"#;

/// Builds the dashboard's axum router over `source`, serving frames to
/// streaming clients via `broadcaster`.
#[must_use]
pub fn build_router(source: Arc<dyn DashboardSource>, broadcaster: Arc<Broadcaster>) -> Router {
    let state = Arc::new(DashboardState { source, broadcaster });
    Router::new()
        .route("/", get(landing_page))
        .route("/api/status", get(get_status))
        .route("/api/metrics", get(get_metrics))
        .route("/api/report", get(get_report))
        .route("/api/stream", get(stream_updates))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn landing_page() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

async fn get_status(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    Json(state.source.status().await)
}

async fn get_metrics(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    Json(state.source.metrics().await)
}

async fn get_report(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    Json(state.source.report().await)
}

/// Serves the streaming channel: one `initial_data` frame immediately,
/// then whatever the broadcaster sends until the client disconnects.
async fn stream_updates(State(state): State<Arc<DashboardState>>) -> Sse<ReceiverStream<Result<SseEvent, Infallible>>> {
    let status = state.source.status().await;
    let initial = StreamFrame::InitialData { data: status, timestamp: evoseal_core::time::Timestamp::now() };
    let (id, mut frames) = state.broadcaster.register_with_initial(initial).await;
    let broadcaster = Arc::clone(&state.broadcaster);

    let (tx, rx) = mpsc::channel::<Result<SseEvent, Infallible>>(1);
    tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            let payload = serde_json::to_string(&frame).unwrap_or_else(|_| "{}".to_string());
            if tx.send(Ok(SseEvent::default().data(payload))).await.is_err() {
                break;
            }
        }
        broadcaster.unregister(id).await;
    });
    Sse::new(ReceiverStream::new(rx)).keep_alive(axum::response::sse::KeepAlive::default())
}
