// crates/evoseal-dashboard/src/stream.rs
// ============================================================================
// Module: Streaming Channel
// Description: Per-client bounded queues feeding Server-Sent Events frames,
//              with slow clients dropped on overflow.
// Purpose: Implement spec.md §4.10's streaming channel without WebSockets.
// Dependencies: tokio, tokio-stream
// ============================================================================

//! ## Overview
//! Each connected client gets its own bounded `tokio::sync::mpsc` channel.
//! The broadcaster tries a non-blocking send; a full queue means the client
//! is falling behind, so the frame is dropped for that client and the event
//! is logged rather than the broadcaster blocking on a slow consumer.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::RwLock;

use crate::snapshot::StreamFrame;
use crate::source::DashboardSource;

/// Bound on each client's pending-frame queue.
const CLIENT_QUEUE_CAPACITY: usize = 16;

/// Registry of connected streaming clients and the broadcast loop that feeds
/// them.
pub struct Broadcaster {
    /// Live per-client senders, keyed by an opaque connection id.
    clients: RwLock<Vec<(u64, mpsc::Sender<StreamFrame>)>>,
    /// Monotonic id generator for newly connected clients.
    next_id: AtomicU64,
}

impl Broadcaster {
    /// Builds an empty broadcaster.
    #[must_use]
    pub fn new() -> Self {
        Self { clients: RwLock::new(Vec::new()), next_id: AtomicU64::new(0) }
    }

    /// Returns the number of currently connected clients.
    pub async fn client_count(&self) -> u64 {
        #[expect(clippy::cast_possible_truncation, reason = "a single dashboard process serves far fewer than u32::MAX clients")]
        let count = self.clients.read().await.len() as u64;
        count
    }

    /// Registers a new client, returning its receiver and connection id.
    pub async fn register(&self) -> (u64, mpsc::Receiver<StreamFrame>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(CLIENT_QUEUE_CAPACITY);
        self.clients.write().await.push((id, tx));
        (id, rx)
    }

    /// Registers a new client and enqueues `initial` as its first frame
    /// before any broadcast can race ahead of it.
    pub async fn register_with_initial(&self, initial: StreamFrame) -> (u64, mpsc::Receiver<StreamFrame>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(CLIENT_QUEUE_CAPACITY);
        let _ = tx.try_send(initial);
        self.clients.write().await.push((id, tx));
        (id, rx)
    }

    /// Removes a client once its connection has closed.
    pub async fn unregister(&self, id: u64) {
        self.clients.write().await.retain(|(client_id, _)| *client_id != id);
    }

    /// Sends `frame` to every connected client, dropping it for any client
    /// whose queue is full.
    pub async fn broadcast(&self, frame: StreamFrame) {
        let clients = self.clients.read().await;
        for (_, sender) in clients.iter() {
            if sender.try_send(frame.clone()).is_err() {
                // Queue full or client gone; the frame is simply dropped for
                // this client.
            }
        }
    }

    /// Runs the periodic `metrics_update` loop until `cancel` fires.
    pub async fn run_metrics_updates(
        self: &Arc<Self>,
        source: Arc<dyn DashboardSource>,
        update_interval: Duration,
        mut cancel: tokio::sync::watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                () = tokio::time::sleep(update_interval) => {}
                _ = cancel.changed() => { if *cancel.borrow() { break; } }
            }
            if *cancel.borrow() {
                break;
            }
            let data = source.metrics().await;
            self.broadcast(StreamFrame::MetricsUpdate { data, timestamp: evoseal_core::time::Timestamp::now() }).await;
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
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

    use evoseal_core::time::Timestamp;

    use super::*;
    use crate::snapshot::MetricsSnapshot;
    use crate::snapshot::ReportSnapshot;
    use crate::snapshot::StatusSnapshot;

    struct FixedSource;

    #[async_trait::async_trait]
    impl DashboardSource for FixedSource {
        async fn status(&self) -> StatusSnapshot {
            StatusSnapshot {
                is_running: true,
                start_time: Timestamp::now(),
                uptime_seconds: 0,
                last_evolution_check: None,
                last_training_check: None,
                statistics: BTreeMap::new(),
            }
        }

        async fn metrics(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                evolution_cycles_completed: 0,
                training_cycles_triggered: 0,
                successful_improvements: 0,
                collected_samples: 0,
                model_endpoint_degraded: false,
                connected_clients: 0,
            }
        }

        async fn report(&self) -> ReportSnapshot {
            ReportSnapshot { metrics: self.metrics().await, recent_history: Vec::new(), recommendations: Vec::new() }
        }
    }

    #[tokio::test]
    async fn register_and_broadcast_delivers_to_client() {
        let broadcaster = Broadcaster::new();
        let (_id, mut rx) = broadcaster.register().await;
        assert_eq!(broadcaster.client_count().await, 1);
        broadcaster
            .broadcast(StreamFrame::MetricsUpdate {
                data: FixedSource.metrics().await,
                timestamp: Timestamp::now(),
            })
            .await;
        let frame = rx.recv().await.expect("frame");
        assert!(matches!(frame, StreamFrame::MetricsUpdate { .. }));
    }

    #[tokio::test]
    async fn unregister_removes_client() {
        let broadcaster = Broadcaster::new();
        let (id, _rx) = broadcaster.register().await;
        broadcaster.unregister(id).await;
        assert_eq!(broadcaster.client_count().await, 0);
    }

    #[tokio::test]
    async fn full_queue_drops_frame_without_blocking() {
        let broadcaster = Broadcaster::new();
        let (_id, _rx) = broadcaster.register().await;
        for _ in 0..(CLIENT_QUEUE_CAPACITY + 4) {
            broadcaster
                .broadcast(StreamFrame::MetricsUpdate {
                    data: FixedSource.metrics().await,
                    timestamp: Timestamp::now(),
                })
                .await;
        }
    }
}
