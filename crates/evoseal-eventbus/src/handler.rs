// crates/evoseal-eventbus/src/handler.rs
// ============================================================================
// Module: Event Bus Handler
// Description: The trait subscribers implement to receive dispatched events.
// Purpose: Allow both lightweight sync-style and suspending async handlers.
// Dependencies: async-trait, evoseal-core
// ============================================================================

//! ## Overview
//! Handlers run in publish order, highest priority first, and may request
//! [`DispatchControl::StopPropagation`] to suppress remaining handlers for
//! the same event. A handler that returns `Err` never aborts dispatch; the
//! bus isolates the failure and continues to the next handler.

// ============================================================================
// SECTION: Imports
// ============================================================================

use evoseal_core::model::Event;

// ============================================================================
// SECTION: Dispatch Control
// ============================================================================

/// Signals whether remaining handlers should still run for the current
/// event.
///
/// # Invariants
/// - Only meaningful within a single [`crate::bus::EventBusHandle::publish`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchControl {
    /// Continue dispatching to remaining handlers.
    Continue,
    /// Suppress any handlers still pending for this event.
    StopPropagation,
}

/// Error returned by a handler while processing an event.
///
/// Captured by the bus and recorded as a `handler_error` topic event rather
/// than propagated to the publisher.
#[derive(Debug, Clone, thiserror::Error)]
#[error("handler failed: {0}")]
pub struct HandlerError(pub String);

// ============================================================================
// SECTION: Handler Trait
// ============================================================================

/// Implemented by every event bus subscriber.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    /// Processes a single dispatched event.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when processing fails; the bus isolates the
    /// failure and continues dispatch to other handlers.
    async fn handle(&self, event: &Event) -> Result<DispatchControl, HandlerError>;
}

/// Adapts any `Fn(&Event) -> Result<DispatchControl, HandlerError>` closure
/// into an [`EventHandler`], for subscribers that never need to `.await`.
pub struct SyncHandler<F>(pub F)
where
    F: Fn(&Event) -> Result<DispatchControl, HandlerError> + Send + Sync;

#[async_trait::async_trait]
impl<F> EventHandler for SyncHandler<F>
where
    F: Fn(&Event) -> Result<DispatchControl, HandlerError> + Send + Sync,
{
    async fn handle(&self, event: &Event) -> Result<DispatchControl, HandlerError> {
        (self.0)(event)
    }
}
