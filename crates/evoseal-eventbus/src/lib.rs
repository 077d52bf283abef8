// crates/evoseal-eventbus/src/lib.rs
// ============================================================================
// Crate: evoseal-eventbus
// Description: Process-wide publish/subscribe event bus and logging substrate.
// Purpose: Give every EVOSEAL component a single integration point instead
//          of direct cross-component calls, and double as the structured
//          logging backend.
// ============================================================================

//! # evoseal-eventbus
//!
//! The event bus ([`EventBusHandle`]) is the one integration surface every
//! component in this workspace talks through. Components publish
//! [`evoseal_core::model::Event`] values; subscribers register an
//! [`EventHandler`] for a set of topics (or all topics) at a priority.
//! [`StderrEventSink`] is the default logging backend, rendering
//! [`evoseal_core::model::EventTopic::Log`] events as single lines.

pub mod bus;
pub mod handler;
pub mod sink;

pub use bus::DEFAULT_HISTORY_CAPACITY;
pub use bus::EventBusHandle;
pub use handler::DispatchControl;
pub use handler::EventHandler;
pub use handler::HandlerError;
pub use handler::SyncHandler;
pub use sink::StderrEventSink;
