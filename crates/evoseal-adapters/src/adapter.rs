// crates/evoseal-adapters/src/adapter.rs
// ============================================================================
// Module: Component Adapter Contract
// Description: The polymorphic trait every external engine is wrapped in.
// Purpose: Let the orchestrator (C8) drive any engine-kind adapter through
//          one capability set, without caring which engine is behind it.
// Dependencies: async-trait, evoseal-core
// ============================================================================

//! ## Overview
//! [`ComponentAdapter`] is object-safe: the orchestrator holds
//! `Box<dyn ComponentAdapter>` per workflow step and never needs to know
//! which concrete adapter (`EvolutionEngineAdapter`,
//! `ProgramOptimizerAdapter`, `SelfAdaptingLMAdapter`) it is driving.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AdapterError;
use crate::state::AdapterState;

/// A snapshot of an adapter's reported status.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterStatus {
    /// Current lifecycle state.
    pub state: AdapterState,
    /// Adapter-specific human-readable detail.
    pub detail: String,
}

/// The capability set every external engine adapter implements.
///
/// # Invariants
/// - `execute` is only valid while [`AdapterState::accepts_operations`]
///   holds for the adapter's current state; implementations return
///   [`AdapterError::InvalidTransition`] otherwise rather than silently
///   no-opping.
#[async_trait]
pub trait ComponentAdapter: Send + Sync {
    /// Moves the adapter from `uninitialized` to `ready`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidTransition`] when called outside
    /// `uninitialized`, or [`AdapterError::Component`] when the underlying
    /// engine fails to initialize.
    async fn initialize(&self) -> Result<(), AdapterError>;

    /// Moves the adapter from `ready` (or `paused`) to `running`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidTransition`] when called outside
    /// `ready`/`paused`.
    async fn start(&self) -> Result<(), AdapterError>;

    /// Moves the adapter from `running` to `paused`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidTransition`] when called outside
    /// `running`.
    async fn pause(&self) -> Result<(), AdapterError>;

    /// Moves the adapter from `paused` back to `running`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidTransition`] when called outside
    /// `paused`.
    async fn resume(&self) -> Result<(), AdapterError>;

    /// Moves the adapter to `stopped` from any non-terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidTransition`] when already `stopped`.
    async fn stop(&self) -> Result<(), AdapterError>;

    /// Executes `operation_name` with `args`, returning the engine's raw
    /// JSON result.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidTransition`] when not `running`,
    /// [`AdapterError::UnknownOperation`] when `operation_name` is not
    /// recognized, or [`AdapterError::Component`]/[`AdapterError::Network`]
    /// when the underlying engine call fails.
    async fn execute(&self, operation_name: &str, args: Value) -> Result<Value, AdapterError>;

    /// Returns the adapter's current status.
    fn get_status(&self) -> AdapterStatus;

    /// Returns the adapter's last-reported numeric metrics.
    fn get_metrics(&self) -> BTreeMap<String, f64>;
}
