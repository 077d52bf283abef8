// crates/evoseal-adapters/src/evolution_engine.rs
// ============================================================================
// Module: Evolution Engine Adapter
// Description: Adapter wrapping an in-process evolutionary-algorithm engine.
// Purpose: Implement ComponentAdapter for the `advance_generation`,
//          `choose_parents`, `mutate`, `crossover`, `get_fitness`,
//          `get_archive`, `update_archive` operation set.
// Dependencies: async-trait, evoseal-core
// ============================================================================

//! ## Overview
//! The engine itself is never reimplemented here (out of scope per this
//! system's own non-goals); [`EvolutionEngineAdapter`] only wraps a
//! caller-supplied [`EvolutionEngine`] implementation behind the uniform
//! lifecycle and operation-dispatch contract every adapter shares.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::adapter::AdapterStatus;
use crate::adapter::ComponentAdapter;
use crate::error::AdapterError;
use crate::state::AdapterState;
use crate::state::StateCell;

/// The seven operations an evolutionary-algorithm engine exposes.
pub const EVOLUTION_OPERATIONS: [&str; 7] =
    ["advance_generation", "choose_parents", "mutate", "crossover", "get_fitness", "get_archive", "update_archive"];

/// The in-process engine behind [`EvolutionEngineAdapter`], supplied by the
/// caller (never implemented by this crate — the specific evolutionary
/// algorithm is out of this system's scope).
pub trait EvolutionEngine: Send + Sync {
    /// Runs `operation_name` with `args`, returning its JSON result.
    ///
    /// # Errors
    ///
    /// Returns an error description on engine-side failure.
    fn invoke(&self, operation_name: &str, args: &Value) -> Result<Value, String>;

    /// Returns the engine's current numeric metrics (e.g. `best_fitness`,
    /// `generation`, `archive_size`).
    fn metrics(&self) -> BTreeMap<String, f64>;
}

/// Adapter over an in-process [`EvolutionEngine`].
pub struct EvolutionEngineAdapter {
    engine: Box<dyn EvolutionEngine>,
    state: StateCell,
    detail: Mutex<String>,
}

impl EvolutionEngineAdapter {
    /// Wraps `engine` behind the [`ComponentAdapter`] contract.
    #[must_use]
    pub fn new(engine: Box<dyn EvolutionEngine>) -> Self {
        Self { engine, state: StateCell::new(), detail: Mutex::new(String::new()) }
    }

    /// Sets detail text for status reporting.
    fn set_detail(&self, detail: impl Into<String>) {
        let mut guard = self.detail.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = detail.into();
    }
}

#[async_trait]
impl ComponentAdapter for EvolutionEngineAdapter {
    async fn initialize(&self) -> Result<(), AdapterError> {
        self.state
            .transition(AdapterState::Initializing)
            .map_err(|from| AdapterError::InvalidTransition { from, action: "initialize".to_string() })?;
        self.state
            .transition(AdapterState::Ready)
            .map_err(|from| AdapterError::InvalidTransition { from, action: "initialize".to_string() })?;
        Ok(())
    }

    async fn start(&self) -> Result<(), AdapterError> {
        self.state
            .transition(AdapterState::Running)
            .map_err(|from| AdapterError::InvalidTransition { from, action: "start".to_string() })?;
        Ok(())
    }

    async fn pause(&self) -> Result<(), AdapterError> {
        self.state
            .transition(AdapterState::Paused)
            .map_err(|from| AdapterError::InvalidTransition { from, action: "pause".to_string() })?;
        Ok(())
    }

    async fn resume(&self) -> Result<(), AdapterError> {
        self.state
            .transition(AdapterState::Running)
            .map_err(|from| AdapterError::InvalidTransition { from, action: "resume".to_string() })?;
        Ok(())
    }

    async fn stop(&self) -> Result<(), AdapterError> {
        self.state
            .transition(AdapterState::Stopped)
            .map_err(|from| AdapterError::InvalidTransition { from, action: "stop".to_string() })?;
        Ok(())
    }

    async fn execute(&self, operation_name: &str, args: Value) -> Result<Value, AdapterError> {
        if !self.state.get().accepts_operations() {
            return Err(AdapterError::InvalidTransition { from: self.state.get(), action: operation_name.to_string() });
        }
        if !EVOLUTION_OPERATIONS.contains(&operation_name) {
            return Err(AdapterError::UnknownOperation(operation_name.to_string()));
        }
        match self.engine.invoke(operation_name, &args) {
            Ok(result) => Ok(result),
            Err(detail) => {
                self.set_detail(detail.clone());
                self.state.force_error();
                Err(AdapterError::Component(detail))
            }
        }
    }

    fn get_status(&self) -> AdapterStatus {
        AdapterStatus {
            state: self.state.get(),
            detail: self.detail.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone(),
        }
    }

    fn get_metrics(&self) -> BTreeMap<String, f64> {
        self.engine.metrics()
    }
}
