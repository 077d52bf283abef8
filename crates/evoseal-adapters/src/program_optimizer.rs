// crates/evoseal-adapters/src/program_optimizer.rs
// ============================================================================
// Module: Program Optimizer Adapter
// Description: Adapter wrapping a program-optimization engine, callable
//              either in-process (package mode) or over HTTP (remote mode).
// Purpose: Implement ComponentAdapter for the `evolve`, `optimize`,
//          `evaluate`, `mutate`, `crossover`, `validate` operation set.
// Dependencies: async-trait, evoseal-core
// ============================================================================

//! ## Overview
//! `package` mode wraps an in-process [`EvolutionEngine`]-shaped callback
//! (renamed locally to avoid confusion with `evolution_engine`'s own
//! trait); `remote` mode drives [`crate::remote::RemoteJobClient`]'s
//! submit/poll/result protocol. Both modes share the same state machine
//! and operation validation.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::adapter::AdapterStatus;
use crate::adapter::ComponentAdapter;
use crate::error::AdapterError;
use crate::remote::RemoteJobClient;
use crate::state::AdapterState;
use crate::state::StateCell;

/// The six operations a program optimizer exposes.
pub const OPTIMIZER_OPERATIONS: [&str; 6] = ["evolve", "optimize", "evaluate", "mutate", "crossover", "validate"];

/// The in-process engine behind `package` mode.
pub trait PackageOptimizer: Send + Sync {
    /// Runs `operation_name` with `args`, returning its JSON result.
    ///
    /// # Errors
    ///
    /// Returns an error description on engine-side failure.
    fn invoke(&self, operation_name: &str, args: &Value) -> Result<Value, String>;

    /// Returns the engine's current numeric metrics.
    fn metrics(&self) -> BTreeMap<String, f64>;
}

/// Which backend a [`ProgramOptimizerAdapter`] dispatches operations to.
pub enum OptimizerMode {
    /// In-process call via a caller-supplied [`PackageOptimizer`].
    Package(Box<dyn PackageOptimizer>),
    /// HTTP job submit/poll/result via [`RemoteJobClient`].
    Remote(RemoteJobClient),
}

/// Adapter over a program-optimization engine.
pub struct ProgramOptimizerAdapter {
    mode: OptimizerMode,
    state: StateCell,
    detail: Mutex<String>,
    last_metrics: Mutex<BTreeMap<String, f64>>,
}

impl ProgramOptimizerAdapter {
    /// Builds an adapter in `package` mode.
    #[must_use]
    pub fn package(engine: Box<dyn PackageOptimizer>) -> Self {
        Self {
            mode: OptimizerMode::Package(engine),
            state: StateCell::new(),
            detail: Mutex::new(String::new()),
            last_metrics: Mutex::new(BTreeMap::new()),
        }
    }

    /// Builds an adapter in `remote` mode.
    #[must_use]
    pub fn remote(client: RemoteJobClient) -> Self {
        Self {
            mode: OptimizerMode::Remote(client),
            state: StateCell::new(),
            detail: Mutex::new(String::new()),
            last_metrics: Mutex::new(BTreeMap::new()),
        }
    }

    fn set_detail(&self, detail: impl Into<String>) {
        let mut guard = self.detail.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = detail.into();
    }
}

#[async_trait]
impl ComponentAdapter for ProgramOptimizerAdapter {
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
        if !OPTIMIZER_OPERATIONS.contains(&operation_name) {
            return Err(AdapterError::UnknownOperation(operation_name.to_string()));
        }
        let result = match &self.mode {
            OptimizerMode::Package(engine) => engine.invoke(operation_name, &args).map_err(AdapterError::Component),
            OptimizerMode::Remote(client) => client.run_job(operation_name, &args).await,
        };
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                self.set_detail(err.to_string());
                if matches!(err, AdapterError::Component(_)) {
                    self.state.force_error();
                }
                Err(err)
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
        match &self.mode {
            OptimizerMode::Package(engine) => engine.metrics(),
            OptimizerMode::Remote(_) => self.last_metrics.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone(),
        }
    }
}
