// crates/evoseal-adapters/src/self_adapting_lm.rs
// ============================================================================
// Module: Self-Adapting Language Model Adapter
// Description: Adapter wrapping a remote self-adapting language model
//              service, with per-operation rate limiting.
// Purpose: Implement ComponentAdapter for the `submit_prompt`,
//          `batch_submit`, `analyze_code`, `generate_code`, `improve_code`,
//          `review_code` operation set.
// Dependencies: async-trait, evoseal-core
// ============================================================================

//! ## Overview
//! Every operation is dispatched through [`RemoteJobClient`] and gated by a
//! shared [`RateLimiter`] — this engine kind is always remote, unlike
//! [`crate::program_optimizer::ProgramOptimizerAdapter`], which also
//! supports an in-process mode.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::adapter::AdapterStatus;
use crate::adapter::ComponentAdapter;
use crate::error::AdapterError;
use crate::rate_limit::RateLimiter;
use crate::remote::RemoteJobClient;
use crate::state::AdapterState;
use crate::state::StateCell;

/// The six operations a self-adapting language model service exposes.
pub const LM_OPERATIONS: [&str; 6] =
    ["submit_prompt", "batch_submit", "analyze_code", "generate_code", "improve_code", "review_code"];

/// Adapter over a remote self-adapting language model service.
pub struct SelfAdaptingLMAdapter {
    client: RemoteJobClient,
    limiter: RateLimiter,
    state: StateCell,
    detail: Mutex<String>,
    last_metrics: Mutex<BTreeMap<String, f64>>,
}

impl SelfAdaptingLMAdapter {
    /// Wraps `client` behind the [`ComponentAdapter`] contract, limiting
    /// calls to `max_calls` per `window`.
    #[must_use]
    pub fn new(client: RemoteJobClient, limiter: RateLimiter) -> Self {
        Self {
            client,
            limiter,
            state: StateCell::new(),
            detail: Mutex::new(String::new()),
            last_metrics: Mutex::new(BTreeMap::new()),
        }
    }

    fn set_detail(&self, detail: impl Into<String>) {
        let mut guard = self.detail.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = detail.into();
    }

    fn record_metric(&self, name: &str, value: f64) {
        let mut guard = self.last_metrics.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.insert(name.to_string(), value);
    }
}

#[async_trait]
impl ComponentAdapter for SelfAdaptingLMAdapter {
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
        if !LM_OPERATIONS.contains(&operation_name) {
            return Err(AdapterError::UnknownOperation(operation_name.to_string()));
        }
        self.limiter.acquire().await?;
        match self.client.run_job(operation_name, &args).await {
            Ok(result) => {
                self.record_metric("last_call_succeeded", 1.0);
                Ok(result)
            }
            Err(err) => {
                self.record_metric("last_call_succeeded", 0.0);
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
        self.last_metrics.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
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
    use std::time::Duration;

    use super::*;
    use crate::remote::RemoteClientConfig;

    fn adapter() -> SelfAdaptingLMAdapter {
        let client = RemoteJobClient::new(RemoteClientConfig::default()).expect("client");
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        SelfAdaptingLMAdapter::new(client, limiter)
    }

    #[tokio::test]
    async fn unknown_operation_is_rejected_before_rate_limit_is_consumed() {
        let adapter = adapter();
        adapter.initialize().await.expect("init");
        adapter.start().await.expect("start");
        let result = adapter.execute("not_a_real_op", Value::Null).await;
        assert!(matches!(result, Err(AdapterError::UnknownOperation(_))));
        // the rate limiter must still have capacity since the bad call never reached it
        assert!(adapter.limiter.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn execute_before_start_is_rejected() {
        let adapter = adapter();
        adapter.initialize().await.expect("init");
        let result = adapter.execute("submit_prompt", Value::Null).await;
        assert!(matches!(result, Err(AdapterError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn rate_limit_is_enforced_across_calls() {
        let adapter = adapter();
        adapter.initialize().await.expect("init");
        adapter.start().await.expect("start");
        // first call consumes the only slot and then fails on the network
        // (no server is actually listening), which is still the path that
        // should exhaust the limiter before the network error surfaces.
        let _ = adapter.execute("submit_prompt", Value::Null).await;
        let result = adapter.execute("submit_prompt", Value::Null).await;
        assert!(matches!(result, Err(AdapterError::RateLimited(_))));
    }
}
