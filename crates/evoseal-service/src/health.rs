// crates/evoseal-service/src/health.rs
// ============================================================================
// Module: Health Monitor
// Description: Periodic liveness probe of the external model endpoint.
// Purpose: Track a degraded flag the health loop publishes on the bus.
// Dependencies: async-trait, std
// ============================================================================

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use async_trait::async_trait;

use crate::error::ServiceError;

/// Probes the external model endpoint's liveness; supplied by the caller so
/// this crate never hardcodes a transport.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Returns `Ok(())` when the endpoint is healthy.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unhealthy`] when the probe fails.
    async fn check(&self) -> Result<(), ServiceError>;
}

/// Tracks whether the external model endpoint is currently degraded.
pub struct HealthState {
    /// `true` once a probe has failed and no subsequent probe has cleared it.
    degraded: AtomicBool,
}

impl HealthState {
    /// Builds a state starting as healthy.
    #[must_use]
    pub const fn new() -> Self {
        Self { degraded: AtomicBool::new(false) }
    }

    /// Runs `probe` once, updating and returning the degraded flag.
    pub async fn poll(&self, probe: &dyn HealthProbe) -> bool {
        let degraded = probe.check().await.is_err();
        self.degraded.store(degraded, Ordering::SeqCst);
        degraded
    }

    /// Returns the current degraded flag without probing.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}
