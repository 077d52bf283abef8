// crates/evoseal-adapters/src/rate_limit.rs
// ============================================================================
// Module: Rate Limiter
// Description: A sliding-window call limiter shared by rate-limited adapter
//              operations.
// Purpose: Give SelfAdaptingLMAdapter (and any other rate-limited adapter)
//          a reusable "at most N calls per window" gate.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! A plain sliding-window counter: each call records its timestamp, and
//! `acquire` rejects once more than `max_calls` timestamps fall within the
//! trailing `window`. This is deliberately simpler than a token bucket —
//! `spec.md` only asks that operations be "rate-limited", not that bursts
//! be smoothed.

use std::collections::VecDeque;
use std::time::Duration;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::error::AdapterError;

/// Limits calls to at most `max_calls` within a trailing `window`.
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Builds a limiter permitting up to `max_calls` within `window`.
    #[must_use]
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self { max_calls, window, calls: Mutex::new(VecDeque::new()) }
    }

    /// Records a call attempt, returning [`AdapterError::RateLimited`] when
    /// the window is already at capacity.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::RateLimited`] when `max_calls` calls have
    /// already been recorded within the trailing `window`.
    pub async fn acquire(&self) -> Result<(), AdapterError> {
        let now = Instant::now();
        let mut calls = self.calls.lock().await;
        while let Some(&front) = calls.front() {
            if now.duration_since(front) > self.window {
                calls.pop_front();
            } else {
                break;
            }
        }
        if calls.len() >= self.max_calls {
            return Err(AdapterError::RateLimited(format!(
                "{} calls already recorded in the trailing {:?}",
                calls.len(),
                self.window
            )));
        }
        calls.push_back(now);
        Ok(())
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
    use super::*;

    #[tokio::test]
    async fn allows_up_to_max_calls_then_rejects() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.acquire().await.is_ok());
        assert!(limiter.acquire().await.is_ok());
        assert!(limiter.acquire().await.is_err());
    }

    #[tokio::test]
    async fn expired_calls_free_up_capacity() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.acquire().await.is_ok());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.acquire().await.is_ok());
    }
}
