// crates/evoseal-adapters/src/state.rs
// ============================================================================
// Module: Adapter State Machine
// Description: The uninitialized -> ... -> stopped|error lifecycle shared by
//              every component adapter.
// Purpose: Centralize transition validity so each adapter only implements
//          its own operation dispatch, not lifecycle bookkeeping.
// Dependencies: none
// ============================================================================

//! ## Overview
//! `uninitialized -> initializing -> ready -> running <-> paused -> stopped`,
//! with `error` reachable from any state once an internal failure occurs.
//! Transitions are driven only by explicit calls; nothing in this module
//! calls back into an adapter, so it can be unit-tested in isolation.

use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;

/// The lifecycle state of a [`crate::adapter::ComponentAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterState {
    /// Constructed but not yet initialized.
    Uninitialized,
    /// `initialize` is in progress.
    Initializing,
    /// Initialized and able to `start`.
    Ready,
    /// Actively executing operations.
    Running,
    /// Temporarily suspended via `pause`.
    Paused,
    /// Cleanly shut down via `stop`.
    Stopped,
    /// An internal failure occurred; only `stop` is permitted from here.
    Error,
}

impl AdapterState {
    /// Returns whether `next` is a legal transition from `self`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Uninitialized, Self::Initializing)
                | (Self::Initializing, Self::Ready | Self::Error)
                | (Self::Ready, Self::Running | Self::Error | Self::Stopped)
                | (Self::Running, Self::Paused | Self::Error | Self::Stopped)
                | (Self::Paused, Self::Running | Self::Error | Self::Stopped)
                | (Self::Error, Self::Stopped)
        )
    }

    /// Returns whether `execute` may be called while in this state.
    #[must_use]
    pub const fn accepts_operations(self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Thread-safe holder for an adapter's current state, with transition
/// validation.
#[derive(Debug)]
pub struct StateCell {
    state: Mutex<AdapterState>,
}

impl StateCell {
    /// Creates a cell starting in [`AdapterState::Uninitialized`].
    #[must_use]
    pub const fn new() -> Self {
        Self { state: Mutex::new(AdapterState::Uninitialized) }
    }

    /// Returns the current state.
    #[must_use]
    pub fn get(&self) -> AdapterState {
        *self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Attempts to move to `next`, returning the prior state on success or
    /// `Err(current)` when the transition is not legal.
    pub fn transition(&self, next: AdapterState) -> Result<AdapterState, AdapterState> {
        let mut guard = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if guard.can_transition_to(next) {
            let prior = *guard;
            *guard = next;
            Ok(prior)
        } else {
            Err(*guard)
        }
    }

    /// Forces the state to [`AdapterState::Error`], valid from any state;
    /// used when an internal failure is detected mid-operation.
    pub fn force_error(&self) {
        let mut guard = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = AdapterState::Error;
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
