// crates/evoseal-core/src/model/event.rs
// ============================================================================
// Module: Event
// Description: The envelope published on the event bus by every component.
// Purpose: Canonical Event shape for C1's subscribe/publish contract.
// Dependencies: crate::identifiers, crate::time, serde
// ============================================================================

//! ## Overview
//! Every component publishes [`Event`] values rather than calling each other
//! directly; the event bus is both the integration point between components
//! and the structured-logging substrate (see `evoseal-eventbus`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::ExperimentId;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Event Type
// ============================================================================

/// The category of an [`Event`], used for subscription filtering.
///
/// # Invariants
/// - New variants may be added; subscribers must not assume exhaustiveness
///   and should treat unrecognized topics conservatively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTopic {
    /// A workflow iteration started.
    IterationStarted,
    /// A workflow iteration finished, successfully or not.
    IterationCompleted,
    /// A new version was recorded.
    VersionCreated,
    /// A checkpoint was created.
    CheckpointCreated,
    /// The regression detector flagged a version.
    RegressionDetected,
    /// A rollback was attempted.
    RollbackAttempted,
    /// A rollback completed, successfully or not.
    RollbackCompleted,
    /// A component adapter changed state.
    ComponentStateChanged,
    /// A handler raised an error while processing a prior event.
    HandlerError,
    /// A resource threshold was crossed.
    ResourceAlert,
    /// A training run's gating conditions were evaluated.
    TrainingGateEvaluated,
    /// Emitted at fixed severities for human-facing log consumption.
    Log,
}

/// Severity attached to [`EventTopic::Log`] events, mirroring conventional
/// log levels without pulling in a logging crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Fine-grained diagnostic detail.
    Debug,
    /// Routine operational information.
    Info,
    /// A condition worth operator attention but not yet a failure.
    Warn,
    /// A failure that a component has already handled or reported.
    Error,
}

/// A single published occurrence, carried through the event bus to every
/// matching subscriber.
///
/// # Invariants
/// - `occurred_at` is set once, at publish time, and never revised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Category used for subscription filtering.
    pub topic: EventTopic,
    /// Component that published this event, e.g. `"orchestrator"`.
    pub source: String,
    /// Experiment this event relates to, when applicable.
    pub experiment_id: Option<ExperimentId>,
    /// Log level, populated only for [`EventTopic::Log`].
    pub level: Option<LogLevel>,
    /// Human-readable summary.
    pub message: String,
    /// Opaque structured payload specific to `topic`.
    pub payload: serde_json::Value,
    /// Publish timestamp.
    pub occurred_at: Timestamp,
}

impl Event {
    /// Builds an event with an empty JSON object payload and no experiment
    /// association, the common case for infrastructure-level notifications.
    #[must_use]
    pub fn new(topic: EventTopic, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            topic,
            source: source.into(),
            experiment_id: None,
            level: None,
            message: message.into(),
            payload: serde_json::Value::Null,
            occurred_at: Timestamp::now(),
        }
    }

    /// Builds a [`EventTopic::Log`] event at the given level.
    #[must_use]
    pub fn log(level: LogLevel, source: impl Into<String>, message: impl Into<String>) -> Self {
        let mut event = Self::new(EventTopic::Log, source, message);
        event.level = Some(level);
        event
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

    #[test]
    fn log_event_carries_level() {
        let event = Event::log(LogLevel::Warn, "orchestrator", "resource alert");
        assert_eq!(event.topic, EventTopic::Log);
        assert_eq!(event.level, Some(LogLevel::Warn));
    }

    #[test]
    fn new_event_defaults_to_null_payload() {
        let event = Event::new(EventTopic::VersionCreated, "core", "v1 created");
        assert_eq!(event.payload, serde_json::Value::Null);
        assert!(event.experiment_id.is_none());
    }
}
