// crates/evoseal-eventbus/src/sink.rs
// ============================================================================
// Module: Stderr Event Sink
// Description: A bus subscriber that renders log-level events to stderr.
// Purpose: Give EVOSEAL a default logging backend without a tracing/log
//          dependency, consistent with using the bus as the logging
//          substrate.
// Dependencies: evoseal-core
// ============================================================================

//! ## Overview
//! [`StderrEventSink`] subscribes to [`EventTopic::Log`] and writes a single
//! line per event in `LEVEL source: message` form. It is the default
//! logging backend wired by `evoseal-cli`; operators who want structured
//! JSON logs instead can subscribe their own [`EventHandler`] to the same
//! topic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use evoseal_core::model::Event;
use evoseal_core::model::EventTopic;
use evoseal_core::model::LogLevel;

use crate::handler::DispatchControl;
use crate::handler::EventHandler;
use crate::handler::HandlerError;

// ============================================================================
// SECTION: Stderr Sink
// ============================================================================

/// Renders [`EventTopic::Log`] events to stderr.
///
/// # Invariants
/// - Ignores events on any other topic.
#[derive(Debug)]
pub struct StderrEventSink {
    /// Minimum level rendered; events below this level are dropped silently.
    min_level: LogLevel,
}

impl StderrEventSink {
    /// Creates a sink that renders every level.
    #[must_use]
    pub fn new() -> Self {
        Self { min_level: LogLevel::Debug }
    }

    /// Creates a sink that renders only `min_level` and above.
    #[must_use]
    pub fn with_min_level(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

impl Default for StderrEventSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EventHandler for StderrEventSink {
    async fn handle(&self, event: &Event) -> Result<DispatchControl, HandlerError> {
        if event.topic != EventTopic::Log {
            return Ok(DispatchControl::Continue);
        }
        let Some(level) = event.level else {
            return Ok(DispatchControl::Continue);
        };
        if level < self.min_level {
            return Ok(DispatchControl::Continue);
        }
        render(event, level);
        Ok(DispatchControl::Continue)
    }
}

#[allow(clippy::print_stderr, reason = "this sink's sole purpose is line-oriented stderr logging")]
fn render(event: &Event, level: LogLevel) {
    eprintln!("{} {:>5} {}: {}", event.occurred_at, level_label(level), event.source, event.message);
}

/// Returns the conventional upper-case label for a log level.
const fn level_label(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Debug => "DEBUG",
        LogLevel::Info => "INFO",
        LogLevel::Warn => "WARN",
        LogLevel::Error => "ERROR",
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
    async fn ignores_non_log_topics() {
        let sink = StderrEventSink::new();
        let event = Event::new(EventTopic::VersionCreated, "core", "created");
        assert_eq!(sink.handle(&event).await.expect("handle"), DispatchControl::Continue);
    }

    #[tokio::test]
    async fn filters_below_min_level() {
        let sink = StderrEventSink::with_min_level(LogLevel::Warn);
        let event = Event::log(LogLevel::Debug, "core", "noisy");
        assert_eq!(sink.handle(&event).await.expect("handle"), DispatchControl::Continue);
    }
}
