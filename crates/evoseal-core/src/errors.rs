// crates/evoseal-core/src/errors.rs
// ============================================================================
// Module: EVOSEAL Error Taxonomy
// Description: The six error kinds shared by every EVOSEAL component.
// Purpose: Let callers branch on failure category without matching concrete
//          per-module error enums.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Every `thiserror`-derived error enum in this workspace implements
//! [`ErrorClass`] so that orchestration code (recovery strategies, the
//! rollback manager, the workflow orchestrator) can react to a failure's
//! *kind* without knowing every concrete error type in the workspace.
//!
//! - **Validation** — bad input; no state change; never retried.
//! - **TransientIo** — network/disk glitch; recovered with bounded retries.
//! - **Integrity** — checkpoint hash mismatch or missing files; excluded
//!   from the known-good set.
//! - **Policy** — unauthorized action or safety-directory violation;
//!   rejected, never retried.
//! - **Component** — adapter internal failure; orchestrator attempts
//!   configured recovery strategies.
//! - **Fatal** — inconsistent core invariants; aborts with a diagnostic
//!   snapshot; no self-healing attempted.

// ============================================================================
// SECTION: Error Kind
// ============================================================================

/// The six error kinds recognized across EVOSEAL.
///
/// # Invariants
/// - Variants are stable for programmatic handling and telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input; surfaced as failure of the invoking operation.
    Validation,
    /// Network/disk glitch; recovered locally with bounded retries.
    TransientIo,
    /// Checkpoint hash mismatch or missing files.
    Integrity,
    /// Unauthorized rollback or safety-directory violation.
    Policy,
    /// Adapter internal failure.
    Component,
    /// Inconsistent core invariants; requires human review.
    Fatal,
}

impl ErrorKind {
    /// Returns whether operations that fail with this kind may be retried.
    ///
    /// Only [`ErrorKind::TransientIo`] is retryable; every other kind is
    /// either a non-idempotent rejection (`Policy`, `Validation`) or a
    /// failure that retrying cannot fix (`Integrity`, `Component`, `Fatal`
    /// are handled by recovery strategies other than blind retry).
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::TransientIo)
    }
}

/// Implemented by every error enum in this workspace to classify itself
/// into one of the six [`ErrorKind`] values.
pub trait ErrorClass {
    /// Returns this error's classification.
    fn kind(&self) -> ErrorKind;
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
    fn only_transient_io_is_retryable() {
        assert!(ErrorKind::TransientIo.is_retryable());
        assert!(!ErrorKind::Validation.is_retryable());
        assert!(!ErrorKind::Integrity.is_retryable());
        assert!(!ErrorKind::Policy.is_retryable());
        assert!(!ErrorKind::Component.is_retryable());
        assert!(!ErrorKind::Fatal.is_retryable());
    }
}
