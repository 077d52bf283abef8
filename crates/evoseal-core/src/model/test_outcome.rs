// crates/evoseal-core/src/model/test_outcome.rs
// ============================================================================
// Module: Test Outcome
// Description: The result of one acceptance test run against a candidate.
// Purpose: Canonical TestOutcome shape consumed by the rollback manager and
//          safety integration's accept/rollback decision.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A candidate version's acceptance is gated on its `Vec<TestOutcome>` having
//! no [`TestStatus::Fail`] entries, alongside the regression report. This
//! module only carries the shape; the suite that produces it lives with
//! whichever adapter ran it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Test Status
// ============================================================================

/// The result of one test.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    /// The test passed.
    Pass,
    /// The test failed.
    Fail,
    /// The test did not run.
    Skipped,
}

// ============================================================================
// SECTION: Test Outcome
// ============================================================================

/// One test's result against a candidate version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Test name.
    pub name: String,
    /// Result of the test.
    pub status: TestStatus,
    /// Human-readable detail, particularly useful on failure.
    pub detail: String,
}

impl TestOutcome {
    /// Returns whether any outcome in `results` is [`TestStatus::Fail`].
    #[must_use]
    pub fn any_failed(results: &[Self]) -> bool {
        results.iter().any(|r| r.status == TestStatus::Fail)
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
    fn any_failed_is_false_for_empty_or_all_pass() {
        assert!(!TestOutcome::any_failed(&[]));
        let pass = TestOutcome { name: "a".to_string(), status: TestStatus::Pass, detail: String::new() };
        assert!(!TestOutcome::any_failed(&[pass]));
    }

    #[test]
    fn any_failed_detects_a_single_failure() {
        let pass = TestOutcome { name: "a".to_string(), status: TestStatus::Pass, detail: String::new() };
        let fail = TestOutcome { name: "b".to_string(), status: TestStatus::Fail, detail: "boom".to_string() };
        assert!(TestOutcome::any_failed(&[pass, fail]));
    }
}
