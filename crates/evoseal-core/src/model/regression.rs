// crates/evoseal-core/src/model/regression.rs
// ============================================================================
// Module: Regression Report
// Description: The output of one regression-detector evaluation.
// Purpose: Canonical RegressionReport shape shared with the safety crate.
// Dependencies: crate::identifiers, crate::time, serde
// ============================================================================

//! ## Overview
//! A [`RegressionReport`] summarizes whether a candidate version is a
//! statistically or threshold-significant regression against its comparison
//! baseline, per metric. `evoseal-safety` is the only producer; this module
//! only carries the shared shape.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::VersionId;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Severity and Significance
// ============================================================================

/// How severe a detected regression is judged to be.
///
/// # Invariants
/// - Ordered from least to most severe; `Ord` reflects escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// No adverse change detected.
    None,
    /// Adverse change within tolerance; logged but not actionable.
    Low,
    /// Adverse change past the warning threshold.
    Medium,
    /// Adverse change past the rollback threshold.
    High,
    /// Adverse change severe enough to halt the workflow outright.
    Critical,
}

/// Whether a detected change is distinguishable from noise.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    /// The observed difference is within expected sampling variation.
    NotSignificant,
    /// The observed difference exceeds the chosen critical value.
    Significant,
}

// ============================================================================
// SECTION: Per-Metric Finding
// ============================================================================

/// The detector's judgment for a single metric.
///
/// # Invariants
/// - `oriented_delta` is positive exactly when the change is adverse,
///   regardless of the metric's raw sign convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricFinding {
    /// Metric name this finding concerns.
    pub metric_name: String,
    /// Baseline value compared against.
    pub baseline_value: f64,
    /// Candidate value under evaluation.
    pub candidate_value: f64,
    /// Direction-normalized delta; positive is adverse.
    pub oriented_delta: f64,
    /// Statistical significance of the delta, when enough history exists.
    pub significance: Significance,
    /// Severity assigned to this metric alone.
    pub severity: Severity,
}

// ============================================================================
// SECTION: Regression Report
// ============================================================================

/// The aggregate result of evaluating one candidate version against its
/// baseline across all tracked metrics.
///
/// # Invariants
/// - `overall_severity` is the maximum severity across `findings`.
/// - `has_regression` is `overall_severity > Severity::None`.
/// - `is_critical` is `overall_severity == Severity::Critical`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionReport {
    /// Version evaluated.
    pub candidate_version_id: VersionId,
    /// Version used as the comparison baseline.
    pub baseline_version_id: VersionId,
    /// Per-metric findings.
    pub findings: Vec<MetricFinding>,
    /// Maximum severity across all findings.
    pub overall_severity: Severity,
    /// Whether any metric showed an adverse change at all.
    pub has_regression: bool,
    /// Whether any metric reached [`Severity::Critical`]. This, not
    /// `has_regression`, is what auto-rollback gates on.
    pub is_critical: bool,
    /// Evaluation timestamp.
    pub evaluated_at: Timestamp,
}

impl RegressionReport {
    /// Builds a report from `findings`, deriving `overall_severity` as the
    /// maximum severity present.
    #[must_use]
    pub fn from_findings(
        candidate_version_id: VersionId,
        baseline_version_id: VersionId,
        findings: Vec<MetricFinding>,
        evaluated_at: Timestamp,
    ) -> Self {
        let overall_severity = findings
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(Severity::None);
        Self {
            candidate_version_id,
            baseline_version_id,
            findings,
            overall_severity,
            has_regression: overall_severity > Severity::None,
            is_critical: overall_severity == Severity::Critical,
            evaluated_at,
        }
    }

    /// Returns whether any finding reached at least [`Severity::High`].
    ///
    /// This is a coarser signal than `is_critical`: a `High` finding is
    /// worth surfacing to an operator, but on its own does not gate
    /// automatic rollback.
    #[must_use]
    pub fn requires_rollback(&self) -> bool {
        self.overall_severity >= Severity::High
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

    fn finding(severity: Severity) -> MetricFinding {
        MetricFinding {
            metric_name: "latency_ms".to_string(),
            baseline_value: 100.0,
            candidate_value: 150.0,
            oriented_delta: 50.0,
            significance: Significance::Significant,
            severity,
        }
    }

    #[test]
    fn overall_severity_is_the_maximum() {
        let report = RegressionReport::from_findings(
            VersionId::new("v2").expect("valid"),
            VersionId::new("v1").expect("valid"),
            vec![finding(Severity::Low), finding(Severity::Critical), finding(Severity::Medium)],
            Timestamp::now(),
        );
        assert_eq!(report.overall_severity, Severity::Critical);
    }

    #[test]
    fn empty_findings_yield_no_severity() {
        let report = RegressionReport::from_findings(
            VersionId::new("v2").expect("valid"),
            VersionId::new("v1").expect("valid"),
            vec![],
            Timestamp::now(),
        );
        assert_eq!(report.overall_severity, Severity::None);
        assert!(!report.requires_rollback());
    }

    #[test]
    fn high_severity_requires_rollback() {
        let report = RegressionReport::from_findings(
            VersionId::new("v2").expect("valid"),
            VersionId::new("v1").expect("valid"),
            vec![finding(Severity::High)],
            Timestamp::now(),
        );
        assert!(report.requires_rollback());
    }
}
