// crates/evoseal-core/src/model/metric.rs
// ============================================================================
// Module: Metric
// Description: Immutable per-version metric observations.
// Purpose: Canonical Metric shape shared by the metrics store and detector.
// Dependencies: crate::identifiers, crate::time, serde
// ============================================================================

//! ## Overview
//! A [`Metric`] is immutable once recorded. Its [`MetricKind`] fixes which
//! direction of change counts as a regression: for
//! [`MetricKind::QualityHigherBetter`], a decrease is adverse; for
//! [`MetricKind::PerformanceLowerBetter`] and
//! [`MetricKind::ReliabilityLowerBetter`], an increase is adverse.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::VersionId;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Metric Kind
// ============================================================================

/// Classifies which direction of change in a metric's value is adverse.
///
/// # Invariants
/// - Variants are stable for serialization and threshold evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Lower values are better (e.g. latency); an increase is adverse.
    PerformanceLowerBetter,
    /// Higher values are better (e.g. accuracy); a decrease is adverse.
    QualityHigherBetter,
    /// Lower values are better (e.g. error rate); an increase is adverse.
    ReliabilityLowerBetter,
    /// No inherent direction; deltas are reported but never classified as
    /// regressions.
    Neutral,
}

impl MetricKind {
    /// Returns the oriented delta for regression classification: positive
    /// means "adverse change", regardless of the metric's raw sign
    /// convention.
    #[must_use]
    pub fn oriented_delta(self, raw_delta: f64) -> f64 {
        match self {
            Self::QualityHigherBetter => -raw_delta,
            Self::PerformanceLowerBetter | Self::ReliabilityLowerBetter => raw_delta,
            Self::Neutral => 0.0,
        }
    }
}

// ============================================================================
// SECTION: Metric
// ============================================================================

/// A single immutable metric observation.
///
/// # Invariants
/// - `value` is always finite (never NaN or infinite).
/// - The tuple `(version_id, name, step)` is unique within a metrics store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Metric name, e.g. `"success_rate"`.
    pub name: String,
    /// Observed value.
    pub value: f64,
    /// Direction-of-improvement classification.
    pub kind: MetricKind,
    /// Version the metric was observed on.
    pub version_id: VersionId,
    /// Iteration number within the owning workflow.
    pub iteration: u64,
    /// Step number within the iteration, for sub-iteration granularity.
    pub step: u64,
    /// Observation timestamp.
    pub timestamp: Timestamp,
}

impl Metric {
    /// Returns whether `value` is a value a metrics store may accept
    /// (finite, not NaN).
    #[must_use]
    pub fn has_finite_value(&self) -> bool {
        self.value.is_finite()
    }
}
