// crates/evoseal-safety/src/regression_detector.rs
// ============================================================================
// Module: Regression Detector (C4)
// Description: Compares a candidate version's metrics against its baseline's
//              recorded history and produces a RegressionReport.
// Purpose: The single source of truth for "did this candidate regress".
// Dependencies: evoseal-config, evoseal-core, evoseal-store
// ============================================================================

//! ## Overview
//! [`RegressionDetector::evaluate`] implements the six-step comparison:
//! 1. enumerate metrics recorded on both the baseline and candidate version,
//! 2. build a confidence interval from the metric's historical series,
//! 3. orient the raw delta by the metric's [`MetricKind`] so a positive
//!    oriented delta always means "worse",
//! 4. fold in trend direction from [`stats::linear_regression`],
//! 5. fold in anomaly signals from [`stats::detect_anomalies`],
//! 6. classify per-metric [`Severity`] against that metric's
//!    `metric_thresholds` entry (or the detector's default bound) and roll
//!    it up into the report's overall severity.

use std::collections::BTreeMap;

use evoseal_config::SafetyConfig;
use evoseal_config::ThresholdPair;
use evoseal_core::identifiers::ExperimentId;
use evoseal_core::identifiers::VersionId;
use evoseal_core::model::MetricFinding;
use evoseal_core::model::MetricKind;
use evoseal_core::model::RegressionReport;
use evoseal_core::model::Severity;
use evoseal_core::model::Significance;
use evoseal_core::time::Timestamp;
use evoseal_store::EvoStore;

use crate::error::SafetyError;
use crate::stats;

/// Tunable thresholds for the regression detector, sourced from
/// [`evoseal_config::SafetyConfig`] at call sites.
#[derive(Debug, Clone)]
pub struct DetectorThresholds {
    /// Confidence level for the per-metric interval (e.g. `0.95`).
    pub confidence: f64,
    /// Default oriented-delta fraction of the baseline value past which a
    /// finding is `Low` rather than `None`, for metrics with no entry in
    /// `metric_thresholds`.
    pub warn_threshold: f64,
    /// Default oriented-delta fraction of the baseline value past which a
    /// finding is `Critical` on threshold alone, for metrics with no entry
    /// in `metric_thresholds`.
    pub critical_threshold: f64,
    /// Per-metric `{warn, critical}` overrides, keyed by metric name. A
    /// metric present here ignores `warn_threshold`/`critical_threshold`.
    pub metric_thresholds: BTreeMap<String, ThresholdPair>,
    /// z-score magnitude for an anomaly warning.
    pub z_warn: f64,
    /// z-score magnitude for an anomaly classified critical.
    pub z_critical: f64,
    /// IQR fence multiplier.
    pub iqr_multiplier: f64,
    /// Relative swing past which a pattern change is flagged.
    pub pattern_sensitivity: f64,
    /// Minimum history length (in addition to the baseline/candidate
    /// values themselves) used to build trend and anomaly signals.
    pub min_history: usize,
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self {
            confidence: 0.95,
            warn_threshold: 0.05,
            critical_threshold: 0.1,
            metric_thresholds: BTreeMap::new(),
            z_warn: 2.0,
            z_critical: 3.0,
            iqr_multiplier: 1.5,
            pattern_sensitivity: 0.5,
            min_history: 5,
        }
    }
}

impl DetectorThresholds {
    /// Builds thresholds from a loaded [`SafetyConfig`]: `regression_threshold`
    /// becomes the default critical bound (half of it the default warn
    /// bound), and `metric_thresholds` is carried through verbatim so each
    /// metric's own `{warn, critical}` pair overrides the default.
    #[must_use]
    pub fn from_safety_config(config: &SafetyConfig) -> Self {
        Self {
            warn_threshold: config.regression_threshold / 2.0,
            critical_threshold: config.regression_threshold,
            metric_thresholds: config.metric_thresholds.clone(),
            ..Self::default()
        }
    }

    /// Resolves the `{warn, critical}` bound for `name`: its entry in
    /// `metric_thresholds` if one exists, else the default bound.
    fn bounds_for(&self, name: &str) -> (f64, f64) {
        self.metric_thresholds
            .get(name)
            .map(|pair| (pair.warn, pair.critical))
            .unwrap_or((self.warn_threshold, self.critical_threshold))
    }
}

/// Compares candidate versions against a baseline using recorded metric
/// history.
#[derive(Debug, Clone)]
pub struct RegressionDetector {
    store: EvoStore,
    thresholds: DetectorThresholds,
}

impl RegressionDetector {
    /// Builds a detector over `store` using `thresholds`.
    #[must_use]
    pub const fn new(store: EvoStore, thresholds: DetectorThresholds) -> Self {
        Self { store, thresholds }
    }

    /// Compares `candidate_version_id` against `baseline_version_id` within
    /// `experiment_id`, producing a full [`RegressionReport`].
    ///
    /// Metrics recorded on only one side are skipped: a regression
    /// determination needs both values.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::Store`] when the underlying store fails.
    pub fn evaluate(
        &self,
        experiment_id: &ExperimentId,
        baseline_version_id: &VersionId,
        candidate_version_id: &VersionId,
    ) -> Result<RegressionReport, SafetyError> {
        let baseline_names = self.store.list_metric_names(baseline_version_id)?;
        let candidate_names = self.store.list_metric_names(candidate_version_id)?;
        let candidate_name_set: std::collections::BTreeSet<_> = candidate_names.into_iter().collect();

        let mut findings = Vec::new();
        for name in baseline_names {
            if !candidate_name_set.contains(&name) {
                continue;
            }
            if let Some(finding) = self.evaluate_metric(experiment_id, baseline_version_id, candidate_version_id, &name)? {
                findings.push(finding);
            }
        }

        Ok(RegressionReport::from_findings(
            candidate_version_id.clone(),
            baseline_version_id.clone(),
            findings,
            Timestamp::now(),
        ))
    }

    /// Evaluates a single named metric, returning `None` if either side has
    /// no recorded value.
    fn evaluate_metric(
        &self,
        experiment_id: &ExperimentId,
        baseline_version_id: &VersionId,
        candidate_version_id: &VersionId,
        name: &str,
    ) -> Result<Option<MetricFinding>, SafetyError> {
        let Some(baseline_metric) = self.store.get_metric(baseline_version_id, name)? else {
            return Ok(None);
        };
        let Some(candidate_metric) = self.store.get_metric(candidate_version_id, name)? else {
            return Ok(None);
        };

        let history = self.store.metric_series(experiment_id, name, None)?;
        let history_values: Vec<f64> = history.iter().map(|(_, value)| *value).collect();

        let raw_delta = candidate_metric.value - baseline_metric.value;
        let oriented_delta = baseline_metric.kind.oriented_delta(raw_delta);

        let ci = stats::confidence_interval(&history_values, self.thresholds.confidence);
        let outside_interval = ci.is_some_and(|interval| interval.excludes(candidate_metric.value));

        let trend = stats::linear_regression(&history_values);
        let trend_worsening = trend.is_some_and(|info| {
            let oriented_slope = baseline_metric.kind.oriented_delta(info.slope);
            oriented_slope > 0.0 && info.r_squared > 0.5
        });

        let anomaly = if history_values.len() >= self.thresholds.min_history {
            stats::detect_anomalies(
                &history_values,
                candidate_metric.value,
                self.thresholds.z_warn,
                self.thresholds.z_critical,
                self.thresholds.iqr_multiplier,
                self.thresholds.pattern_sensitivity,
            )
        } else {
            stats::AnomalySignal::default()
        };

        let significance = if outside_interval || anomaly.any_flagged() {
            Significance::Significant
        } else {
            Significance::NotSignificant
        };

        let (warn_threshold, critical_threshold) = self.thresholds.bounds_for(name);
        let severity = classify_severity(
            oriented_delta,
            baseline_metric.value,
            warn_threshold,
            critical_threshold,
            significance,
            anomaly,
            trend_worsening,
        );

        Ok(Some(MetricFinding {
            metric_name: name.to_string(),
            baseline_value: baseline_metric.value,
            candidate_value: candidate_metric.value,
            oriented_delta,
            significance,
            severity,
        }))
    }
}

/// Classifies a finding's [`Severity`] from its oriented delta, anomaly
/// signals, and trend direction.
///
/// A non-significant, non-worsening finding is always [`Severity::None`].
/// Among significant findings, the relative oriented delta decides the base
/// tier: below `warn_threshold` is `Low`, below `critical_threshold` is
/// `Medium`, and at or past `critical_threshold` is `Critical` outright —
/// reaching `Critical` never requires an anomaly or trend signal. A
/// `z_score_critical` or `iqr_flagged` anomaly promotes the base tier by one
/// step, and a worsening trend by another, saturating at
/// [`Severity::Critical`].
fn classify_severity(
    oriented_delta: f64,
    baseline_value: f64,
    warn_threshold: f64,
    critical_threshold: f64,
    significance: Significance,
    anomaly: stats::AnomalySignal,
    trend_worsening: bool,
) -> Severity {
    if significance == Significance::NotSignificant && oriented_delta <= 0.0 {
        return Severity::None;
    }

    let relative = if baseline_value.abs() > f64::EPSILON { oriented_delta / baseline_value.abs() } else { oriented_delta };

    let mut severity = if relative <= 0.0 {
        Severity::None
    } else if relative < warn_threshold {
        Severity::Low
    } else if relative < critical_threshold {
        Severity::Medium
    } else {
        Severity::Critical
    };

    if anomaly.z_score_critical || anomaly.iqr_flagged {
        severity = promote(severity);
    }
    if trend_worsening {
        severity = promote(severity);
    }

    severity
}

/// Promotes a severity by one tier, saturating at [`Severity::Critical`].
const fn promote(severity: Severity) -> Severity {
    match severity {
        Severity::None => Severity::Low,
        Severity::Low => Severity::Medium,
        Severity::Medium => Severity::High,
        Severity::High | Severity::Critical => Severity::Critical,
    }
}

/// Convenience wrapper pairing a metric's kind with its oriented delta
/// helper, used by callers that already hold a [`MetricKind`] without a
/// full `Metric`.
#[must_use]
pub fn oriented_delta(kind: MetricKind, raw_delta: f64) -> f64 {
    kind.oriented_delta(raw_delta)
}
