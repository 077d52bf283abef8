// crates/evoseal-store/src/metrics.rs
// ============================================================================
// Module: Metrics Store
// Description: Append-only per-version metric records and per-metric series.
// Purpose: Implement the Metrics Store contract (record/get/series).
// Dependencies: evoseal-core, rusqlite
// ============================================================================

//! ## Overview
//! Metrics are immutable once recorded: `(version_id, name, step)` is the
//! primary key, so a duplicate insert is rejected rather than silently
//! overwriting history.

// ============================================================================
// SECTION: Imports
// ============================================================================

use evoseal_core::identifiers::ExperimentId;
use evoseal_core::identifiers::VersionId;
use evoseal_core::model::Metric;
use evoseal_core::model::MetricKind;
use evoseal_core::time::Timestamp;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::connection::EvoStore;
use crate::error::StoreError;

impl EvoStore {
    /// Appends `metric` to the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when `metric.value` is non-finite or
    /// `(version_id, name, step)` was already recorded.
    pub fn record_metric(&self, experiment_id: &ExperimentId, metric: &Metric) -> Result<(), StoreError> {
        if !metric.has_finite_value() {
            return Err(StoreError::Invalid(format!("metric {} has a non-finite value", metric.name)));
        }
        let guard = self.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        let result = guard.execute(
            "INSERT INTO metrics (
                experiment_id, version_id, name, iteration, step, value, kind, recorded_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                experiment_id.as_str(),
                metric.version_id.as_str(),
                metric.name,
                i64::from(u32::try_from(metric.iteration).unwrap_or(u32::MAX)),
                i64::from(u32::try_from(metric.step).unwrap_or(u32::MAX)),
                metric.value,
                kind_label(metric.kind),
                metric.timestamp.to_rfc3339(),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Invalid(format!(
                    "metric {} step {} already recorded for version {}",
                    metric.name, metric.step, metric.version_id
                )))
            }
            Err(err) => Err(StoreError::Db(err.to_string())),
        }
    }

    /// Returns the most recently recorded value of `name` for `version_id`,
    /// or `None` if it was never recorded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on an underlying database failure.
    pub fn get_metric(&self, version_id: &VersionId, name: &str) -> Result<Option<Metric>, StoreError> {
        let guard = self.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        guard
            .query_row(
                "SELECT experiment_id, version_id, name, iteration, step, value, kind, recorded_at
                 FROM metrics WHERE version_id = ?1 AND name = ?2 ORDER BY step DESC LIMIT 1",
                params![version_id.as_str(), name],
                map_metric_row,
            )
            .optional()
            .map_err(|err| StoreError::Db(err.to_string()))
    }

    /// Returns the distinct metric names recorded for `version_id`.
    ///
    /// Used by the regression detector to find metrics present on both
    /// sides of a baseline/candidate comparison without the caller having
    /// to know metric names in advance.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on an underlying database failure.
    pub fn list_metric_names(&self, version_id: &VersionId) -> Result<Vec<String>, StoreError> {
        let guard = self.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        let mut statement = guard
            .prepare("SELECT DISTINCT name FROM metrics WHERE version_id = ?1 ORDER BY name ASC")
            .map_err(|err| StoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params![version_id.as_str()], |row| row.get::<_, String>(0))
            .map_err(|err| StoreError::Db(err.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(|err| StoreError::Db(err.to_string()))
    }

    /// Returns up to `limit` most recent `(version_id, value)` pairs for
    /// `name` within `experiment_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on an underlying database failure.
    pub fn metric_series(
        &self,
        experiment_id: &ExperimentId,
        name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<(VersionId, f64)>, StoreError> {
        let limit = limit.unwrap_or(usize::MAX);
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let guard = self.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        let mut statement = guard
            .prepare(
                "SELECT version_id, value FROM (
                    SELECT version_id, value, recorded_at FROM metrics
                    WHERE experiment_id = ?1 AND name = ?2
                    ORDER BY recorded_at DESC, step DESC LIMIT ?3
                 ) ORDER BY recorded_at ASC",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params![experiment_id.as_str(), name, limit_i64], |row| {
                let raw_id: String = row.get(0)?;
                let value: f64 = row.get(1)?;
                Ok((raw_id, value))
            })
            .map_err(|err| StoreError::Db(err.to_string()))?;
        rows.map(|row| {
            let (raw_id, value) = row.map_err(|err| StoreError::Db(err.to_string()))?;
            let version_id =
                VersionId::new(raw_id).map_err(|err| StoreError::Corrupt(err.to_string()))?;
            Ok((version_id, value))
        })
        .collect()
    }
}

/// Maps a `metrics` row into a [`Metric`].
fn map_metric_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Metric> {
    let version_id_raw: String = row.get(1)?;
    let name: String = row.get(2)?;
    let iteration: i64 = row.get(3)?;
    let step: i64 = row.get(4)?;
    let value: f64 = row.get(5)?;
    let kind_label: String = row.get(6)?;
    let recorded_at: String = row.get(7)?;
    let version_id = VersionId::new(version_id_raw)
        .map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let kind =
        parse_kind(&kind_label).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let timestamp = Timestamp::parse(&recorded_at)
        .map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    Ok(Metric {
        name,
        value,
        kind,
        version_id,
        iteration: u64::try_from(iteration).unwrap_or(0),
        step: u64::try_from(step).unwrap_or(0),
        timestamp,
    })
}

/// Returns the stable wire label for a [`MetricKind`].
const fn kind_label(kind: MetricKind) -> &'static str {
    match kind {
        MetricKind::PerformanceLowerBetter => "performance_lower_better",
        MetricKind::QualityHigherBetter => "quality_higher_better",
        MetricKind::ReliabilityLowerBetter => "reliability_lower_better",
        MetricKind::Neutral => "neutral",
    }
}

/// Parses a stored [`MetricKind`] label.
fn parse_kind(label: &str) -> Result<MetricKind, StoreError> {
    match label {
        "performance_lower_better" => Ok(MetricKind::PerformanceLowerBetter),
        "quality_higher_better" => Ok(MetricKind::QualityHigherBetter),
        "reliability_lower_better" => Ok(MetricKind::ReliabilityLowerBetter),
        "neutral" => Ok(MetricKind::Neutral),
        other => Err(StoreError::Corrupt(format!("unknown metric kind: {other}"))),
    }
}
