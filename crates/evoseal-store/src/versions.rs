// crates/evoseal-store/src/versions.rs
// ============================================================================
// Module: Version/Experiment Store
// Description: Persists experiments, versions, variants, lineage, and the
//              rollback audit log.
// Purpose: Implement the C11 contract (list/get/save/delete experiments;
//          add_variant/get_best/get_lineage; list_checkpoints) plus version
//          persistence and the rollback record log shared with the safety
//          crate.
// Dependencies: evoseal-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! Experiments and variants are crash-recoverable: every write commits
//! inside a transaction before the call returns. Versions are immutable —
//! `save_version` rejects an attempt to reuse an identifier with different
//! content — while experiments are resaved wholesale on every lifecycle
//! transition, matching how [`evoseal_core::model::Experiment::try_transition`]
//! mutates its argument in place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use evoseal_core::identifiers::ExperimentId;
use evoseal_core::identifiers::VariantId;
use evoseal_core::identifiers::VersionId;
use evoseal_core::model::Experiment;
use evoseal_core::model::ExperimentStatus;
use evoseal_core::model::RollbackOutcome;
use evoseal_core::model::RollbackRecord;
use evoseal_core::model::RollbackTrigger;
use evoseal_core::model::Variant;
use evoseal_core::model::Version;
use evoseal_core::time::Timestamp;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::checkpoints::CheckpointRecord;
use crate::checkpoints::map_checkpoint_row;
use crate::connection::EvoStore;
use crate::error::StoreError;

/// Criteria for narrowing [`EvoStore::list_experiments`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperimentFilter {
    /// Restrict to experiments in this lifecycle status.
    pub status: Option<ExperimentStatus>,
    /// Restrict to experiments carrying this tag.
    pub tag: Option<String>,
}

impl EvoStore {
    // ------------------------------------------------------------------
    // Experiments
    // ------------------------------------------------------------------

    /// Returns experiments matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on an underlying database failure, or
    /// [`StoreError::Corrupt`] if a stored row cannot be decoded.
    pub fn list_experiments(&self, filter: &ExperimentFilter) -> Result<Vec<Experiment>, StoreError> {
        let guard = self.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        let mut statement = guard
            .prepare(
                "SELECT id, name, config, status, created_at, started_at, completed_at, tags_json
                 FROM experiments ORDER BY created_at ASC",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map([], map_experiment_row)
            .map_err(|err| StoreError::Db(err.to_string()))?;
        let mut experiments = Vec::new();
        for row in rows {
            let experiment = row.map_err(|err| StoreError::Db(err.to_string()))?;
            if let Some(status) = filter.status {
                if experiment.status != status {
                    continue;
                }
            }
            if let Some(tag) = &filter.tag {
                if !experiment.tags.contains(tag) {
                    continue;
                }
            }
            experiments.push(experiment);
        }
        Ok(experiments)
    }

    /// Returns the experiment identified by `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on an underlying database failure.
    pub fn get_experiment(&self, id: &ExperimentId) -> Result<Option<Experiment>, StoreError> {
        let guard = self.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        guard
            .query_row(
                "SELECT id, name, config, status, created_at, started_at, completed_at, tags_json
                 FROM experiments WHERE id = ?1",
                params![id.as_str()],
                map_experiment_row,
            )
            .optional()
            .map_err(|err| StoreError::Db(err.to_string()))
    }

    /// Inserts or wholesale-replaces an experiment's record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on an underlying database failure.
    pub fn save_experiment(&self, experiment: &Experiment) -> Result<(), StoreError> {
        let guard = self.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        guard
            .execute(
                "INSERT INTO experiments (
                    id, name, config, status, created_at, started_at, completed_at, tags_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    config = excluded.config,
                    status = excluded.status,
                    started_at = excluded.started_at,
                    completed_at = excluded.completed_at,
                    tags_json = excluded.tags_json",
                params![
                    experiment.id.as_str(),
                    experiment.name,
                    experiment.config,
                    status_label(experiment.status),
                    experiment.created_at.to_rfc3339(),
                    experiment.started_at.map(Timestamp::to_rfc3339),
                    experiment.completed_at.map(Timestamp::to_rfc3339),
                    serde_json::to_string(&experiment.tags).map_err(|err| StoreError::Invalid(err.to_string()))?,
                ],
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Deletes an experiment and every version, metric, and variant owned by
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on an underlying database failure.
    pub fn delete(&self, id: &ExperimentId) -> Result<bool, StoreError> {
        let mut guard = self.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        let tx = guard.transaction().map_err(|err| StoreError::Db(err.to_string()))?;
        let deleted = tx
            .execute("DELETE FROM experiments WHERE id = ?1", params![id.as_str()])
            .map_err(|err| StoreError::Db(err.to_string()))?;
        tx.execute("DELETE FROM versions WHERE experiment_id = ?1", params![id.as_str()])
            .map_err(|err| StoreError::Db(err.to_string()))?;
        tx.execute("DELETE FROM metrics WHERE experiment_id = ?1", params![id.as_str()])
            .map_err(|err| StoreError::Db(err.to_string()))?;
        tx.execute("DELETE FROM variants WHERE experiment_id = ?1", params![id.as_str()])
            .map_err(|err| StoreError::Db(err.to_string()))?;
        tx.commit().map_err(|err| StoreError::Db(err.to_string()))?;
        Ok(deleted > 0)
    }

    // ------------------------------------------------------------------
    // Versions
    // ------------------------------------------------------------------

    /// Persists `version`. Versions are immutable: reusing an identifier
    /// with different content is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when `version.id` was already
    /// recorded with different content.
    pub fn save_version(&self, version: &Version) -> Result<(), StoreError> {
        if let Some(existing) = self.get_version(&version.id)? {
            return if &existing == version {
                Ok(())
            } else {
                Err(StoreError::Invalid(format!("version {} already recorded with different content", version.id)))
            };
        }
        let guard = self.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        guard
            .execute(
                "INSERT INTO versions (id, experiment_id, parent_ids_json, created_at, generation, payload_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    version.id.as_str(),
                    version.experiment_id.as_str(),
                    serde_json::to_string(&version.parent_ids).map_err(|err| StoreError::Invalid(err.to_string()))?,
                    version.created_at.to_rfc3339(),
                    i64::from(version.generation),
                    serde_json::to_vec(&version.payload).map_err(|err| StoreError::Invalid(err.to_string()))?,
                ],
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Returns the version identified by `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on an underlying database failure.
    pub fn get_version(&self, id: &VersionId) -> Result<Option<Version>, StoreError> {
        let guard = self.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        guard
            .query_row(
                "SELECT id, experiment_id, parent_ids_json, created_at, generation, payload_json
                 FROM versions WHERE id = ?1",
                params![id.as_str()],
                map_version_row,
            )
            .optional()
            .map_err(|err| StoreError::Db(err.to_string()))
    }

    /// Returns every version owned by `experiment_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on an underlying database failure.
    pub fn list_versions(&self, experiment_id: &ExperimentId) -> Result<Vec<Version>, StoreError> {
        let guard = self.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        let mut statement = guard
            .prepare(
                "SELECT id, experiment_id, parent_ids_json, created_at, generation, payload_json
                 FROM versions WHERE experiment_id = ?1 ORDER BY generation ASC, created_at ASC",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params![experiment_id.as_str()], map_version_row)
            .map_err(|err| StoreError::Db(err.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(|err| StoreError::Db(err.to_string()))
    }

    // ------------------------------------------------------------------
    // Variants
    // ------------------------------------------------------------------

    /// Records a new candidate variant.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when `variant.id` was already
    /// recorded.
    pub fn add_variant(&self, variant: &Variant) -> Result<(), StoreError> {
        let guard = self.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        let result = guard.execute(
            "INSERT INTO variants (
                id, experiment_id, source, tests_json, score, parents_json, generation, mutation_kind, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                variant.id.as_str(),
                variant.experiment_id.as_str(),
                variant.source,
                serde_json::to_string(&variant.tests).map_err(|err| StoreError::Invalid(err.to_string()))?,
                variant.score,
                serde_json::to_string(&variant.parents).map_err(|err| StoreError::Invalid(err.to_string()))?,
                i64::from(variant.generation),
                variant.mutation_kind,
                variant.created_at.to_rfc3339(),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == rusqlite::ErrorCode::ConstraintViolation => {
                Err(StoreError::Invalid(format!("variant {} already recorded", variant.id)))
            }
            Err(err) => Err(StoreError::Db(err.to_string())),
        }
    }

    /// Returns up to `limit` variants for `experiment_id` ordered by score,
    /// highest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on an underlying database failure.
    pub fn get_best(&self, experiment_id: &ExperimentId, limit: usize) -> Result<Vec<Variant>, StoreError> {
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let guard = self.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        let mut statement = guard
            .prepare(
                "SELECT id, experiment_id, source, tests_json, score, parents_json, generation, mutation_kind, created_at
                 FROM variants WHERE experiment_id = ?1 ORDER BY score DESC LIMIT ?2",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params![experiment_id.as_str(), limit_i64], map_variant_row)
            .map_err(|err| StoreError::Db(err.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(|err| StoreError::Db(err.to_string()))
    }

    /// Returns the transitive parent lineage of `variant_id`, nearest
    /// ancestor first, stopping if a cycle is encountered.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on an underlying database failure.
    pub fn get_lineage(&self, variant_id: &VariantId) -> Result<Vec<Variant>, StoreError> {
        let mut lineage = Vec::new();
        let mut visited = BTreeSet::new();
        let mut frontier = vec![variant_id.clone()];
        while let Some(current) = frontier.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(variant) = self.get_variant(&current)? else {
                continue;
            };
            for parent in variant.parents.iter().rev() {
                frontier.push(parent.clone());
            }
            if current != *variant_id {
                lineage.push(variant);
            }
        }
        Ok(lineage)
    }

    /// Returns a single variant by identifier, if recorded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on an underlying database failure.
    pub fn get_variant(&self, id: &VariantId) -> Result<Option<Variant>, StoreError> {
        let guard = self.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        guard
            .query_row(
                "SELECT id, experiment_id, source, tests_json, score, parents_json, generation, mutation_kind, created_at
                 FROM variants WHERE id = ?1",
                params![id.as_str()],
                map_variant_row,
            )
            .optional()
            .map_err(|err| StoreError::Db(err.to_string()))
    }

    // ------------------------------------------------------------------
    // Checkpoint handles
    // ------------------------------------------------------------------

    /// Returns every checkpoint recorded for a version owned by
    /// `experiment_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on an underlying database failure.
    pub fn list_checkpoints(&self, experiment_id: &ExperimentId) -> Result<Vec<CheckpointRecord>, StoreError> {
        let guard = self.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        let mut statement = guard
            .prepare(
                "SELECT c.checkpoint_id, c.version_id, c.created_at, c.checkpoint_kind, c.content_hash,
                        c.payload_location, c.metadata_json
                 FROM checkpoints c JOIN versions v ON v.id = c.version_id
                 WHERE v.experiment_id = ?1 ORDER BY c.created_at ASC",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params![experiment_id.as_str()], map_checkpoint_row)
            .map_err(|err| StoreError::Db(err.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(|err| StoreError::Db(err.to_string()))
    }

    // ------------------------------------------------------------------
    // Rollback audit log
    // ------------------------------------------------------------------

    /// Appends a rollback attempt to the audit log, regardless of outcome.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on an underlying database failure.
    pub fn record_rollback(&self, record: &RollbackRecord) -> Result<(), StoreError> {
        let guard = self.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        guard
            .execute(
                "INSERT INTO rollback_records (
                    from_version_id, to_version_id, to_checkpoint_id, trigger_kind, outcome,
                    versions_walked, recorded_at, detail
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.from_version_id.as_str(),
                    record.to_version_id.as_ref().map(evoseal_core::identifiers::VersionId::as_str),
                    record.to_checkpoint_id.as_ref().map(evoseal_core::identifiers::CheckpointId::as_str),
                    trigger_label(record.trigger),
                    outcome_label(record.outcome),
                    i64::from(record.versions_walked),
                    record.recorded_at.to_rfc3339(),
                    record.detail,
                ],
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Returns the full rollback audit log, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on an underlying database failure.
    pub fn rollback_history(&self) -> Result<Vec<RollbackRecord>, StoreError> {
        let guard = self.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        let mut statement = guard
            .prepare(
                "SELECT from_version_id, to_version_id, to_checkpoint_id, trigger_kind, outcome,
                        versions_walked, recorded_at, detail
                 FROM rollback_records ORDER BY recorded_at ASC",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map([], map_rollback_row)
            .map_err(|err| StoreError::Db(err.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(|err| StoreError::Db(err.to_string()))
    }
}

// ============================================================================
// SECTION: Row mapping
// ============================================================================

/// Maps an `experiments` row into an [`Experiment`].
fn map_experiment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Experiment> {
    let id_raw: String = row.get(0)?;
    let name: String = row.get(1)?;
    let config: String = row.get(2)?;
    let status_raw: String = row.get(3)?;
    let created_at_raw: String = row.get(4)?;
    let started_at_raw: Option<String> = row.get(5)?;
    let completed_at_raw: Option<String> = row.get(6)?;
    let tags_raw: String = row.get(7)?;

    let id = ExperimentId::new(id_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let status = parse_status(&status_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let created_at =
        Timestamp::parse(&created_at_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let started_at = started_at_raw
        .map(|raw| Timestamp::parse(&raw))
        .transpose()
        .map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let completed_at = completed_at_raw
        .map(|raw| Timestamp::parse(&raw))
        .transpose()
        .map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let tags: Vec<String> =
        serde_json::from_str(&tags_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    Ok(Experiment { id, name, config, status, created_at, started_at, completed_at, tags })
}

/// Maps a `versions` row into a [`Version`].
fn map_version_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Version> {
    let id_raw: String = row.get(0)?;
    let experiment_id_raw: String = row.get(1)?;
    let parent_ids_raw: String = row.get(2)?;
    let created_at_raw: String = row.get(3)?;
    let generation: i64 = row.get(4)?;
    let payload_raw: Vec<u8> = row.get(5)?;

    let id = VersionId::new(id_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let experiment_id =
        ExperimentId::new(experiment_id_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let parent_ids: Vec<VersionId> =
        serde_json::from_str(&parent_ids_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let created_at =
        Timestamp::parse(&created_at_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let payload: BTreeMap<String, Vec<u8>> =
        serde_json::from_slice(&payload_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    Ok(Version {
        id,
        parent_ids,
        payload,
        created_at,
        generation: u32::try_from(generation).unwrap_or(0),
        experiment_id,
    })
}

/// Maps a `variants` row into a [`Variant`].
fn map_variant_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Variant> {
    let id_raw: String = row.get(0)?;
    let experiment_id_raw: String = row.get(1)?;
    let source: String = row.get(2)?;
    let tests_raw: String = row.get(3)?;
    let score: f64 = row.get(4)?;
    let parents_raw: String = row.get(5)?;
    let generation: i64 = row.get(6)?;
    let mutation_kind: String = row.get(7)?;
    let created_at_raw: String = row.get(8)?;

    let id = VariantId::new(id_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let experiment_id =
        ExperimentId::new(experiment_id_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let tests: Vec<String> =
        serde_json::from_str(&tests_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let parents: Vec<VariantId> =
        serde_json::from_str(&parents_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let created_at =
        Timestamp::parse(&created_at_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    Ok(Variant {
        id,
        source,
        tests,
        score,
        parents,
        generation: u32::try_from(generation).unwrap_or(0),
        mutation_kind,
        experiment_id,
        created_at,
    })
}

/// Maps a `rollback_records` row into a [`RollbackRecord`].
fn map_rollback_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RollbackRecord> {
    let from_version_id_raw: String = row.get(0)?;
    let to_version_id_raw: Option<String> = row.get(1)?;
    let to_checkpoint_id_raw: Option<String> = row.get(2)?;
    let trigger_raw: String = row.get(3)?;
    let outcome_raw: String = row.get(4)?;
    let versions_walked: i64 = row.get(5)?;
    let recorded_at_raw: String = row.get(6)?;
    let detail: String = row.get(7)?;

    let from_version_id =
        VersionId::new(from_version_id_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let to_version_id = to_version_id_raw
        .map(VersionId::new)
        .transpose()
        .map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let to_checkpoint_id = to_checkpoint_id_raw
        .map(evoseal_core::identifiers::CheckpointId::new)
        .transpose()
        .map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let trigger = parse_trigger(&trigger_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let outcome = parse_outcome(&outcome_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let recorded_at =
        Timestamp::parse(&recorded_at_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    Ok(RollbackRecord {
        from_version_id,
        to_version_id,
        to_checkpoint_id,
        trigger,
        outcome,
        versions_walked: u32::try_from(versions_walked).unwrap_or(0),
        recorded_at,
        detail,
    })
}

// ============================================================================
// SECTION: Label conversions
// ============================================================================

/// Returns the stable wire label for an [`ExperimentStatus`].
const fn status_label(status: ExperimentStatus) -> &'static str {
    match status {
        ExperimentStatus::Created => "created",
        ExperimentStatus::Running => "running",
        ExperimentStatus::Paused => "paused",
        ExperimentStatus::Completed => "completed",
        ExperimentStatus::Failed => "failed",
        ExperimentStatus::Cancelled => "cancelled",
    }
}

/// Parses a stored [`ExperimentStatus`] label.
fn parse_status(label: &str) -> Result<ExperimentStatus, StoreError> {
    match label {
        "created" => Ok(ExperimentStatus::Created),
        "running" => Ok(ExperimentStatus::Running),
        "paused" => Ok(ExperimentStatus::Paused),
        "completed" => Ok(ExperimentStatus::Completed),
        "failed" => Ok(ExperimentStatus::Failed),
        "cancelled" => Ok(ExperimentStatus::Cancelled),
        other => Err(StoreError::Corrupt(format!("unknown experiment status: {other}"))),
    }
}

/// Returns the stable wire label for a [`RollbackTrigger`].
const fn trigger_label(trigger: RollbackTrigger) -> &'static str {
    match trigger {
        RollbackTrigger::RegressionDetected => "regression_detected",
        RollbackTrigger::StepFailureRecovery => "step_failure_recovery",
        RollbackTrigger::ManualRequest => "manual_request",
        RollbackTrigger::ResourceAlert => "resource_alert",
    }
}

/// Parses a stored [`RollbackTrigger`] label.
fn parse_trigger(label: &str) -> Result<RollbackTrigger, StoreError> {
    match label {
        "regression_detected" => Ok(RollbackTrigger::RegressionDetected),
        "step_failure_recovery" => Ok(RollbackTrigger::StepFailureRecovery),
        "manual_request" => Ok(RollbackTrigger::ManualRequest),
        "resource_alert" => Ok(RollbackTrigger::ResourceAlert),
        other => Err(StoreError::Corrupt(format!("unknown rollback trigger: {other}"))),
    }
}

/// Returns the stable wire label for a [`RollbackOutcome`].
const fn outcome_label(outcome: RollbackOutcome) -> &'static str {
    match outcome {
        RollbackOutcome::Succeeded => "succeeded",
        RollbackOutcome::NoKnownGoodVersion => "no_known_good_version",
        RollbackOutcome::IntegrityCheckFailed => "integrity_check_failed",
        RollbackOutcome::Aborted => "aborted",
    }
}

/// Parses a stored [`RollbackOutcome`] label.
fn parse_outcome(label: &str) -> Result<RollbackOutcome, StoreError> {
    match label {
        "succeeded" => Ok(RollbackOutcome::Succeeded),
        "no_known_good_version" => Ok(RollbackOutcome::NoKnownGoodVersion),
        "integrity_check_failed" => Ok(RollbackOutcome::IntegrityCheckFailed),
        "aborted" => Ok(RollbackOutcome::Aborted),
        other => Err(StoreError::Corrupt(format!("unknown rollback outcome: {other}"))),
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
    use std::collections::BTreeMap;

    use evoseal_core::identifiers::CheckpointId;

    use super::*;

    fn sample_experiment(id: &str) -> Experiment {
        Experiment {
            id: ExperimentId::new(id).expect("valid"),
            name: "exp".to_string(),
            config: String::new(),
            status: ExperimentStatus::Created,
            created_at: Timestamp::now(),
            started_at: None,
            completed_at: None,
            tags: vec!["nightly".to_string()],
        }
    }

    fn sample_version(id: &str, experiment_id: &str) -> Version {
        Version {
            id: VersionId::new(id).expect("valid"),
            parent_ids: vec![],
            payload: BTreeMap::new(),
            created_at: Timestamp::now(),
            generation: 0,
            experiment_id: ExperimentId::new(experiment_id).expect("valid"),
        }
    }

    fn sample_variant(id: &str, experiment_id: &str, score: f64, parents: Vec<VariantId>) -> Variant {
        Variant {
            id: VariantId::new(id).expect("valid"),
            source: "source".to_string(),
            tests: vec!["unit::smoke".to_string()],
            score,
            parents,
            generation: 0,
            mutation_kind: "mutation".to_string(),
            experiment_id: ExperimentId::new(experiment_id).expect("valid"),
            created_at: Timestamp::now(),
        }
    }

    #[test]
    fn save_then_get_experiment_round_trips() {
        let store = EvoStore::open_in_memory().expect("open");
        let experiment = sample_experiment("e1");
        store.save_experiment(&experiment).expect("save");
        let fetched = store.get_experiment(&experiment.id).expect("get").expect("present");
        assert_eq!(fetched, experiment);
    }

    #[test]
    fn list_experiments_filters_by_tag() {
        let store = EvoStore::open_in_memory().expect("open");
        store.save_experiment(&sample_experiment("e1")).expect("save");
        let mut other = sample_experiment("e2");
        other.tags = vec!["weekly".to_string()];
        store.save_experiment(&other).expect("save");

        let filter = ExperimentFilter { status: None, tag: Some("nightly".to_string()) };
        let matched = store.list_experiments(&filter).expect("list");
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.as_str(), "e1");
    }

    #[test]
    fn save_version_rejects_conflicting_reuse() {
        let store = EvoStore::open_in_memory().expect("open");
        let version = sample_version("v1", "e1");
        store.save_version(&version).expect("first save");
        let mut conflicting = version.clone();
        conflicting.generation = 1;
        assert!(store.save_version(&conflicting).is_err());
    }

    #[test]
    fn get_best_orders_by_score_descending() {
        let store = EvoStore::open_in_memory().expect("open");
        let experiment_id = ExperimentId::new("e1").expect("valid");
        store.add_variant(&sample_variant("var_1", "e1", 0.2, vec![])).expect("add");
        store.add_variant(&sample_variant("var_2", "e1", 0.9, vec![])).expect("add");
        let best = store.get_best(&experiment_id, 1).expect("get_best");
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].id.as_str(), "var_2");
    }

    #[test]
    fn get_lineage_walks_transitive_parents() {
        let store = EvoStore::open_in_memory().expect("open");
        store.add_variant(&sample_variant("var_1", "e1", 0.1, vec![])).expect("add root");
        let parent = VariantId::new("var_1").expect("valid");
        store.add_variant(&sample_variant("var_2", "e1", 0.2, vec![parent])).expect("add child");
        let child = VariantId::new("var_2").expect("valid");
        let lineage = store.get_lineage(&child).expect("lineage");
        assert_eq!(lineage.len(), 1);
        assert_eq!(lineage[0].id.as_str(), "var_1");
    }

    #[test]
    fn list_checkpoints_joins_on_version_experiment() {
        let store = EvoStore::open_in_memory().expect("open");
        let version = sample_version("v1", "e1");
        store.save_version(&version).expect("save version");
        let guard = store.connection.lock().expect("lock");
        guard
            .execute(
                "INSERT INTO checkpoints (
                    checkpoint_id, version_id, created_at, checkpoint_kind, content_hash,
                    payload_location, metadata_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    CheckpointId::generate().as_str(),
                    "v1",
                    Timestamp::now().to_rfc3339(),
                    "automatic",
                    "deadbeef",
                    "v1/payload",
                    "{}",
                ],
            )
            .expect("insert checkpoint");
        drop(guard);
        let experiment_id = ExperimentId::new("e1").expect("valid");
        let checkpoints = store.list_checkpoints(&experiment_id).expect("list");
        assert_eq!(checkpoints.len(), 1);
    }

    #[test]
    fn rollback_history_round_trips() {
        let store = EvoStore::open_in_memory().expect("open");
        let record = RollbackRecord {
            from_version_id: VersionId::new("v2").expect("valid"),
            to_version_id: Some(VersionId::new("v1").expect("valid")),
            to_checkpoint_id: None,
            trigger: RollbackTrigger::RegressionDetected,
            outcome: RollbackOutcome::Succeeded,
            versions_walked: 1,
            recorded_at: Timestamp::now(),
            detail: "demo".to_string(),
        };
        store.record_rollback(&record).expect("record");
        let history = store.rollback_history().expect("history");
        assert_eq!(history.len(), 1);
        assert!(history[0].succeeded());
    }
}
