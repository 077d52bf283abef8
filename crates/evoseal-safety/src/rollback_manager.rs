// crates/evoseal-safety/src/rollback_manager.rs
// ============================================================================
// Module: Rollback Manager (C5)
// Description: Restores a known-good version's checkpoint, walking parent
//              history when the immediate target is unusable.
// Purpose: The only component that mutates the working version backward.
// Dependencies: evoseal-core, evoseal-store
// ============================================================================

//! ## Overview
//! `rollback_to` is the primitive every other operation composes:
//! `auto_rollback_on_failure` decides *whether* to call it from test/
//! regression outcomes, `cascading_rollback` repeats it while walking
//! `parent_ids[0]`, and `emergency_rollback` calls it with a fixed
//! [`RollbackTrigger::ManualRequest`] after bypassing the normal policy gate.

use std::path::Path;
use std::sync::Mutex;

use evoseal_core::identifiers::VersionId;
use evoseal_core::model::RegressionReport;
use evoseal_core::model::RollbackOutcome;
use evoseal_core::model::RollbackRecord;
use evoseal_core::model::RollbackTrigger;
use evoseal_core::model::TestOutcome;
use evoseal_core::time::Timestamp;
use evoseal_config::RollbackPolicyConfig;
use evoseal_store::CheckpointStore;
use evoseal_store::EvoStore;

use crate::error::SafetyError;

/// Restores known-good versions and records every attempt.
pub struct RollbackManager {
    store: EvoStore,
    checkpoints: CheckpointStore,
    policy: Mutex<RollbackPolicyConfig>,
    attempts_used: Mutex<u32>,
}

impl RollbackManager {
    /// Builds a manager over `store`/`checkpoints` using `policy`.
    #[must_use]
    pub fn new(store: EvoStore, checkpoints: CheckpointStore, policy: RollbackPolicyConfig) -> Self {
        Self { store, checkpoints, policy: Mutex::new(policy), attempts_used: Mutex::new(0) }
    }

    /// Replaces the active rollback policy.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::PolicyRejected`] when the new policy fails
    /// [`RollbackPolicyConfig::validate`].
    pub fn set_policy(&self, policy: RollbackPolicyConfig) -> Result<(), SafetyError> {
        policy.validate().map_err(|err| SafetyError::PolicyRejected(err.to_string()))?;
        let mut guard = self.policy.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = policy;
        Ok(())
    }

    /// Returns the currently active policy.
    #[must_use]
    pub fn policy(&self) -> RollbackPolicyConfig {
        *self.policy.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Restores `from_version_id` to `target_version_id`'s checkpoint under
    /// `working_dir`, recording the attempt regardless of outcome.
    ///
    /// Procedure:
    /// 1. check the policy gate (`auto_enabled`, attempt budget),
    /// 2. restore `target_version_id`'s checkpoint into `working_dir`,
    /// 3. re-verify the restored payload is non-empty,
    /// 4. persist a [`RollbackRecord`],
    /// 5. return the record.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::Store`] when the store or checkpoint
    /// filesystem operation fails outright (not merely "no checkpoint
    /// found", which is recorded as [`RollbackOutcome::NoKnownGoodVersion`]).
    pub fn rollback_to(
        &self,
        from_version_id: &VersionId,
        target_version_id: &VersionId,
        working_dir: &Path,
        trigger: RollbackTrigger,
    ) -> Result<RollbackRecord, SafetyError> {
        if let Err(err) = self.check_policy_gate(trigger) {
            return Ok(self.record(from_version_id, None, None, trigger, RollbackOutcome::Aborted, 0, &err.to_string())?);
        }

        let checkpoint_record = self.checkpoints.get(&self.store, target_version_id)?;
        let Some(checkpoint_record) = checkpoint_record else {
            return Ok(self.record(
                from_version_id,
                None,
                None,
                trigger,
                RollbackOutcome::NoKnownGoodVersion,
                0,
                &format!("no checkpoint recorded for {target_version_id}"),
            )?);
        };

        let restore_result = self.checkpoints.restore(&self.store, target_version_id, working_dir);
        let record = match restore_result {
            Ok(outcome) if outcome.payload.is_empty() => self.record(
                from_version_id,
                Some(target_version_id.clone()),
                Some(checkpoint_record.id.clone()),
                trigger,
                RollbackOutcome::IntegrityCheckFailed,
                1,
                "restored payload was empty",
            )?,
            Ok(_outcome) => self.record(
                from_version_id,
                Some(target_version_id.clone()),
                Some(checkpoint_record.id.clone()),
                trigger,
                RollbackOutcome::Succeeded,
                1,
                "restored successfully",
            )?,
            Err(err) => self.record(
                from_version_id,
                Some(target_version_id.clone()),
                Some(checkpoint_record.id),
                trigger,
                RollbackOutcome::IntegrityCheckFailed,
                1,
                &err.to_string(),
            )?,
        };

        if record.succeeded() {
            let mut used = self.attempts_used.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            *used += 1;
        }
        Ok(record)
    }

    /// Rolls `candidate_version_id` back to its baseline when `test_results`
    /// contains a failure, or when `regression_report` is critical.
    ///
    /// Returns `None` when neither condition holds: no rollback was
    /// attempted.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError`] as [`Self::rollback_to`] does.
    pub fn auto_rollback_on_failure(
        &self,
        baseline_version_id: &VersionId,
        candidate_version_id: &VersionId,
        working_dir: &Path,
        test_results: &[TestOutcome],
        regression_report: Option<&RegressionReport>,
    ) -> Result<Option<RollbackRecord>, SafetyError> {
        let tests_failed = TestOutcome::any_failed(test_results);
        let regression = regression_report.is_some_and(|report| report.is_critical);
        if !tests_failed && !regression {
            return Ok(None);
        }
        let trigger = if regression { RollbackTrigger::RegressionDetected } else { RollbackTrigger::StepFailureRecovery };
        self.rollback_to(candidate_version_id, baseline_version_id, working_dir, trigger).map(Some)
    }

    /// Walks `parent_ids[0]` starting at `from_version_id`, attempting a
    /// rollback to each ancestor in turn until one succeeds or
    /// `max_attempts` (from the active policy) is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::Store`] on an underlying store failure, or
    /// [`SafetyError::NoKnownGoodVersion`] once every ancestor within the
    /// attempt budget has been exhausted without success.
    pub fn cascading_rollback(&self, from_version_id: &VersionId, working_dir: &Path) -> Result<RollbackRecord, SafetyError> {
        let policy = self.policy();
        if !policy.enable_cascading {
            return Err(SafetyError::PolicyRejected("cascading rollback is disabled".to_string()));
        }

        let mut current = self.store.get_version(from_version_id)?.ok_or_else(|| {
            SafetyError::NoKnownGoodVersion(format!("version {from_version_id} not found"))
        })?;
        let mut walked = 0_u32;

        while walked < policy.max_attempts {
            let Some(parent_id) = current.primary_parent().cloned() else {
                break;
            };
            let record = self.rollback_to(from_version_id, &parent_id, working_dir, RollbackTrigger::RegressionDetected)?;
            walked += 1;
            if record.succeeded() {
                return Ok(record);
            }
            current = self.store.get_version(&parent_id)?.ok_or_else(|| {
                SafetyError::NoKnownGoodVersion(format!("version {parent_id} not found"))
            })?;
        }

        Err(SafetyError::NoKnownGoodVersion(format!(
            "exhausted {walked} cascading attempts from {from_version_id}"
        )))
    }

    /// Restores `target_version_id` unconditionally, bypassing the policy
    /// gate and attempt budget, for operator-initiated emergency recovery.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::Store`] when the store or checkpoint
    /// filesystem operation fails outright.
    pub fn emergency_rollback(&self, from_version_id: &VersionId, target_version_id: &VersionId, working_dir: &Path) -> Result<RollbackRecord, SafetyError> {
        let checkpoint_record = self
            .checkpoints
            .get(&self.store, target_version_id)?
            .ok_or_else(|| SafetyError::NoKnownGoodVersion(format!("no checkpoint recorded for {target_version_id}")))?;
        let outcome = self.checkpoints.restore(&self.store, target_version_id, working_dir)?;
        let result_outcome = if outcome.payload.is_empty() { RollbackOutcome::IntegrityCheckFailed } else { RollbackOutcome::Succeeded };
        self.record(
            from_version_id,
            Some(target_version_id.clone()),
            Some(checkpoint_record.id),
            RollbackTrigger::ManualRequest,
            result_outcome,
            1,
            "emergency rollback bypassed policy gate",
        )
    }

    /// Returns every version with a recorded checkpoint within `experiment`,
    /// ordered most-recent-first, as candidates for cascading or manual
    /// rollback.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::Store`] on an underlying store failure.
    pub fn find_known_good_versions(&self, experiment_id: &evoseal_core::identifiers::ExperimentId) -> Result<Vec<VersionId>, SafetyError> {
        let mut records = self.store.list_checkpoints(experiment_id)?;
        records.sort_by(|a, b| b.checkpoint.created_at.cmp(&a.checkpoint.created_at));
        Ok(records.into_iter().map(|record| record.checkpoint.version_id).collect())
    }

    /// Returns the full rollback audit log, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::Store`] on an underlying store failure.
    pub fn history(&self) -> Result<Vec<RollbackRecord>, SafetyError> {
        Ok(self.store.rollback_history()?)
    }

    /// Checks that rollback is currently permitted under the active policy.
    fn check_policy_gate(&self, trigger: RollbackTrigger) -> Result<(), SafetyError> {
        let policy = self.policy();
        if !policy.auto_enabled {
            return Err(SafetyError::PolicyRejected("automatic rollback is disabled".to_string()));
        }
        if trigger == RollbackTrigger::StepFailureRecovery && !policy.enable_failure_recovery {
            return Err(SafetyError::PolicyRejected("failure-recovery rollback is disabled".to_string()));
        }
        let used = *self.attempts_used.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if used >= policy.max_attempts {
            return Err(SafetyError::PolicyRejected(format!("rollback attempt budget ({}) exhausted", policy.max_attempts)));
        }
        Ok(())
    }

    /// Builds and persists one [`RollbackRecord`].
    #[allow(clippy::too_many_arguments, reason = "every field maps one-to-one onto RollbackRecord's shape")]
    fn record(
        &self,
        from_version_id: &VersionId,
        to_version_id: Option<VersionId>,
        to_checkpoint_id: Option<evoseal_core::identifiers::CheckpointId>,
        trigger: RollbackTrigger,
        outcome: RollbackOutcome,
        versions_walked: u32,
        detail: &str,
    ) -> Result<RollbackRecord, SafetyError> {
        let record = RollbackRecord {
            from_version_id: from_version_id.clone(),
            to_version_id,
            to_checkpoint_id,
            trigger,
            outcome,
            versions_walked,
            recorded_at: Timestamp::now(),
            detail: detail.to_string(),
        };
        self.store.record_rollback(&record)?;
        Ok(record)
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
    use evoseal_core::model::TestStatus;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn sample_manager(dir: &std::path::Path) -> (RollbackManager, EvoStore) {
        let store = EvoStore::open_in_memory().expect("open");
        let checkpoints = CheckpointStore::new(dir.join("checkpoints"));
        let manager = RollbackManager::new(store.clone(), checkpoints, RollbackPolicyConfig::default());
        (manager, store)
    }

    fn checkpoint_payload() -> BTreeMap<String, Vec<u8>> {
        let mut payload = BTreeMap::new();
        payload.insert("src/main.rs".to_string(), b"fn main() {}".to_vec());
        payload
    }

    #[test]
    fn rollback_to_missing_checkpoint_records_no_known_good_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (manager, _store) = sample_manager(dir.path());
        let from = VersionId::new("v2").expect("valid");
        let target = VersionId::new("v1").expect("valid");
        let record = manager.rollback_to(&from, &target, &dir.path().join("work"), RollbackTrigger::ManualRequest).expect("rollback");
        assert_eq!(record.outcome, RollbackOutcome::NoKnownGoodVersion);
        assert!(!record.succeeded());
    }

    #[test]
    fn rollback_to_existing_checkpoint_succeeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (manager, store) = sample_manager(dir.path());
        let target = VersionId::new("v1").expect("valid");
        let checkpoints = CheckpointStore::new(dir.path().join("checkpoints"));
        checkpoints
            .create(&store, &target, &checkpoint_payload(), evoseal_core::model::CheckpointKind::Automatic, BTreeMap::new())
            .expect("create");

        let from = VersionId::new("v2").expect("valid");
        let record = manager
            .rollback_to(&from, &target, &dir.path().join("work"), RollbackTrigger::RegressionDetected)
            .expect("rollback");
        assert!(record.succeeded());
        assert_eq!(record.to_version_id, Some(target));
    }

    #[test]
    fn policy_disabled_rejects_rollback() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (manager, _store) = sample_manager(dir.path());
        manager
            .set_policy(RollbackPolicyConfig { auto_enabled: false, ..RollbackPolicyConfig::default() })
            .expect("set policy");
        let from = VersionId::new("v2").expect("valid");
        let target = VersionId::new("v1").expect("valid");
        let record = manager.rollback_to(&from, &target, &dir.path().join("work"), RollbackTrigger::ManualRequest).expect("rollback");
        assert_eq!(record.outcome, RollbackOutcome::Aborted);
    }

    #[test]
    fn auto_rollback_skips_when_nothing_failed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (manager, _store) = sample_manager(dir.path());
        let baseline = VersionId::new("v1").expect("valid");
        let candidate = VersionId::new("v2").expect("valid");
        let outcome = manager
            .auto_rollback_on_failure(&baseline, &candidate, &dir.path().join("work"), &[], None)
            .expect("auto rollback");
        assert!(outcome.is_none());
    }

    #[test]
    fn auto_rollback_triggers_on_test_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (manager, store) = sample_manager(dir.path());
        let baseline = VersionId::new("v1").expect("valid");
        let candidate = VersionId::new("v2").expect("valid");
        let checkpoints = CheckpointStore::new(dir.path().join("checkpoints"));
        checkpoints
            .create(&store, &baseline, &checkpoint_payload(), evoseal_core::model::CheckpointKind::Automatic, BTreeMap::new())
            .expect("create");
        let failing = vec![TestOutcome { name: "acceptance".to_string(), status: TestStatus::Fail, detail: "boom".to_string() }];
        let outcome = manager
            .auto_rollback_on_failure(&baseline, &candidate, &dir.path().join("work"), &failing, None)
            .expect("auto rollback")
            .expect("a rollback attempt happened");
        assert!(outcome.succeeded());
    }

    #[test]
    fn emergency_rollback_bypasses_attempt_budget() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (manager, store) = sample_manager(dir.path());
        manager
            .set_policy(RollbackPolicyConfig { max_attempts: 1, ..RollbackPolicyConfig::default() })
            .expect("set policy");
        let target = VersionId::new("v1").expect("valid");
        let checkpoints = CheckpointStore::new(dir.path().join("checkpoints"));
        checkpoints
            .create(&store, &target, &checkpoint_payload(), evoseal_core::model::CheckpointKind::Emergency, BTreeMap::new())
            .expect("create");
        let from = VersionId::new("v2").expect("valid");
        let work: PathBuf = dir.path().join("work");
        // Exhaust the single allowed attempt first.
        manager.rollback_to(&from, &target, &work, RollbackTrigger::RegressionDetected).expect("first rollback");
        let record = manager.emergency_rollback(&from, &target, &work).expect("emergency rollback");
        assert!(record.succeeded());
    }
}
