// crates/evoseal-store/src/checkpoints.rs
// ============================================================================
// Module: Checkpoint Store
// Description: Content-addressed, integrity-verified version payload snapshots.
// Purpose: Implement the Checkpoint Store contract (create/restore/list/
//          delete/cleanup) per the on-disk layout
//          `<checkpoint_dir>/<version_id>/{metadata.json,payload/}`.
// Dependencies: evoseal-core, serde_json
// ============================================================================

//! ## Overview
//! Each version gets exactly one checkpoint directory,
//! `<checkpoint_dir>/<version_id>/`, since [`evoseal_core::model::Version`]
//! is immutable once created: re-checkpointing the same version overwrites
//! identical bytes. `metadata.json` is written atomically (temp file,
//! fsync, rename) so a crash mid-write never leaves a half-written file
//! where a reader expects a complete one. `restore` never writes outside
//! its `target_dir` and redirects away from protected paths (§4.3 safety
//! invariant 1) rather than ever writing into them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use evoseal_core::hashing::HexDigest;
use evoseal_core::hashing::hash_payload_tree;
use evoseal_core::identifiers::CheckpointId;
use evoseal_core::identifiers::VersionId;
use evoseal_core::model::Checkpoint;
use evoseal_core::model::CheckpointKind;
use evoseal_core::time::Timestamp;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;

use crate::connection::EvoStore;
use crate::error::StoreError;

/// Fallback subdirectory name used when a restore target is protected.
const ROLLBACK_FALLBACK_DIR: &str = ".rollback_target";

/// A [`Checkpoint`] paired with the opaque identifier `create` returned for
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRecord {
    /// Opaque handle returned by [`CheckpointStore::create`].
    pub id: CheckpointId,
    /// The checkpoint's metadata.
    pub checkpoint: Checkpoint,
}

/// The on-disk `metadata.json` shape, written atomically per checkpoint.
#[derive(Debug, Serialize, Deserialize)]
struct DiskMetadata {
    /// Version this checkpoint snapshots.
    version_id: String,
    /// RFC 3339 creation timestamp.
    created_at_iso: String,
    /// Reason this checkpoint was created.
    kind: String,
    /// Lowercase-hex SHA-256 over the canonical payload tree.
    content_hash_hex: String,
    /// Opaque operator-supplied metadata.
    metadata: BTreeMap<String, String>,
}

/// Result of a restore attempt, reporting whether the requested target was
/// redirected away from a protected path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOutcome {
    /// Directory the payload was actually written to.
    pub written_to: PathBuf,
    /// Restored payload, keyed by checkpoint-relative path.
    pub payload: BTreeMap<String, Vec<u8>>,
    /// Whether `written_to` differs from the originally requested target
    /// because that target was protected.
    pub redirected: bool,
}

/// Filesystem root under which every checkpoint directory lives.
#[derive(Clone)]
pub struct CheckpointStore {
    /// `<checkpoint_dir>` configured for this process.
    root: PathBuf,
}

impl CheckpointStore {
    /// Creates a checkpoint store rooted at `checkpoint_dir`.
    #[must_use]
    pub fn new(checkpoint_dir: PathBuf) -> Self {
        Self { root: checkpoint_dir }
    }

    /// Creates (or overwrites, if one already exists for `version_id`) a
    /// checkpoint of `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the payload tree cannot be hashed, the
    /// filesystem write fails, or the database record cannot be written.
    pub fn create(
        &self,
        store: &EvoStore,
        version_id: &VersionId,
        payload: &BTreeMap<String, Vec<u8>>,
        kind: CheckpointKind,
        metadata: BTreeMap<String, String>,
    ) -> Result<CheckpointId, StoreError> {
        let content_hash =
            hash_payload_tree(payload).map_err(|err| StoreError::Invalid(err.to_string()))?;
        let version_dir = self.root.join(version_id.as_str());
        let payload_dir = version_dir.join("payload");
        fs::create_dir_all(&payload_dir).map_err(|err| StoreError::Io(err.to_string()))?;
        for (relative_path, bytes) in payload {
            write_payload_file(&payload_dir, relative_path, bytes)?;
        }
        let created_at = Timestamp::now();
        let disk_metadata = DiskMetadata {
            version_id: version_id.as_str().to_string(),
            created_at_iso: created_at.to_rfc3339(),
            kind: kind_label(kind).to_string(),
            content_hash_hex: content_hash.as_str().to_string(),
            metadata: metadata.clone(),
        };
        write_atomic(
            &version_dir.join("metadata.json"),
            serde_json::to_vec_pretty(&disk_metadata)
                .map_err(|err| StoreError::Invalid(err.to_string()))?,
        )?;

        let checkpoint_id = CheckpointId::generate();
        let payload_location = format!("{}/payload", version_id.as_str());
        let guard = store.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        guard
            .execute(
                "INSERT INTO checkpoints (
                    checkpoint_id, version_id, created_at, checkpoint_kind, content_hash,
                    payload_location, metadata_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(version_id) DO UPDATE SET
                    checkpoint_id = excluded.checkpoint_id,
                    created_at = excluded.created_at,
                    checkpoint_kind = excluded.checkpoint_kind,
                    content_hash = excluded.content_hash,
                    payload_location = excluded.payload_location,
                    metadata_json = excluded.metadata_json",
                params![
                    checkpoint_id.as_str(),
                    version_id.as_str(),
                    created_at.to_rfc3339(),
                    kind_label(kind),
                    content_hash.as_str(),
                    payload_location,
                    serde_json::to_string(&metadata).map_err(|err| StoreError::Invalid(err.to_string()))?,
                ],
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        Ok(checkpoint_id)
    }

    /// Restores `version_id`'s payload into `target_dir`, re-verifying its
    /// content hash.
    ///
    /// Per the §4.3 safety invariant, a `target_dir` that is the process
    /// working directory, an ancestor of it, or a configured protected
    /// path is silently redirected to a fallback subpath under this store's
    /// root; the caller observes this via [`RestoreOutcome::redirected`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no checkpoint exists for
    /// `version_id`, or [`StoreError::Corrupt`] when the stored content
    /// hash does not match the payload on disk.
    pub fn restore(
        &self,
        store: &EvoStore,
        version_id: &VersionId,
        target_dir: &Path,
    ) -> Result<RestoreOutcome, StoreError> {
        let record = self
            .get(store, version_id)?
            .ok_or_else(|| StoreError::NotFound(format!("no checkpoint for version {version_id}")))?;
        let version_dir = self.root.join(version_id.as_str());
        let payload_dir = version_dir.join("payload");
        let payload = read_payload_tree(&payload_dir)?;
        let recomputed =
            hash_payload_tree(&payload).map_err(|err| StoreError::Invalid(err.to_string()))?;
        if recomputed != record.checkpoint.content_hash {
            return Err(StoreError::Corrupt(format!(
                "content hash mismatch restoring version {version_id}"
            )));
        }
        let (effective_target, redirected) = guard_restore_target(target_dir, &self.root, version_id);
        fs::create_dir_all(&effective_target).map_err(|err| StoreError::Io(err.to_string()))?;
        for (relative_path, bytes) in &payload {
            write_payload_file(&effective_target, relative_path, bytes)?;
        }
        Ok(RestoreOutcome { written_to: effective_target, payload, redirected })
    }

    /// Returns checkpoints matching `kind_filter`, or every checkpoint when
    /// `kind_filter` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on an underlying database failure.
    pub fn list(
        &self,
        store: &EvoStore,
        kind_filter: Option<CheckpointKind>,
    ) -> Result<Vec<CheckpointRecord>, StoreError> {
        let guard = store.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        let mut statement = guard
            .prepare(
                "SELECT checkpoint_id, version_id, created_at, checkpoint_kind, content_hash,
                        payload_location, metadata_json
                 FROM checkpoints ORDER BY created_at ASC",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map([], map_checkpoint_row)
            .map_err(|err| StoreError::Db(err.to_string()))?;
        let mut records = Vec::new();
        for row in rows {
            let record = row.map_err(|err| StoreError::Db(err.to_string()))?;
            if kind_filter.is_none_or(|kind| kind == record.checkpoint.checkpoint_kind) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Returns the checkpoint for `version_id`, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on an underlying database failure.
    pub fn get(
        &self,
        store: &EvoStore,
        version_id: &VersionId,
    ) -> Result<Option<CheckpointRecord>, StoreError> {
        let guard = store.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
        guard
            .query_row(
                "SELECT checkpoint_id, version_id, created_at, checkpoint_kind, content_hash,
                        payload_location, metadata_json
                 FROM checkpoints WHERE version_id = ?1",
                params![version_id.as_str()],
                map_checkpoint_row,
            )
            .optional()
            .map_err(|err| StoreError::Db(err.to_string()))
    }

    /// Deletes the checkpoint for `version_id`, both its database row and
    /// its on-disk directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the database delete or filesystem
    /// removal fails.
    pub fn delete(&self, store: &EvoStore, version_id: &VersionId) -> Result<bool, StoreError> {
        let deleted = {
            let guard =
                store.connection.lock().map_err(|_err| StoreError::Db("mutex poisoned".to_string()))?;
            guard
                .execute("DELETE FROM checkpoints WHERE version_id = ?1", params![version_id.as_str()])
                .map_err(|err| StoreError::Db(err.to_string()))?
        };
        let version_dir = self.root.join(version_id.as_str());
        if version_dir.exists() {
            fs::remove_dir_all(&version_dir).map_err(|err| StoreError::Io(err.to_string()))?;
        }
        Ok(deleted > 0)
    }

    /// Prunes checkpoints beyond `keep_count` most recent, never deleting a
    /// checkpoint whose kind is in `retain_kinds`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing or deleting fails.
    pub fn cleanup(
        &self,
        store: &EvoStore,
        keep_count: usize,
        retain_kinds: &[CheckpointKind],
    ) -> Result<Vec<VersionId>, StoreError> {
        let mut records = self.list(store, None)?;
        records.sort_by(|a, b| b.checkpoint.created_at.cmp(&a.checkpoint.created_at));
        let mut removed = Vec::new();
        for record in records.into_iter().skip(keep_count) {
            if retain_kinds.contains(&record.checkpoint.checkpoint_kind)
                || record.checkpoint.checkpoint_kind.is_retained_by_default()
            {
                continue;
            }
            self.delete(store, &record.checkpoint.version_id)?;
            removed.push(record.checkpoint.version_id);
        }
        Ok(removed)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Writes a single payload file under `payload_dir`, creating any
/// intermediate directories `relative_path` names.
fn write_payload_file(payload_dir: &Path, relative_path: &str, bytes: &[u8]) -> Result<(), StoreError> {
    let relative = Path::new(relative_path);
    if relative.components().any(|component| matches!(component, Component::ParentDir)) {
        return Err(StoreError::Invalid(format!("payload path escapes checkpoint: {relative_path}")));
    }
    let full_path = payload_dir.join(relative);
    if let Some(parent) = full_path.parent() {
        fs::create_dir_all(parent).map_err(|err| StoreError::Io(err.to_string()))?;
    }
    write_atomic(&full_path, bytes.to_vec())
}

/// Writes `bytes` to `path` atomically: write to a sibling temp file, fsync,
/// rename over the destination, then fsync the parent directory so the
/// rename itself is durable.
fn write_atomic(path: &Path, bytes: Vec<u8>) -> Result<(), StoreError> {
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path).map_err(|err| StoreError::Io(err.to_string()))?;
    file.write_all(&bytes).map_err(|err| StoreError::Io(err.to_string()))?;
    file.sync_all().map_err(|err| StoreError::Io(err.to_string()))?;
    drop(file);
    fs::rename(&temp_path, path).map_err(|err| StoreError::Io(err.to_string()))?;
    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ignored = dir.sync_all();
        }
    }
    Ok(())
}

/// Reads every file under `payload_dir` back into a payload tree, keyed by
/// its path relative to `payload_dir`.
fn read_payload_tree(payload_dir: &Path) -> Result<BTreeMap<String, Vec<u8>>, StoreError> {
    let mut payload = BTreeMap::new();
    if !payload_dir.exists() {
        return Ok(payload);
    }
    let mut stack = vec![payload_dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).map_err(|err| StoreError::Io(err.to_string()))? {
            let entry = entry.map_err(|err| StoreError::Io(err.to_string()))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let relative = path
                .strip_prefix(payload_dir)
                .map_err(|err| StoreError::Invalid(err.to_string()))?
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, "/");
            let bytes = fs::read(&path).map_err(|err| StoreError::Io(err.to_string()))?;
            payload.insert(relative, bytes);
        }
    }
    Ok(payload)
}

/// Resolves the effective restore target, redirecting away from protected
/// paths per the §4.3 safety invariant.
fn guard_restore_target(
    requested: &Path,
    checkpoint_root: &Path,
    version_id: &VersionId,
) -> (PathBuf, bool) {
    if is_protected_target(requested) {
        let fallback = checkpoint_root.join(ROLLBACK_FALLBACK_DIR).join(version_id.as_str());
        (fallback, true)
    } else {
        (requested.to_path_buf(), false)
    }
}

/// Returns whether `target` is the process working directory, an ancestor
/// of it, or a well-known protected system path.
fn is_protected_target(target: &Path) -> bool {
    const PROTECTED: &[&str] = &["/", "/root", "/home", "/usr", "/etc", "/bin", "/sbin", "/var"];
    if PROTECTED.iter().any(|protected| target == Path::new(protected)) {
        return true;
    }
    let Ok(cwd) = std::env::current_dir() else {
        return false;
    };
    cwd.starts_with(target)
}

/// Maps a `checkpoints` row into a [`CheckpointRecord`].
///
/// Shared with `versions.rs`, which joins `checkpoints` against `versions`
/// to answer `list_checkpoints(experiment_id)`.
pub(crate) fn map_checkpoint_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CheckpointRecord> {
    let checkpoint_id_raw: String = row.get(0)?;
    let version_id_raw: String = row.get(1)?;
    let created_at_raw: String = row.get(2)?;
    let kind_raw: String = row.get(3)?;
    let content_hash_raw: String = row.get(4)?;
    let payload_location: String = row.get(5)?;
    let metadata_raw: String = row.get(6)?;

    let checkpoint_id = CheckpointId::new(checkpoint_id_raw)
        .map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let version_id = VersionId::new(version_id_raw)
        .map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let created_at = Timestamp::parse(&created_at_raw)
        .map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let checkpoint_kind =
        parse_kind(&kind_raw).map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata_raw)
        .map_err(|err| rusqlite::Error::InvalidColumnName(err.to_string()))?;
    Ok(CheckpointRecord {
        id: checkpoint_id,
        checkpoint: Checkpoint {
            version_id,
            created_at,
            checkpoint_kind,
            content_hash: HexDigest::from_hex(content_hash_raw),
            payload_location,
            metadata,
        },
    })
}

/// Returns the stable wire label for a [`CheckpointKind`].
const fn kind_label(kind: CheckpointKind) -> &'static str {
    match kind {
        CheckpointKind::Manual => "manual",
        CheckpointKind::Automatic => "automatic",
        CheckpointKind::Milestone => "milestone",
        CheckpointKind::PreRecovery => "pre_recovery",
        CheckpointKind::PostRecovery => "post_recovery",
        CheckpointKind::Emergency => "emergency",
    }
}

/// Parses a stored [`CheckpointKind`] label.
fn parse_kind(label: &str) -> Result<CheckpointKind, StoreError> {
    match label {
        "manual" => Ok(CheckpointKind::Manual),
        "automatic" => Ok(CheckpointKind::Automatic),
        "milestone" => Ok(CheckpointKind::Milestone),
        "pre_recovery" => Ok(CheckpointKind::PreRecovery),
        "post_recovery" => Ok(CheckpointKind::PostRecovery),
        "emergency" => Ok(CheckpointKind::Emergency),
        other => Err(StoreError::Corrupt(format!("unknown checkpoint kind: {other}"))),
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

    fn sample_payload() -> BTreeMap<String, Vec<u8>> {
        let mut payload = BTreeMap::new();
        payload.insert("src/main.rs".to_string(), b"fn main() {}".to_vec());
        payload
    }

    #[test]
    fn create_then_restore_round_trips_payload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = EvoStore::open_in_memory().expect("open");
        let checkpoints = CheckpointStore::new(dir.path().join("checkpoints"));
        let version_id = VersionId::new("v1").expect("valid");
        checkpoints
            .create(&store, &version_id, &sample_payload(), CheckpointKind::Automatic, BTreeMap::new())
            .expect("create");

        let target = dir.path().join("restore_target");
        let outcome = checkpoints.restore(&store, &version_id, &target).expect("restore");
        assert!(!outcome.redirected);
        assert_eq!(outcome.payload, sample_payload());
    }

    #[test]
    fn restore_rejects_tampered_payload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = EvoStore::open_in_memory().expect("open");
        let checkpoints = CheckpointStore::new(dir.path().join("checkpoints"));
        let version_id = VersionId::new("v1").expect("valid");
        checkpoints
            .create(&store, &version_id, &sample_payload(), CheckpointKind::Automatic, BTreeMap::new())
            .expect("create");
        fs::write(
            dir.path().join("checkpoints").join("v1").join("payload").join("src/main.rs"),
            b"tampered",
        )
        .expect("tamper");
        let target = dir.path().join("restore_target");
        let result = checkpoints.restore(&store, &version_id, &target);
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn restore_redirects_away_from_working_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = EvoStore::open_in_memory().expect("open");
        let checkpoints = CheckpointStore::new(dir.path().join("checkpoints"));
        let version_id = VersionId::new("v1").expect("valid");
        checkpoints
            .create(&store, &version_id, &sample_payload(), CheckpointKind::Automatic, BTreeMap::new())
            .expect("create");
        let cwd = std::env::current_dir().expect("cwd");
        let outcome = checkpoints.restore(&store, &version_id, &cwd).expect("restore");
        assert!(outcome.redirected);
        assert!(outcome.written_to.starts_with(dir.path().join("checkpoints").join(".rollback_target")));
    }

    #[test]
    fn cleanup_retains_milestones() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = EvoStore::open_in_memory().expect("open");
        let checkpoints = CheckpointStore::new(dir.path().join("checkpoints"));
        for (index, kind) in
            [CheckpointKind::Automatic, CheckpointKind::Milestone, CheckpointKind::Automatic]
                .into_iter()
                .enumerate()
        {
            let version_id = VersionId::new(format!("v{index}")).expect("valid");
            checkpoints.create(&store, &version_id, &sample_payload(), kind, BTreeMap::new()).expect("create");
        }
        let removed = checkpoints.cleanup(&store, 0, &[]).expect("cleanup");
        assert_eq!(removed.len(), 2);
        assert!(checkpoints.get(&store, &VersionId::new("v1").expect("valid")).expect("get").is_some());
    }
}
