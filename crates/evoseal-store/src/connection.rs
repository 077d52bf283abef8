// crates/evoseal-store/src/connection.rs
// ============================================================================
// Module: Store Connection
// Description: Shared SQLite connection, pragmas, and schema initialization.
// Purpose: One WAL-mode connection backs every store in this crate.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! [`EvoStore`] wraps a single `SQLite` connection behind a mutex. Every
//! write takes the lock and runs inside a transaction; `SQLite`'s own
//! locking makes a second writer block rather than corrupt state, but
//! serializing at the mutex avoids `SQLITE_BUSY` under normal load. Readers
//! take the same lock — this crate favors simplicity over read
//! concurrency, matching the "single-writer per version_id" and
//! "append-only, single-writer" guarantees called for rather than a true
//! multi-reader design.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::OpenFlags;

use crate::error::StoreError;

/// Schema version recorded in `store_meta`.
const SCHEMA_VERSION: i64 = 1;

/// Default busy timeout applied to every connection.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Shared handle onto the EVOSEAL `SQLite` store.
///
/// # Invariants
/// - All clones observe the same underlying connection and schema.
#[derive(Clone)]
pub struct EvoStore {
    /// Guarded `SQLite` connection.
    pub(crate) connection: Arc<Mutex<Connection>>,
}

impl EvoStore {
    /// Opens (creating if necessary) the `SQLite` database at `path` with
    /// WAL journaling and initializes its schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the database cannot be opened or its
    /// schema initialized.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        ensure_parent_dir(path)?;
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let mut connection =
            Connection::open_with_flags(path, flags).map_err(|err| StoreError::Db(err.to_string()))?;
        apply_pragmas(&connection)?;
        initialize_schema(&mut connection)?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }

    /// Opens an in-memory store, used by tests that don't need durability.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when schema initialization fails.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let mut connection = Connection::open_in_memory().map_err(|err| StoreError::Db(err.to_string()))?;
        connection
            .execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|err| StoreError::Db(err.to_string()))?;
        initialize_schema(&mut connection)?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }
}

/// Ensures the parent directory of `path` exists.
fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    let Some(parent) = path.parent() else {
        return Err(StoreError::Invalid("store path missing parent directory".to_string()));
    };
    if parent == Path::new("") {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| StoreError::Io(err.to_string()))
}

/// Applies the pragmas required for WAL durability.
fn apply_pragmas(connection: &Connection) -> Result<(), StoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL; PRAGMA synchronous = FULL;")
        .map_err(|err| StoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
        .map_err(|err| StoreError::Db(err.to_string()))?;
    Ok(())
}

/// Creates every table this crate owns if they do not already exist.
fn initialize_schema(connection: &mut Connection) -> Result<(), StoreError> {
    let tx = connection.transaction().map_err(|err| StoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| StoreError::Db(err.to_string()))?;
    let existing: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0))
        .ok();
    if existing.is_none() {
        tx.execute("INSERT INTO store_meta (version) VALUES (?1)", [SCHEMA_VERSION])
            .map_err(|err| StoreError::Db(err.to_string()))?;
    }
    tx.execute_batch(SCHEMA_SQL).map_err(|err| StoreError::Db(err.to_string()))?;
    tx.commit().map_err(|err| StoreError::Db(err.to_string()))?;
    Ok(())
}

/// DDL for every table owned by this crate.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS experiments (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    config TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT,
    tags_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS versions (
    id TEXT PRIMARY KEY,
    experiment_id TEXT NOT NULL,
    parent_ids_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    generation INTEGER NOT NULL,
    payload_json BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_versions_experiment ON versions (experiment_id);

CREATE TABLE IF NOT EXISTS metrics (
    experiment_id TEXT NOT NULL,
    version_id TEXT NOT NULL,
    name TEXT NOT NULL,
    iteration INTEGER NOT NULL,
    step INTEGER NOT NULL,
    value REAL NOT NULL,
    kind TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    PRIMARY KEY (version_id, name, step)
);
CREATE INDEX IF NOT EXISTS idx_metrics_series ON metrics (experiment_id, name, version_id);

CREATE TABLE IF NOT EXISTS checkpoints (
    checkpoint_id TEXT PRIMARY KEY,
    version_id TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    checkpoint_kind TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    payload_location TEXT NOT NULL,
    metadata_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS variants (
    id TEXT PRIMARY KEY,
    experiment_id TEXT NOT NULL,
    source TEXT NOT NULL,
    tests_json TEXT NOT NULL,
    score REAL NOT NULL,
    parents_json TEXT NOT NULL,
    generation INTEGER NOT NULL,
    mutation_kind TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_variants_experiment_score ON variants (experiment_id, score DESC);

CREATE TABLE IF NOT EXISTS rollback_records (
    record_id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_version_id TEXT NOT NULL,
    to_version_id TEXT,
    to_checkpoint_id TEXT,
    trigger_kind TEXT NOT NULL,
    outcome TEXT NOT NULL,
    versions_walked INTEGER NOT NULL,
    recorded_at TEXT NOT NULL,
    detail TEXT NOT NULL
);
";
