// judgment-gate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Ledger Store
// Description: Durable LedgerStore backed by SQLite WAL.
// Purpose: Persist blocks and judgment records with deterministic serialization.
// Dependencies: judgment-gate-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`LedgerStore`] using `SQLite`. Blocks
//! and judgments are stored as canonical JSON snapshots alongside a content
//! hash; loads verify the stored hash and fail closed on corruption. The
//! snapshot hash protects the row itself and is distinct from the block's
//! chain hash, which lives inside the snapshot.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use judgment_gate_core::Block;
use judgment_gate_core::HashDigest;
use judgment_gate_core::JudgmentId;
use judgment_gate_core::JudgmentRecord;
use judgment_gate_core::LedgerStore;
use judgment_gate_core::LedgerStoreError;
use judgment_gate_core::hashing::DEFAULT_HASH_ALGORITHM;
use judgment_gate_core::hashing::HashAlgorithm;
use judgment_gate_core::hashing::canonical_json_bytes;
use judgment_gate_core::hashing::hash_bytes;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the ledger store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum snapshot size accepted by the store.
pub const MAX_SNAPSHOT_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` ledger store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteLedgerConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` ledger store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite ledger io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite ledger db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite ledger corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite ledger version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite ledger invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for LedgerStoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) | SqliteStoreError::VersionMismatch(message) => {
                Self::Corrupt(message)
            }
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed ledger store with WAL support.
#[derive(Clone)]
pub struct SqliteLedgerStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteLedgerStore {
    /// Opens an `SQLite`-backed ledger store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteLedgerConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the connection, mapping poisoning onto a store error.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("connection mutex poisoned".to_string()))
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn insert_judgment(&self, record: &JudgmentRecord) -> Result<(), LedgerStoreError> {
        let (bytes, digest) = snapshot(record)?;
        let block_slot = record
            .block_number
            .map(i64::try_from)
            .transpose()
            .map_err(|_| LedgerStoreError::Invalid("block number exceeds i64".to_string()))?;
        let guard = self.lock().map_err(LedgerStoreError::from)?;
        guard
            .execute(
                "INSERT INTO judgments (judgment_id, judgment_json, snapshot_hash, \
                 hash_algorithm, block_number, block_hash, appended_at) VALUES (?1, ?2, ?3, ?4, \
                 ?5, ?6, ?7) ON CONFLICT(judgment_id) DO UPDATE SET judgment_json = \
                 excluded.judgment_json, snapshot_hash = excluded.snapshot_hash, hash_algorithm = \
                 excluded.hash_algorithm, block_number = excluded.block_number, block_hash = \
                 excluded.block_hash, appended_at = excluded.appended_at",
                params![
                    record.id.as_str(),
                    bytes,
                    digest.value,
                    hash_algorithm_label(digest.algorithm),
                    block_slot,
                    record.block_hash.as_ref().map(|hash| hash.value.clone()),
                    record.created_at.as_unix_millis()
                ],
            )
            .map_err(db_error)?;
        drop(guard);
        Ok(())
    }

    fn link_judgments(
        &self,
        ids: &[JudgmentId],
        block_number: u64,
        block_hash: &HashDigest,
    ) -> Result<u64, LedgerStoreError> {
        let block_slot = i64::try_from(block_number)
            .map_err(|_| LedgerStoreError::Invalid("block number exceeds i64".to_string()))?;
        let mut guard = self.lock().map_err(LedgerStoreError::from)?;
        let tx = guard.transaction().map_err(db_error)?;
        let mut updated = 0u64;
        for id in ids {
            let row: Option<Vec<u8>> = tx
                .query_row(
                    "SELECT judgment_json FROM judgments WHERE judgment_id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_error)?;
            let Some(bytes) = row else {
                continue;
            };
            let mut record: JudgmentRecord = serde_json::from_slice(&bytes)
                .map_err(|err| LedgerStoreError::Invalid(err.to_string()))?;
            if record.block_number.is_some() {
                continue;
            }
            record.block_number = Some(block_number);
            record.block_hash = Some(block_hash.clone());
            let (new_bytes, digest) = snapshot(&record)?;
            tx.execute(
                "UPDATE judgments SET judgment_json = ?1, snapshot_hash = ?2, hash_algorithm = \
                 ?3, block_number = ?4, block_hash = ?5 WHERE judgment_id = ?6",
                params![
                    new_bytes,
                    digest.value,
                    hash_algorithm_label(digest.algorithm),
                    block_slot,
                    block_hash.value,
                    id.as_str()
                ],
            )
            .map_err(db_error)?;
            updated = updated.saturating_add(1);
        }
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(updated)
    }

    fn insert_block(&self, block: &Block) -> Result<(), LedgerStoreError> {
        let slot = i64::try_from(block.slot)
            .map_err(|_| LedgerStoreError::Invalid("block slot exceeds i64".to_string()))?;
        let (bytes, digest) = snapshot(block)?;
        let guard = self.lock().map_err(LedgerStoreError::from)?;
        guard
            .execute(
                "INSERT INTO blocks (slot, block_json, snapshot_hash, hash_algorithm, sealed_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5) ON CONFLICT(slot) DO UPDATE SET block_json = \
                 excluded.block_json, snapshot_hash = excluded.snapshot_hash, hash_algorithm = \
                 excluded.hash_algorithm, sealed_at = excluded.sealed_at",
                params![
                    slot,
                    bytes,
                    digest.value,
                    hash_algorithm_label(digest.algorithm),
                    block.timestamp.as_unix_millis()
                ],
            )
            .map_err(db_error)?;
        drop(guard);
        Ok(())
    }

    fn load_block(&self, slot: u64) -> Result<Option<Block>, LedgerStoreError> {
        let slot = i64::try_from(slot)
            .map_err(|_| LedgerStoreError::Invalid("block slot exceeds i64".to_string()))?;
        let row = {
            let guard = self.lock().map_err(LedgerStoreError::from)?;
            guard
                .query_row(
                    "SELECT block_json, snapshot_hash, hash_algorithm FROM blocks WHERE slot = ?1",
                    params![slot],
                    snapshot_row,
                )
                .optional()
                .map_err(db_error)?
        };
        row.map(|snapshot| decode_block(&snapshot)).transpose()
    }

    fn load_blocks(&self, from_slot: u64, limit: usize) -> Result<Vec<Block>, LedgerStoreError> {
        let from_slot = i64::try_from(from_slot)
            .map_err(|_| LedgerStoreError::Invalid("block slot exceeds i64".to_string()))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = {
            let guard = self.lock().map_err(LedgerStoreError::from)?;
            let mut statement = guard
                .prepare(
                    "SELECT block_json, snapshot_hash, hash_algorithm FROM blocks WHERE slot >= \
                     ?1 ORDER BY slot ASC LIMIT ?2",
                )
                .map_err(db_error)?;
            let rows = statement
                .query_map(params![from_slot, limit], snapshot_row)
                .map_err(db_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error)?;
            drop(statement);
            rows
        };
        rows.iter().map(decode_block).collect()
    }

    fn load_head(&self) -> Result<Option<Block>, LedgerStoreError> {
        let row = {
            let guard = self.lock().map_err(LedgerStoreError::from)?;
            guard
                .query_row(
                    "SELECT block_json, snapshot_hash, hash_algorithm FROM blocks ORDER BY slot \
                     DESC LIMIT 1",
                    params![],
                    snapshot_row,
                )
                .optional()
                .map_err(db_error)?
        };
        row.map(|snapshot| decode_block(&snapshot)).transpose()
    }

    fn load_judgment(&self, id: &JudgmentId) -> Result<Option<JudgmentRecord>, LedgerStoreError> {
        let row = {
            let guard = self.lock().map_err(LedgerStoreError::from)?;
            guard
                .query_row(
                    "SELECT judgment_json, snapshot_hash, hash_algorithm FROM judgments WHERE \
                     judgment_id = ?1",
                    params![id.as_str()],
                    snapshot_row,
                )
                .optional()
                .map_err(db_error)?
        };
        row.map(|snapshot| decode_judgment(&snapshot)).transpose()
    }

    fn load_pending_judgments(&self) -> Result<Vec<JudgmentRecord>, LedgerStoreError> {
        let rows = {
            let guard = self.lock().map_err(LedgerStoreError::from)?;
            let mut statement = guard
                .prepare(
                    "SELECT judgment_json, snapshot_hash, hash_algorithm FROM judgments WHERE \
                     block_number IS NULL ORDER BY appended_at ASC, judgment_id ASC",
                )
                .map_err(db_error)?;
            let rows = statement
                .query_map(params![], snapshot_row)
                .map_err(db_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error)?;
            drop(statement);
            rows
        };
        rows.iter().map(decode_judgment).collect()
    }

    fn block_count(&self) -> Result<u64, LedgerStoreError> {
        self.count("SELECT COUNT(*) FROM blocks")
    }

    fn judgment_count(&self) -> Result<u64, LedgerStoreError> {
        self.count("SELECT COUNT(*) FROM judgments")
    }

    fn clear_all(&self) -> Result<(), LedgerStoreError> {
        let mut guard = self.lock().map_err(LedgerStoreError::from)?;
        let tx = guard.transaction().map_err(db_error)?;
        tx.execute("DELETE FROM judgments", params![]).map_err(db_error)?;
        tx.execute("DELETE FROM blocks", params![]).map_err(db_error)?;
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(())
    }
}

impl SqliteLedgerStore {
    /// Runs one COUNT query.
    fn count(&self, sql: &str) -> Result<u64, LedgerStoreError> {
        let guard = self.lock().map_err(LedgerStoreError::from)?;
        let count: i64 = guard.query_row(sql, params![], |row| row.get(0)).map_err(db_error)?;
        drop(guard);
        u64::try_from(count)
            .map_err(|_| LedgerStoreError::Corrupt("negative row count".to_string()))
    }
}

// ============================================================================
// SECTION: Snapshot Helpers
// ============================================================================

/// One loaded snapshot row: bytes, stored hash, and algorithm label.
type SnapshotRow = (Vec<u8>, String, String);

/// Maps a snapshot query row into its tuple form.
fn snapshot_row(row: &rusqlite::Row<'_>) -> Result<SnapshotRow, rusqlite::Error> {
    let bytes: Vec<u8> = row.get(0)?;
    let hash: String = row.get(1)?;
    let algorithm: String = row.get(2)?;
    Ok((bytes, hash, algorithm))
}

/// Serializes a value into canonical JSON bytes plus its content digest.
fn snapshot<T: serde::Serialize>(value: &T) -> Result<(Vec<u8>, HashDigest), LedgerStoreError> {
    let bytes = canonical_json_bytes(value)
        .map_err(|err| LedgerStoreError::Invalid(err.to_string()))?;
    if bytes.len() > MAX_SNAPSHOT_BYTES {
        return Err(LedgerStoreError::Invalid(format!(
            "snapshot exceeds size limit: {} bytes (max {MAX_SNAPSHOT_BYTES})",
            bytes.len()
        )));
    }
    let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes);
    Ok((bytes, digest))
}

/// Verifies a stored snapshot hash before decoding.
fn verify_snapshot(snapshot: &SnapshotRow) -> Result<&[u8], LedgerStoreError> {
    let (bytes, stored_hash, algorithm_label) = snapshot;
    if bytes.len() > MAX_SNAPSHOT_BYTES {
        return Err(LedgerStoreError::Invalid("stored snapshot exceeds size limit".to_string()));
    }
    let algorithm = parse_hash_algorithm(algorithm_label)?;
    let expected = hash_bytes(algorithm, bytes);
    if &expected.value != stored_hash {
        return Err(LedgerStoreError::Corrupt("snapshot hash mismatch".to_string()));
    }
    Ok(bytes)
}

/// Decodes one verified block snapshot.
fn decode_block(snapshot: &SnapshotRow) -> Result<Block, LedgerStoreError> {
    let bytes = verify_snapshot(snapshot)?;
    serde_json::from_slice(bytes).map_err(|err| LedgerStoreError::Invalid(err.to_string()))
}

/// Decodes one verified judgment snapshot.
fn decode_judgment(snapshot: &SnapshotRow) -> Result<JudgmentRecord, LedgerStoreError> {
    let bytes = verify_snapshot(snapshot)?;
    serde_json::from_slice(bytes).map_err(|err| LedgerStoreError::Invalid(err.to_string()))
}

/// Maps a rusqlite error onto the store error space.
fn db_error(err: rusqlite::Error) -> LedgerStoreError {
    LedgerStoreError::Store(err.to_string())
}

// ============================================================================
// SECTION: Connection Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteLedgerConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteLedgerConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS ledger_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM ledger_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO ledger_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS blocks (
                    slot INTEGER PRIMARY KEY,
                    block_json BLOB NOT NULL,
                    snapshot_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    sealed_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS judgments (
                    judgment_id TEXT PRIMARY KEY,
                    judgment_json BLOB NOT NULL,
                    snapshot_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    block_number INTEGER,
                    block_hash TEXT,
                    appended_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_judgments_block_number
                    ON judgments (block_number);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Returns the canonical hash algorithm label.
const fn hash_algorithm_label(algorithm: HashAlgorithm) -> &'static str {
    match algorithm {
        HashAlgorithm::Sha256 => "sha256",
    }
}

/// Parses a hash algorithm label.
fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, LedgerStoreError> {
    match label {
        "sha256" => Ok(HashAlgorithm::Sha256),
        other => Err(LedgerStoreError::Invalid(format!("unsupported hash algorithm: {other}"))),
    }
}
