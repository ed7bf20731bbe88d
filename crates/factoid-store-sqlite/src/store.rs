// crates/factoid-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Scope Backend
// Description: Durable ScopeBackend with one SQLite database per scope.
// Purpose: Open, cache, and serialize access to per-scope databases.
// Dependencies: factoid-core, rusqlite, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`SqliteScopeBackend`] maps each scope to a database file under
//! `root_dir` and caches one [`SqliteScopeHandle`] per open scope. The cache
//! holds a slot per scope; a scope file is opened under its own slot lock
//! with the cache lock released, so a slow or locked file stalls only
//! callers of that scope.
//!
//! A handle owns a single writer connection behind a mutex. Write units run
//! in `BEGIN IMMEDIATE` transactions, so they are serialized in-process by the
//! mutex and across processes by the `SQLite` write lock plus busy timeout.
//! Reads are served by a small pool of `query_only` connections inside
//! deferred transactions, which under WAL observe a stable snapshot.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use factoid_core::ScopeBackend;
use factoid_core::ScopeHandle;
use factoid_core::ScopeId;
use factoid_core::ScopeTransaction;
use factoid_core::StoreError;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::TransactionBehavior;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use tracing::info;

use crate::paths::PathLimitViolation;
use crate::paths::check_path_limits;
use crate::paths::scope_file_name;
use crate::schema::initialize_schema;
use crate::transaction::SqliteScopeTransaction;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default number of read-only connections per scope.
const DEFAULT_READ_POOL_SIZE: usize = 4;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
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

/// Configuration for the `SQLite` scope backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteStoreConfig {
    /// Directory holding one database file per scope.
    pub root_dir: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Read-only connections opened per scope.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

impl SqliteStoreConfig {
    /// Returns a configuration with defaults for everything but the root.
    #[must_use]
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            read_pool_size: DEFAULT_READ_POOL_SIZE,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default reader pool size.
const fn default_read_pool_size() -> usize {
    DEFAULT_READ_POOL_SIZE
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored rows failed integrity checks.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store configuration or input.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Db(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

/// Wraps an engine error as a store error.
pub(crate) fn db_error(err: rusqlite::Error) -> StoreError {
    SqliteStoreError::Db(err.to_string()).into()
}

// ============================================================================
// SECTION: Scope Handle
// ============================================================================

/// Open `SQLite` storage for one scope.
pub struct SqliteScopeHandle {
    /// Scope this handle serves.
    scope: ScopeId,
    /// Database file path.
    path: PathBuf,
    /// Single writer connection.
    writer: Mutex<Connection>,
    /// Read-only connections.
    readers: Vec<Mutex<Connection>>,
    /// Round-robin cursor into `readers`.
    next_reader: AtomicUsize,
}

impl std::fmt::Debug for SqliteScopeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteScopeHandle")
            .field("scope", &self.scope)
            .field("path", &self.path)
            .field("readers", &self.readers.len())
            .finish_non_exhaustive()
    }
}

impl SqliteScopeHandle {
    /// Opens the scope database, creating and initializing it when absent.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the file cannot be opened or carries
    /// an unsupported schema version.
    fn open(
        scope: ScopeId,
        path: PathBuf,
        config: &SqliteStoreConfig,
    ) -> Result<Self, SqliteStoreError> {
        validate_store_path(&path)?;
        let mut writer = open_writer(&path, config)?;
        initialize_schema(&mut writer)?;
        let readers = (0 .. config.read_pool_size.max(1))
            .map(|_| open_reader(&path, config).map(Mutex::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            scope,
            path,
            writer: Mutex::new(writer),
            readers,
            next_reader: AtomicUsize::new(0),
        })
    }

    /// Returns the database file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScopeHandle for SqliteScopeHandle {
    fn scope_id(&self) -> &ScopeId {
        &self.scope
    }

    fn write<T, E, F>(&self, op: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn ScopeTransaction) -> Result<T, E>,
    {
        let mut guard = self
            .writer
            .lock()
            .map_err(|_| StoreError::from(SqliteStoreError::Io("writer mutex poisoned".to_string())))?;
        let tx = guard.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db_error)?;
        let value = op(&mut SqliteScopeTransaction::new(&tx))?;
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(value)
    }

    fn read<T, E, F>(&self, op: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn ScopeTransaction) -> Result<T, E>,
    {
        let index = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len().max(1);
        let reader = self.readers.get(index).ok_or_else(|| {
            StoreError::from(SqliteStoreError::Invalid("reader pool is empty".to_string()))
        })?;
        let mut guard = reader
            .lock()
            .map_err(|_| StoreError::from(SqliteStoreError::Io("reader mutex poisoned".to_string())))?;
        let tx = guard.transaction().map_err(db_error)?;
        let value = op(&mut SqliteScopeTransaction::new(&tx))?;
        tx.rollback().map_err(db_error)?;
        drop(guard);
        Ok(value)
    }
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Cache slot for one scope; `None` until the scope file is opened.
type ScopeSlot = Arc<Mutex<Option<Arc<SqliteScopeHandle>>>>;

/// `SQLite`-backed scope backend with one database file per scope.
#[derive(Debug)]
pub struct SqliteScopeBackend {
    /// Backend configuration.
    config: SqliteStoreConfig,
    /// Per-scope handle slots.
    handles: Mutex<BTreeMap<ScopeId, ScopeSlot>>,
}

impl SqliteScopeBackend {
    /// Creates a backend rooted at `config.root_dir`, creating the directory.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the root directory is invalid or
    /// cannot be created.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_root_dir(&config.root_dir)?;
        std::fs::create_dir_all(&config.root_dir)
            .map_err(|err| SqliteStoreError::Io(err.to_string()))?;
        Ok(Self {
            config,
            handles: Mutex::new(BTreeMap::new()),
        })
    }

    /// Returns the backend configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Returns the database path used for `scope`.
    #[must_use]
    pub fn scope_path(&self, scope: &ScopeId) -> PathBuf {
        self.config.root_dir.join(scope_file_name(scope))
    }

    /// Returns the slot for `scope`, inserting an empty one when absent.
    fn slot(&self, scope: &ScopeId) -> Result<ScopeSlot, SqliteStoreError> {
        let mut guard = self
            .handles
            .lock()
            .map_err(|_| SqliteStoreError::Io("scope registry mutex poisoned".to_string()))?;
        let slot = Arc::clone(guard.entry(scope.clone()).or_default());
        drop(guard);
        Ok(slot)
    }
}

impl ScopeBackend for SqliteScopeBackend {
    type Handle = SqliteScopeHandle;

    fn ensure_scope(&self, scope: &ScopeId) -> Result<Arc<Self::Handle>, StoreError> {
        let slot = self.slot(scope)?;
        let mut guard = slot
            .lock()
            .map_err(|_| SqliteStoreError::Io("scope slot mutex poisoned".to_string()))?;
        if let Some(handle) = guard.as_ref() {
            return Ok(Arc::clone(handle));
        }
        let path = self.scope_path(scope);
        let handle = Arc::new(SqliteScopeHandle::open(scope.clone(), path, &self.config)?);
        *guard = Some(Arc::clone(&handle));
        drop(guard);
        info!(%scope, path = %handle.path().display(), "opened factoid scope");
        Ok(handle)
    }

    fn close_scope(&self, scope: &ScopeId) -> Result<bool, StoreError> {
        let mut guard = self
            .handles
            .lock()
            .map_err(|_| SqliteStoreError::Io("scope registry mutex poisoned".to_string()))?;
        let slot = guard.remove(scope);
        drop(guard);
        let closed = match slot {
            Some(slot) => slot
                .lock()
                .map_err(|_| SqliteStoreError::Io("scope slot mutex poisoned".to_string()))?
                .take()
                .is_some(),
            None => false,
        };
        if closed {
            info!(%scope, "closed factoid scope");
        }
        Ok(closed)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        if self.config.root_dir.is_dir() {
            Ok(())
        } else {
            Err(SqliteStoreError::Io(format!(
                "store root {} is not a directory",
                self.config.root_dir.display()
            ))
            .into())
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates the root directory setting.
fn validate_root_dir(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store root_dir must be set".to_string()));
    }
    validate_path_limits(path)?;
    if path.exists() && !path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store root_dir must be a directory, not a file".to_string(),
        ));
    }
    Ok(())
}

/// Validates a scope database path.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    validate_path_limits(path)?;
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Enforces total and per-component path length limits.
fn validate_path_limits(path: &Path) -> Result<(), SqliteStoreError> {
    check_path_limits(path).map_err(|violation| {
        let message = match violation {
            PathLimitViolation::TotalLength => "store path exceeds length limit",
            PathLimitViolation::ComponentLength => "store path contains an overlong component",
        };
        SqliteStoreError::Invalid(message.to_string())
    })
}

/// Opens the writer connection and applies durability pragmas.
fn open_writer(path: &Path, config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_common_pragmas(&connection, config)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    debug!(path = %path.display(), "opened scope writer connection");
    Ok(connection)
}

/// Opens a read-only connection to an initialized scope database.
fn open_reader(path: &Path, config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_common_pragmas(&connection, config)?;
    connection
        .execute_batch("PRAGMA query_only = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(connection)
}

/// Applies pragmas shared by writer and reader connections.
fn apply_common_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
