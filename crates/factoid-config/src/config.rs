// crates/factoid-config/src/config.rs
// ============================================================================
// Module: Factoid Configuration
// Description: Configuration loading and validation for the factoid store.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: factoid-core, factoid-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The file is resolved from an explicit path, then the `FACTOID_CONFIG`
//! environment variable, then `factoids.toml` in the working directory.
//! Missing or invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use factoid_core::FactoidStore;
use factoid_core::FactoidStoreConfig;
use factoid_core::InMemoryScopeBackend;
use factoid_store_sqlite::PathLimitViolation;
use factoid_store_sqlite::SqliteScopeBackend;
use factoid_store_sqlite::SqliteStoreConfig;
use factoid_store_sqlite::SqliteStoreMode;
use factoid_store_sqlite::SqliteSyncMode;
use factoid_store_sqlite::check_path_limits;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "factoids.toml";
/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "FACTOID_CONFIG";
/// Maximum config file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Default busy timeout for store connections (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default read-only connections per scope.
const DEFAULT_READ_POOL_SIZE: usize = 4;
/// Maximum read-only connections per scope.
pub(crate) const MAX_READ_POOL_SIZE: usize = 64;
/// Maximum factoids returned by a single lookup.
pub(crate) const MAX_WHATIS_LIMIT: usize = 1_000;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Factoid store configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactoidConfig {
    /// Storage backend configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Lookup behavior configuration.
    #[serde(default)]
    pub query: QueryConfig,
}

impl FactoidConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path);
        validate_path("config path", &resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.query.validate()
    }

    /// Returns the facade configuration.
    #[must_use]
    pub const fn store_config(&self) -> FactoidStoreConfig {
        FactoidStoreConfig {
            whatis_limit: self.query.whatis_limit,
        }
    }

    /// Opens a factoid store on the in-memory backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the store type is not `memory`.
    pub fn open_memory_store(&self) -> Result<FactoidStore<InMemoryScopeBackend>, ConfigError> {
        if self.store.store_type != StoreType::Memory {
            return Err(ConfigError::Invalid(
                "store type must be memory to open an in-memory store".to_string(),
            ));
        }
        Ok(FactoidStore::new(InMemoryScopeBackend::new(), self.store_config()))
    }

    /// Opens a factoid store on the configured `SQLite` backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the store type is not `sqlite`
    /// and [`ConfigError::Store`] when the backend cannot be created.
    pub fn open_sqlite_store(&self) -> Result<FactoidStore<SqliteScopeBackend>, ConfigError> {
        let sqlite = self.store.sqlite_config().ok_or_else(|| {
            ConfigError::Invalid("store type must be sqlite to open a durable store".to_string())
        })?;
        let backend =
            SqliteScopeBackend::new(sqlite).map_err(|err| ConfigError::Store(err.to_string()))?;
        Ok(FactoidStore::new(backend, self.store_config()))
    }
}

/// Storage backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory backend.
    #[default]
    Memory,
    /// Use the durable `SQLite` backend.
    Sqlite,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// Directory for per-scope database files (sqlite only).
    #[serde(default)]
    pub root_dir: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Read-only connections per scope.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            root_dir: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            read_pool_size: default_read_pool_size(),
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.root_dir.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory store must not set root_dir".to_string(),
                    ));
                }
            }
            StoreType::Sqlite => {
                let root_dir = self.root_dir.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires root_dir".to_string())
                })?;
                validate_path_string("store.root_dir", &root_dir.to_string_lossy())?;
            }
        }
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "store busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if !(1 ..= MAX_READ_POOL_SIZE).contains(&self.read_pool_size) {
            return Err(ConfigError::Invalid(format!(
                "store read_pool_size must be between 1 and {MAX_READ_POOL_SIZE}"
            )));
        }
        Ok(())
    }

    /// Returns the `SQLite` backend configuration when the store is durable.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        if self.store_type != StoreType::Sqlite {
            return None;
        }
        self.root_dir.as_ref().map(|root_dir| SqliteStoreConfig {
            root_dir: root_dir.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
            read_pool_size: self.read_pool_size,
        })
    }
}

/// Lookup behavior configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Maximum factoids returned by a lookup.
    #[serde(default = "default_whatis_limit")]
    pub whatis_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            whatis_limit: default_whatis_limit(),
        }
    }
}

impl QueryConfig {
    /// Validates lookup configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1 ..= MAX_WHATIS_LIMIT).contains(&self.whatis_limit) {
            return Err(ConfigError::Invalid(format!(
                "query whatis_limit must be between 1 and {MAX_WHATIS_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Returns the default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default reader pool size.
const fn default_read_pool_size() -> usize {
    DEFAULT_READ_POOL_SIZE
}

/// Returns the default lookup limit.
const fn default_whatis_limit() -> usize {
    factoid_core::DEFAULT_WHATIS_LIMIT
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// The configured store could not be opened.
    #[error("config store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit path or environment defaults.
fn resolve_path(path: Option<&Path>) -> PathBuf {
    if let Some(path) = path {
        return path.to_path_buf();
    }
    env::var(CONFIG_ENV_VAR).map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_NAME), PathBuf::from)
}

/// Validates a path against length limits, naming `label` in errors.
fn validate_path(label: &str, path: &Path) -> Result<(), ConfigError> {
    check_path_limits(path).map_err(|violation| match violation {
        PathLimitViolation::TotalLength => {
            ConfigError::Invalid(format!("{label} exceeds max length"))
        }
        PathLimitViolation::ComponentLength => {
            ConfigError::Invalid(format!("{label} component too long"))
        }
    })
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    validate_path(&format!("{field} path"), Path::new(trimmed))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
