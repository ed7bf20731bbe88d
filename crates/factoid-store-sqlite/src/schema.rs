// crates/factoid-store-sqlite/src/schema.rs
// ============================================================================
// Module: SQLite Scope Schema
// Description: Table layout and version checks for a scope database.
// Purpose: Create scope storage idempotently and refuse unknown versions.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! A scope database holds three tables:
//! - `store_meta`: a single row recording the schema version.
//! - `keys`: one row per key text with its lock flag.
//! - `factoids`: facts owned by a key, ordered by their autoincrement id.
//!
//! `AUTOINCREMENT` keeps ids monotonic even after the highest row is deleted,
//! so ascending id order is stable insertion order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::store::SqliteStoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema version written to `store_meta`.
pub const SCHEMA_VERSION: i64 = 1;

/// Tables and indexes for schema version 1.
const SCHEMA_V1: &str = "CREATE TABLE IF NOT EXISTS keys (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        key TEXT NOT NULL UNIQUE,
        locked INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE IF NOT EXISTS factoids (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        key_id INTEGER NOT NULL REFERENCES keys(id) ON DELETE CASCADE,
        added_by TEXT NOT NULL,
        added_at INTEGER NOT NULL,
        fact TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_factoids_key_id ON factoids (key_id, id);";

// ============================================================================
// SECTION: Schema Setup
// ============================================================================

/// Creates the scope schema or validates the stored version.
///
/// # Errors
///
/// Returns [`SqliteStoreError::VersionMismatch`] when the database was
/// written by an unknown schema version, and [`SqliteStoreError::Db`] when
/// statements fail.
pub fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(SCHEMA_V1).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
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

// ============================================================================
// SECTION: Tests
// ============================================================================
