// crates/factoid-store-sqlite/src/transaction.rs
// ============================================================================
// Module: SQLite Scope Transaction
// Description: ScopeTransaction primitives over an open SQLite transaction.
// Purpose: Map row-level factoid operations to SQL statements.
// Dependencies: factoid-core, rusqlite
// ============================================================================

//! ## Overview
//! Every statement runs on the connection of an already-open transaction;
//! commit and rollback belong to the owning [`crate::SqliteScopeHandle`].
//! Identifiers cross the SQL boundary as `i64` and are validated on the way
//! back, so a non-positive id in the file surfaces as corruption.

// ============================================================================
// SECTION: Imports
// ============================================================================

use factoid_core::Factoid;
use factoid_core::FactoidId;
use factoid_core::Identity;
use factoid_core::KeyId;
use factoid_core::KeyRecord;
use factoid_core::RandomFactoid;
use factoid_core::ResolvedKey;
use factoid_core::ScopeTransaction;
use factoid_core::StoreError;
use factoid_core::UnixSeconds;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;

use crate::store::SqliteStoreError;
use crate::store::db_error;

// ============================================================================
// SECTION: Statements
// ============================================================================

/// Selects a key row by text.
const SELECT_KEY: &str = "SELECT id, key, locked FROM keys WHERE key = ?1";
/// Selects factoid columns for one key in display order.
const SELECT_FACTOIDS: &str = "SELECT id, key_id, added_by, added_at, fact FROM factoids
     WHERE key_id = ?1 ORDER BY id LIMIT ?2 OFFSET ?3";

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Raw `keys` columns.
struct KeyRow {
    /// `keys.id`.
    id: i64,
    /// `keys.key`.
    text: String,
    /// `keys.locked`.
    locked: i64,
}

impl KeyRow {
    /// Reads a row selected by [`SELECT_KEY`].
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            text: row.get(1)?,
            locked: row.get(2)?,
        })
    }

    /// Validates and converts into a key record.
    fn into_record(self) -> Result<KeyRecord, StoreError> {
        Ok(KeyRecord {
            id: key_id(self.id)?,
            text: self.text,
            locked: self.locked != 0,
        })
    }
}

/// Raw `factoids` columns.
struct FactoidRow {
    /// `factoids.id`.
    id: i64,
    /// `factoids.key_id`.
    key_id: i64,
    /// `factoids.added_by`.
    added_by: String,
    /// `factoids.added_at`.
    added_at: i64,
    /// `factoids.fact`.
    text: String,
}

impl FactoidRow {
    /// Reads a row selected by [`SELECT_FACTOIDS`].
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            key_id: row.get(1)?,
            added_by: row.get(2)?,
            added_at: row.get(3)?,
            text: row.get(4)?,
        })
    }

    /// Validates and converts into a factoid record.
    fn into_factoid(self) -> Result<Factoid, StoreError> {
        Ok(Factoid {
            id: factoid_id(self.id)?,
            key_id: key_id(self.key_id)?,
            added_by: Identity::new(self.added_by),
            added_at: UnixSeconds::new(self.added_at),
            text: self.text,
        })
    }
}

/// Converts a stored id into a key identifier.
fn key_id(raw: i64) -> Result<KeyId, StoreError> {
    u64::try_from(raw)
        .ok()
        .and_then(KeyId::from_raw)
        .ok_or_else(|| SqliteStoreError::Corrupt(format!("invalid key id {raw}")).into())
}

/// Converts a stored id into a factoid identifier.
fn factoid_id(raw: i64) -> Result<FactoidId, StoreError> {
    u64::try_from(raw)
        .ok()
        .and_then(FactoidId::from_raw)
        .ok_or_else(|| SqliteStoreError::Corrupt(format!("invalid factoid id {raw}")).into())
}

/// Converts an identifier or offset into a SQL integer.
fn sql_int(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value)
        .map_err(|_| SqliteStoreError::Invalid(format!("value {value} exceeds sql range")).into())
}

/// Converts a position or limit into a SQL integer.
fn sql_index(value: usize) -> Result<i64, StoreError> {
    i64::try_from(value)
        .map_err(|_| SqliteStoreError::Invalid(format!("value {value} exceeds sql range")).into())
}

/// Converts a `COUNT(*)` result.
fn row_count(raw: i64) -> Result<u64, StoreError> {
    u64::try_from(raw)
        .map_err(|_| SqliteStoreError::Corrupt(format!("negative row count {raw}")).into())
}

/// Converts an affected-row count.
fn affected(rows: usize) -> Result<u64, StoreError> {
    u64::try_from(rows)
        .map_err(|_| SqliteStoreError::Invalid("affected row count overflow".to_string()).into())
}

// ============================================================================
// SECTION: Transaction
// ============================================================================

/// Row-level access inside one open `SQLite` transaction.
pub(crate) struct SqliteScopeTransaction<'conn> {
    /// Connection of the open transaction.
    conn: &'conn Connection,
}

impl<'conn> SqliteScopeTransaction<'conn> {
    /// Wraps the connection of an open transaction.
    pub(crate) const fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
        }
    }

    /// Runs a single-value `COUNT(*)` query.
    fn count(&self, sql: &str, params: impl rusqlite::Params) -> Result<u64, StoreError> {
        let raw: i64 = self.conn.query_row(sql, params, |row| row.get(0)).map_err(db_error)?;
        row_count(raw)
    }

    /// Selects factoids for a key with SQL limit/offset.
    fn select_factoids(
        &self,
        key_id: KeyId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Factoid>, StoreError> {
        let mut stmt = self.conn.prepare_cached(SELECT_FACTOIDS).map_err(db_error)?;
        let rows = stmt
            .query_map(params![sql_int(key_id.get())?, limit, offset], FactoidRow::from_row)
            .map_err(db_error)?;
        rows.map(|row| row.map_err(db_error).and_then(FactoidRow::into_factoid)).collect()
    }
}

impl ScopeTransaction for SqliteScopeTransaction<'_> {
    fn get_or_create_key(&mut self, text: &str) -> Result<ResolvedKey, StoreError> {
        let inserted = self
            .conn
            .execute(
                "INSERT INTO keys (key, locked) VALUES (?1, 0) ON CONFLICT(key) DO NOTHING",
                params![text],
            )
            .map_err(db_error)?;
        let key = self
            .find_key(text)?
            .ok_or_else(|| SqliteStoreError::Corrupt(format!("key '{text}' missing after upsert")))?;
        Ok(ResolvedKey {
            key,
            created: inserted > 0,
        })
    }

    fn find_key(&mut self, text: &str) -> Result<Option<KeyRecord>, StoreError> {
        self.conn
            .query_row(SELECT_KEY, params![text], KeyRow::from_row)
            .optional()
            .map_err(db_error)?
            .map(KeyRow::into_record)
            .transpose()
    }

    fn set_key_locked(&mut self, text: &str, locked: bool) -> Result<bool, StoreError> {
        let updated = self
            .conn
            .execute("UPDATE keys SET locked = ?2 WHERE key = ?1", params![text, i64::from(locked)])
            .map_err(db_error)?;
        Ok(updated > 0)
    }

    fn delete_key(&mut self, key_id: KeyId) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM keys WHERE id = ?1", params![sql_int(key_id.get())?])
            .map_err(db_error)?;
        Ok(deleted > 0)
    }

    fn count_keys(&mut self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM keys", params![])
    }

    fn append_factoid(
        &mut self,
        key_id: KeyId,
        added_by: &Identity,
        added_at: UnixSeconds,
        text: &str,
    ) -> Result<FactoidId, StoreError> {
        self.conn
            .execute(
                "INSERT INTO factoids (key_id, added_by, added_at, fact) VALUES (?1, ?2, ?3, ?4)",
                params![sql_int(key_id.get())?, added_by.as_str(), added_at.get(), text],
            )
            .map_err(db_error)?;
        factoid_id(self.conn.last_insert_rowid())
    }

    fn list_factoids(
        &mut self,
        key_id: KeyId,
        limit: Option<usize>,
    ) -> Result<Vec<Factoid>, StoreError> {
        let limit = limit.map_or(Ok(-1), sql_index)?;
        self.select_factoids(key_id, limit, 0)
    }

    fn count_factoids(&mut self, key_id: KeyId) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM factoids WHERE key_id = ?1", params![sql_int(
            key_id.get()
        )?])
    }

    fn factoid_at(
        &mut self,
        key_id: KeyId,
        position: usize,
    ) -> Result<Option<Factoid>, StoreError> {
        Ok(self.select_factoids(key_id, 1, sql_index(position)?)?.into_iter().next())
    }

    fn delete_factoid(&mut self, factoid_id: FactoidId) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM factoids WHERE id = ?1", params![sql_int(factoid_id.get())?])
            .map_err(db_error)?;
        Ok(deleted > 0)
    }

    fn delete_factoids_for_key(&mut self, key_id: KeyId) -> Result<u64, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM factoids WHERE key_id = ?1", params![sql_int(key_id.get())?])
            .map_err(db_error)?;
        affected(deleted)
    }

    fn count_all_factoids(&mut self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM factoids", params![])
    }

    fn factoid_at_offset(&mut self, offset: u64) -> Result<Option<RandomFactoid>, StoreError> {
        self.conn
            .query_row(
                "SELECT k.key, f.fact FROM factoids f JOIN keys k ON k.id = f.key_id
                 ORDER BY f.id LIMIT 1 OFFSET ?1",
                params![sql_int(offset)?],
                |row| {
                    Ok(RandomFactoid {
                        key: row.get(0)?,
                        text: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(db_error)
    }
}
