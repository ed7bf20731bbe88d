// crates/factoid-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Scope Backend
// Description: Process-local ScopeBackend for tests and embedding.
// Purpose: Provide a reference backend with the same atomicity contract.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Each scope is a set of ordered maps behind an `RwLock`:
//! - keys by text, plus an id to text index,
//! - factoids by `(key id, factoid id)`, so one key's facts are a range scan,
//! - factoid id to owning key, giving scope-wide id order.
//!
//! A write unit holds the write guard and records the inverse of every row
//! change in an undo journal. On `Err` the journal is replayed backwards and
//! the id counters are restored, leaving the scope as it was. Read units
//! share the read guard and reject row changes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;

use crate::core::Factoid;
use crate::core::FactoidId;
use crate::core::Identity;
use crate::core::KeyId;
use crate::core::KeyRecord;
use crate::core::RandomFactoid;
use crate::core::ResolvedKey;
use crate::core::ScopeId;
use crate::core::UnixSeconds;
use crate::interfaces::ScopeBackend;
use crate::interfaces::ScopeHandle;
use crate::interfaces::ScopeTransaction;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Scope State
// ============================================================================

/// Stored key columns (text is the map key).
#[derive(Debug, Clone)]
struct KeyRow {
    /// Surrogate key identifier.
    id: u64,
    /// Lock flag.
    locked: bool,
}

/// Stored factoid columns (key id and factoid id form the map key).
#[derive(Debug, Clone)]
struct FactoidRow {
    /// Contributor identity.
    added_by: Identity,
    /// Insertion time.
    added_at: UnixSeconds,
    /// Fact content.
    text: String,
}

/// Inverse of one row change.
#[derive(Debug)]
enum Undo {
    /// Drop a key that the unit inserted.
    RemoveKey {
        /// Key text.
        text: String,
    },
    /// Put back a key that the unit deleted.
    RestoreKey {
        /// Key text.
        text: String,
        /// Deleted columns.
        row: KeyRow,
    },
    /// Put back a lock flag that the unit changed.
    RestoreLock {
        /// Key text.
        text: String,
        /// Previous flag.
        locked: bool,
    },
    /// Drop a factoid that the unit inserted.
    RemoveFactoid {
        /// Factoid identifier.
        id: u64,
    },
    /// Put back a factoid that the unit deleted.
    RestoreFactoid {
        /// Owning key identifier.
        key_id: u64,
        /// Factoid identifier.
        id: u64,
        /// Deleted columns.
        row: FactoidRow,
    },
}

/// Complete contents of one scope.
#[derive(Debug, Default)]
struct ScopeState {
    /// Last issued key identifier.
    last_key_id: u64,
    /// Last issued factoid identifier; never reused.
    last_factoid_id: u64,
    /// Keys by text.
    keys: BTreeMap<String, KeyRow>,
    /// Key text by key id.
    key_text: BTreeMap<u64, String>,
    /// Factoids by `(key_id, id)`.
    factoids: BTreeMap<(u64, u64), FactoidRow>,
    /// Owning key id by factoid id (ascending iteration is scope-wide order).
    factoid_keys: BTreeMap<u64, u64>,
}

impl ScopeState {
    /// Factoids owned by `key_id` in ascending id order.
    fn factoids_for(&self, key_id: u64) -> btree_map::Range<'_, (u64, u64), FactoidRow> {
        self.factoids.range((key_id, 0) ..= (key_id, u64::MAX))
    }

    /// Inserts a key row and its id index entry.
    fn insert_key(&mut self, text: String, row: KeyRow) {
        self.key_text.insert(row.id, text.clone());
        self.keys.insert(text, row);
    }

    /// Removes a key row and its id index entry.
    fn remove_key(&mut self, text: &str) -> Option<KeyRow> {
        let row = self.keys.remove(text)?;
        self.key_text.remove(&row.id);
        Some(row)
    }

    /// Inserts a factoid row and its owner index entry.
    fn insert_factoid(&mut self, key_id: u64, id: u64, row: FactoidRow) {
        self.factoid_keys.insert(id, key_id);
        self.factoids.insert((key_id, id), row);
    }

    /// Removes a factoid row by id, returning its owner and columns.
    fn remove_factoid(&mut self, id: u64) -> Option<(u64, FactoidRow)> {
        let key_id = self.factoid_keys.remove(&id)?;
        self.factoids.remove(&(key_id, id)).map(|row| (key_id, row))
    }

    /// Removes every factoid owned by `key_id`.
    fn remove_factoids_for(&mut self, key_id: u64) -> Vec<(u64, FactoidRow)> {
        let ids: Vec<u64> = self.factoids_for(key_id).map(|(&(_, id), _)| id).collect();
        ids.into_iter().filter_map(|id| self.remove_factoid(id).map(|(_, row)| (id, row))).collect()
    }

    /// Applies one journal entry.
    fn undo(&mut self, entry: Undo) {
        match entry {
            Undo::RemoveKey {
                text,
            } => {
                self.remove_key(&text);
            }
            Undo::RestoreKey {
                text,
                row,
            } => self.insert_key(text, row),
            Undo::RestoreLock {
                text,
                locked,
            } => {
                if let Some(row) = self.keys.get_mut(&text) {
                    row.locked = locked;
                }
            }
            Undo::RemoveFactoid {
                id,
            } => {
                self.remove_factoid(id);
            }
            Undo::RestoreFactoid {
                key_id,
                id,
                row,
            } => self.insert_factoid(key_id, id, row),
        }
    }
}

/// Builds a key record from stored columns.
fn key_record(text: &str, row: &KeyRow) -> Result<KeyRecord, StoreError> {
    Ok(KeyRecord {
        id: key_id(row.id)?,
        text: text.to_string(),
        locked: row.locked,
    })
}

/// Builds a factoid record from stored columns.
fn factoid(key: u64, id: u64, row: &FactoidRow) -> Result<Factoid, StoreError> {
    Ok(Factoid {
        id: factoid_id(id)?,
        key_id: key_id(key)?,
        added_by: row.added_by.clone(),
        added_at: row.added_at,
        text: row.text.clone(),
    })
}

/// Converts a stored key id into a typed identifier.
fn key_id(raw: u64) -> Result<KeyId, StoreError> {
    KeyId::from_raw(raw).ok_or_else(|| StoreError::Corrupt("key id must be non-zero".to_string()))
}

/// Converts a stored factoid id into a typed identifier.
fn factoid_id(raw: u64) -> Result<FactoidId, StoreError> {
    FactoidId::from_raw(raw)
        .ok_or_else(|| StoreError::Corrupt("factoid id must be non-zero".to_string()))
}

/// Converts a row count into the interface count type.
fn count(len: usize) -> Result<u64, StoreError> {
    u64::try_from(len).map_err(|_| StoreError::Invalid("row count overflow".to_string()))
}

// ============================================================================
// SECTION: Transaction
// ============================================================================

/// Access a unit holds on the scope state.
enum StateAccess<'state> {
    /// Shared access; row changes are rejected.
    Read(&'state ScopeState),
    /// Exclusive access with an undo journal.
    Write {
        /// State being modified in place.
        state: &'state mut ScopeState,
        /// Inverse row changes, oldest first.
        journal: Vec<Undo>,
        /// Id counters when the unit started.
        counters: (u64, u64),
    },
}

/// Unit of work over one scope's state.
struct MemoryTransaction<'state> {
    /// Granted access.
    access: StateAccess<'state>,
}

impl<'state> MemoryTransaction<'state> {
    /// Starts a read-only unit.
    const fn reader(state: &'state ScopeState) -> Self {
        Self {
            access: StateAccess::Read(state),
        }
    }

    /// Starts a write unit.
    fn writer(state: &'state mut ScopeState) -> Self {
        let counters = (state.last_key_id, state.last_factoid_id);
        Self {
            access: StateAccess::Write {
                state,
                journal: Vec::new(),
                counters,
            },
        }
    }

    /// Returns the state for reading.
    fn state(&self) -> &ScopeState {
        match &self.access {
            StateAccess::Read(state) => *state,
            StateAccess::Write {
                state, ..
            } => &**state,
        }
    }

    /// Returns the state and journal, or fails inside a read unit.
    fn writable(&mut self) -> Result<(&mut ScopeState, &mut Vec<Undo>), StoreError> {
        match &mut self.access {
            StateAccess::Read(_) => {
                Err(StoreError::Invalid("row change attempted in a read unit".to_string()))
            }
            StateAccess::Write {
                state,
                journal,
                ..
            } => Ok((&mut **state, journal)),
        }
    }

    /// Reverts every change the unit made.
    fn rollback(self) {
        if let StateAccess::Write {
            state,
            journal,
            counters,
        } = self.access
        {
            for entry in journal.into_iter().rev() {
                state.undo(entry);
            }
            (state.last_key_id, state.last_factoid_id) = counters;
        }
    }
}

impl ScopeTransaction for MemoryTransaction<'_> {
    fn get_or_create_key(&mut self, text: &str) -> Result<ResolvedKey, StoreError> {
        if let Some(row) = self.state().keys.get(text) {
            return Ok(ResolvedKey {
                key: key_record(text, row)?,
                created: false,
            });
        }
        let (state, journal) = self.writable()?;
        state.last_key_id += 1;
        let row = KeyRow {
            id: state.last_key_id,
            locked: false,
        };
        let key = key_record(text, &row)?;
        state.insert_key(text.to_string(), row);
        journal.push(Undo::RemoveKey {
            text: text.to_string(),
        });
        Ok(ResolvedKey {
            key,
            created: true,
        })
    }

    fn find_key(&mut self, text: &str) -> Result<Option<KeyRecord>, StoreError> {
        self.state().keys.get(text).map(|row| key_record(text, row)).transpose()
    }

    fn set_key_locked(&mut self, text: &str, locked: bool) -> Result<bool, StoreError> {
        let (state, journal) = self.writable()?;
        let Some(row) = state.keys.get_mut(text) else {
            return Ok(false);
        };
        journal.push(Undo::RestoreLock {
            text: text.to_string(),
            locked: row.locked,
        });
        row.locked = locked;
        Ok(true)
    }

    fn delete_key(&mut self, key_id: KeyId) -> Result<bool, StoreError> {
        let (state, journal) = self.writable()?;
        let Some(text) = state.key_text.get(&key_id.get()).cloned() else {
            return Ok(false);
        };
        for (id, row) in state.remove_factoids_for(key_id.get()) {
            journal.push(Undo::RestoreFactoid {
                key_id: key_id.get(),
                id,
                row,
            });
        }
        if let Some(row) = state.remove_key(&text) {
            journal.push(Undo::RestoreKey {
                text,
                row,
            });
        }
        Ok(true)
    }

    fn count_keys(&mut self) -> Result<u64, StoreError> {
        count(self.state().keys.len())
    }

    fn append_factoid(
        &mut self,
        key_id: KeyId,
        added_by: &Identity,
        added_at: UnixSeconds,
        text: &str,
    ) -> Result<FactoidId, StoreError> {
        let (state, journal) = self.writable()?;
        if !state.key_text.contains_key(&key_id.get()) {
            return Err(StoreError::Invalid(format!("factoid references missing key {key_id}")));
        }
        state.last_factoid_id += 1;
        let id = state.last_factoid_id;
        state.insert_factoid(key_id.get(), id, FactoidRow {
            added_by: added_by.clone(),
            added_at,
            text: text.to_string(),
        });
        journal.push(Undo::RemoveFactoid {
            id,
        });
        factoid_id(id)
    }

    fn list_factoids(
        &mut self,
        key_id: KeyId,
        limit: Option<usize>,
    ) -> Result<Vec<Factoid>, StoreError> {
        self.state()
            .factoids_for(key_id.get())
            .take(limit.unwrap_or(usize::MAX))
            .map(|(&(key, id), row)| factoid(key, id, row))
            .collect()
    }

    fn count_factoids(&mut self, key_id: KeyId) -> Result<u64, StoreError> {
        count(self.state().factoids_for(key_id.get()).count())
    }

    fn factoid_at(
        &mut self,
        key_id: KeyId,
        position: usize,
    ) -> Result<Option<Factoid>, StoreError> {
        self.state()
            .factoids_for(key_id.get())
            .nth(position)
            .map(|(&(key, id), row)| factoid(key, id, row))
            .transpose()
    }

    fn delete_factoid(&mut self, factoid_id: FactoidId) -> Result<bool, StoreError> {
        let (state, journal) = self.writable()?;
        let id = factoid_id.get();
        let Some((key_id, row)) = state.remove_factoid(id) else {
            return Ok(false);
        };
        journal.push(Undo::RestoreFactoid {
            key_id,
            id,
            row,
        });
        Ok(true)
    }

    fn delete_factoids_for_key(&mut self, key_id: KeyId) -> Result<u64, StoreError> {
        let (state, journal) = self.writable()?;
        let removed = state.remove_factoids_for(key_id.get());
        let removed_count = count(removed.len())?;
        journal.extend(removed.into_iter().map(|(id, row)| Undo::RestoreFactoid {
            key_id: key_id.get(),
            id,
            row,
        }));
        Ok(removed_count)
    }

    fn count_all_factoids(&mut self) -> Result<u64, StoreError> {
        count(self.state().factoid_keys.len())
    }

    fn factoid_at_offset(&mut self, offset: u64) -> Result<Option<RandomFactoid>, StoreError> {
        let offset = usize::try_from(offset)
            .map_err(|_| StoreError::Invalid("factoid offset overflow".to_string()))?;
        let state = self.state();
        let Some((&id, &key_id)) = state.factoid_keys.iter().nth(offset) else {
            return Ok(None);
        };
        let row = state
            .factoids
            .get(&(key_id, id))
            .ok_or_else(|| StoreError::Corrupt(format!("factoid {id} missing from key index")))?;
        let key = state
            .key_text
            .get(&key_id)
            .cloned()
            .ok_or_else(|| StoreError::Corrupt(format!("factoid owner {key_id} missing")))?;
        Ok(Some(RandomFactoid {
            key,
            text: row.text.clone(),
        }))
    }
}

// ============================================================================
// SECTION: Handle
// ============================================================================

/// In-memory storage for one scope.
#[derive(Debug)]
pub struct InMemoryScopeHandle {
    /// Scope this handle serves.
    scope: ScopeId,
    /// Committed scope contents.
    state: RwLock<ScopeState>,
}

impl ScopeHandle for InMemoryScopeHandle {
    fn scope_id(&self) -> &ScopeId {
        &self.scope
    }

    fn write<T, E, F>(&self, op: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn ScopeTransaction) -> Result<T, E>,
    {
        let mut guard = self
            .state
            .write()
            .map_err(|_| StoreError::Io("in-memory scope lock poisoned".to_string()))?;
        let result = {
            let mut txn = MemoryTransaction::writer(&mut guard);
            let result = op(&mut txn);
            if result.is_err() {
                txn.rollback();
            }
            result
        };
        drop(guard);
        result
    }

    fn read<T, E, F>(&self, op: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn ScopeTransaction) -> Result<T, E>,
    {
        let guard = self
            .state
            .read()
            .map_err(|_| StoreError::Io("in-memory scope lock poisoned".to_string()))?;
        let result = op(&mut MemoryTransaction::reader(&guard));
        drop(guard);
        result
    }
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// In-memory scope backend for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryScopeBackend {
    /// Open scopes protected by a mutex.
    scopes: Arc<Mutex<BTreeMap<ScopeId, Arc<InMemoryScopeHandle>>>>,
}

impl InMemoryScopeBackend {
    /// Creates a new in-memory backend with no scopes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScopeBackend for InMemoryScopeBackend {
    type Handle = InMemoryScopeHandle;

    fn ensure_scope(&self, scope: &ScopeId) -> Result<Arc<Self::Handle>, StoreError> {
        let mut guard = self
            .scopes
            .lock()
            .map_err(|_| StoreError::Io("in-memory backend mutex poisoned".to_string()))?;
        let handle = guard
            .entry(scope.clone())
            .or_insert_with(|| {
                Arc::new(InMemoryScopeHandle {
                    scope: scope.clone(),
                    state: RwLock::new(ScopeState::default()),
                })
            })
            .clone();
        drop(guard);
        Ok(handle)
    }

    /// Drops the scope and its contents; nothing outlives the handle here.
    fn close_scope(&self, scope: &ScopeId) -> Result<bool, StoreError> {
        let mut guard = self
            .scopes
            .lock()
            .map_err(|_| StoreError::Io("in-memory backend mutex poisoned".to_string()))?;
        Ok(guard.remove(scope).is_some())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
