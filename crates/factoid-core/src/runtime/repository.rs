// crates/factoid-core/src/runtime/repository.rs
// ============================================================================
// Module: Factoid Repository
// Description: Ordered factoid collection operations for a key.
// Purpose: Append, list, and delete factoids while keeping keys non-empty.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Factoids under a key are ordered by ascending identifier; position `0` is
//! always the oldest surviving factoid. Removing the last factoid of a key
//! deletes the key row in the same unit of work, so an empty key (and its
//! lock flag) never outlives its facts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::Factoid;
use crate::core::FactoidId;
use crate::core::Identity;
use crate::core::KeyId;
use crate::core::UnixSeconds;
use crate::core::UnlearnOutcome;
use crate::interfaces::ScopeTransaction;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Factoid Repository
// ============================================================================

/// Factoid collection operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct FactoidRepository;

impl FactoidRepository {
    /// Inserts a new factoid stamped with `added_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn append(
        txn: &mut dyn ScopeTransaction,
        key_id: KeyId,
        added_by: &Identity,
        added_at: UnixSeconds,
        text: &str,
    ) -> Result<FactoidId, StoreError> {
        txn.append_factoid(key_id, added_by, added_at, text)
    }

    /// Returns up to `limit` factoids in ascending id order plus the true
    /// total for truncation reporting.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn list_ordered(
        txn: &mut dyn ScopeTransaction,
        key_id: KeyId,
        limit: usize,
    ) -> Result<(Vec<Factoid>, u64), StoreError> {
        let factoids = txn.list_factoids(key_id, Some(limit))?;
        let total = txn.count_factoids(key_id)?;
        Ok((factoids, total))
    }

    /// Deletes the factoid at zero-based `position`. Returns `None` when the
    /// position is out of range. Deletes the key as well when it becomes empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn delete_at(
        txn: &mut dyn ScopeTransaction,
        key_id: KeyId,
        position: usize,
    ) -> Result<Option<UnlearnOutcome>, StoreError> {
        let Some(factoid) = txn.factoid_at(key_id, position)? else {
            return Ok(None);
        };
        if !txn.delete_factoid(factoid.id)? {
            return Err(StoreError::Corrupt(format!(
                "factoid {} vanished during delete",
                factoid.id
            )));
        }
        let key_removed = if txn.count_factoids(key_id)? == 0 {
            txn.delete_key(key_id)?
        } else {
            false
        };
        Ok(Some(UnlearnOutcome {
            removed: factoid,
            key_removed,
        }))
    }

    /// Removes every factoid owned by the key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn delete_all_for_key(
        txn: &mut dyn ScopeTransaction,
        key_id: KeyId,
    ) -> Result<u64, StoreError> {
        txn.delete_factoids_for_key(key_id)
    }

    /// Counts factoids owned by the key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn count_for_key(txn: &mut dyn ScopeTransaction, key_id: KeyId) -> Result<u64, StoreError> {
        txn.count_factoids(key_id)
    }
}
