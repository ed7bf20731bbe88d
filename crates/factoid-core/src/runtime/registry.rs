// crates/factoid-core/src/runtime/registry.rs
// ============================================================================
// Module: Key Registry
// Description: Unique-key namespace operations for a scope.
// Purpose: Resolve, create, lock, and remove keys inside a unit of work.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! The key registry owns the unique `text` namespace of a scope. All
//! functions take the open [`ScopeTransaction`] so that callers compose them
//! with repository calls inside a single atomic unit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::debug;

use crate::core::KeyRecord;
use crate::core::ResolvedKey;
use crate::interfaces::ScopeTransaction;
use crate::interfaces::StoreError;
use crate::runtime::FactoidRepository;

// ============================================================================
// SECTION: Key Registry
// ============================================================================

/// Key namespace operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyRegistry;

impl KeyRegistry {
    /// Returns the key for `text`, creating an unlocked one when absent.
    ///
    /// Concurrent callers racing on the same unseen text observe the same
    /// key: a duplicate insertion is a no-op, never an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn get_or_create(
        txn: &mut dyn ScopeTransaction,
        text: &str,
    ) -> Result<ResolvedKey, StoreError> {
        let resolved = txn.get_or_create_key(text)?;
        if resolved.created {
            debug!(key = text, key_id = resolved.key.id.get(), "created factoid key");
        }
        Ok(resolved)
    }

    /// Looks up the key for `text`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn lookup(
        txn: &mut dyn ScopeTransaction,
        text: &str,
    ) -> Result<Option<KeyRecord>, StoreError> {
        txn.find_key(text)
    }

    /// Sets the lock flag; returns false when no key matches `text`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn set_locked(
        txn: &mut dyn ScopeTransaction,
        text: &str,
        locked: bool,
    ) -> Result<bool, StoreError> {
        txn.set_key_locked(text, locked)
    }

    /// Removes a key and every factoid it owns. Factoids go first so the
    /// outcome does not depend on storage-level cascade support.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn remove(txn: &mut dyn ScopeTransaction, key: &KeyRecord) -> Result<u64, StoreError> {
        let removed = FactoidRepository::delete_all_for_key(txn, key.id)?;
        txn.delete_key(key.id)?;
        debug!(key = key.text.as_str(), removed, "removed factoid key");
        Ok(removed)
    }
}
