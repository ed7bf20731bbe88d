// crates/factoid-core/src/interfaces/mod.rs
// ============================================================================
// Module: Factoid Interfaces
// Description: Backend-agnostic storage and collaborator interfaces.
// Purpose: Define the contract surfaces used by the factoid store facade.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the factoid store integrates with persistence and
//! with the authorization and identity collaborators, without embedding any
//! backend-specific detail.
//!
//! Backends expose one [`ScopeHandle`] per scope. Every multi-step sequence
//! runs inside [`ScopeHandle::write`], which is atomic and serialized per
//! scope; [`ScopeHandle::read`] observes a consistent snapshot.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::Factoid;
use crate::core::FactoidId;
use crate::core::Identity;
use crate::core::KeyId;
use crate::core::KeyRecord;
use crate::core::RandomFactoid;
use crate::core::ResolvedKey;
use crate::core::ScopeId;
use crate::core::UnixSeconds;

// ============================================================================
// SECTION: Storage Errors
// ============================================================================

/// Persistence failures surfaced by scope backends.
///
/// # Invariants
/// - A failed write unit leaves the scope unchanged.
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("factoid store io error: {0}")]
    Io(String),
    /// Storage engine error.
    #[error("factoid store db error: {0}")]
    Db(String),
    /// Stored data failed integrity checks.
    #[error("factoid store corruption: {0}")]
    Corrupt(String),
    /// Stored schema version is incompatible.
    #[error("factoid store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store input or configuration is invalid.
    #[error("factoid store invalid data: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Scope Storage
// ============================================================================

/// Row-level primitives a backend provides inside one unit of work.
///
/// Implementations operate on a single scope. Positions and offsets are
/// zero-based over ascending factoid id order.
pub trait ScopeTransaction {
    /// Returns the key for `text`, inserting an unlocked key if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn get_or_create_key(&mut self, text: &str) -> Result<ResolvedKey, StoreError>;

    /// Looks up the key for `text`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn find_key(&mut self, text: &str) -> Result<Option<KeyRecord>, StoreError>;

    /// Sets the lock flag for `text`; returns false when no key matches.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn set_key_locked(&mut self, text: &str, locked: bool) -> Result<bool, StoreError>;

    /// Deletes the key row; returns false when it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn delete_key(&mut self, key_id: KeyId) -> Result<bool, StoreError>;

    /// Counts keys in the scope.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn count_keys(&mut self) -> Result<u64, StoreError>;

    /// Inserts a factoid and returns its new identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn append_factoid(
        &mut self,
        key_id: KeyId,
        added_by: &Identity,
        added_at: UnixSeconds,
        text: &str,
    ) -> Result<FactoidId, StoreError>;

    /// Lists factoids for a key in ascending id order, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn list_factoids(
        &mut self,
        key_id: KeyId,
        limit: Option<usize>,
    ) -> Result<Vec<Factoid>, StoreError>;

    /// Counts factoids owned by a key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn count_factoids(&mut self, key_id: KeyId) -> Result<u64, StoreError>;

    /// Returns the factoid at `position` within the key's ordering.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn factoid_at(&mut self, key_id: KeyId, position: usize)
    -> Result<Option<Factoid>, StoreError>;

    /// Deletes one factoid row; returns false when it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn delete_factoid(&mut self, factoid_id: FactoidId) -> Result<bool, StoreError>;

    /// Deletes every factoid owned by a key and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn delete_factoids_for_key(&mut self, key_id: KeyId) -> Result<u64, StoreError>;

    /// Counts every factoid in the scope.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn count_all_factoids(&mut self) -> Result<u64, StoreError>;

    /// Returns the factoid at `offset` in scope-wide id order with its key text.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn factoid_at_offset(&mut self, offset: u64) -> Result<Option<RandomFactoid>, StoreError>;
}

/// Open storage for one scope.
pub trait ScopeHandle: Send + Sync {
    /// Scope this handle serves.
    fn scope_id(&self) -> &ScopeId;

    /// Runs `op` as one atomic unit, serialized against other writers of this
    /// scope. Commits when `op` returns `Ok`, rolls back otherwise.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `op`, or a [`StoreError`] converted into
    /// `E` when the unit cannot be started or committed.
    fn write<T, E, F>(&self, op: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn ScopeTransaction) -> Result<T, E>;

    /// Runs `op` against a consistent snapshot. Changes made by `op` are not
    /// persisted.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `op`, or a [`StoreError`] converted into
    /// `E` when the snapshot cannot be opened.
    fn read<T, E, F>(&self, op: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn ScopeTransaction) -> Result<T, E>;
}

/// Provider of per-scope storage handles.
pub trait ScopeBackend: Send + Sync {
    /// Handle type returned for each scope.
    type Handle: ScopeHandle;

    /// Opens or creates the storage for `scope`. Idempotent: repeated calls
    /// return the same live handle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when storage cannot be opened or initialized.
    fn ensure_scope(&self, scope: &ScopeId) -> Result<Arc<Self::Handle>, StoreError>;

    /// Releases the cached handle for `scope`; returns false if none was open.
    /// Durable backends keep the stored data for the next `ensure_scope`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the handle registry is unavailable.
    fn close_scope(&self, scope: &ScopeId) -> Result<bool, StoreError>;

    /// Reports backend readiness for liveness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Authorization Collaborator
// ============================================================================

/// Mutating actions gated by the authorization collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Add a factoid.
    Learn,
    /// Lock a key.
    Lock,
    /// Unlock a key.
    Unlock,
    /// Remove factoids.
    Unlearn,
}

impl Action {
    /// Returns the stable action label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Learn => "learn",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::Unlearn => "unlearn",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization decision source. Callers consult it before invoking a
/// mutating store operation; the store never calls it itself.
pub trait CapabilityChecker {
    /// Returns true when `identity` may perform `action` in `scope`.
    fn has_capability(&self, identity: &Identity, scope: &ScopeId, action: Action) -> bool;
}

// ============================================================================
// SECTION: Identity Collaborator
// ============================================================================

/// Maps a caller reference (for example a hostmask) to a stored identity.
pub trait IdentityResolver {
    /// Resolves the identity recorded as a factoid's contributor.
    fn resolve(&self, caller: &str) -> Identity;
}
