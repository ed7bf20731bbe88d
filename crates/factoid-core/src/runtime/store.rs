// crates/factoid-core/src/runtime/store.rs
// ============================================================================
// Module: Factoid Store Facade
// Description: Public factoid operations composed from registry and repository.
// Purpose: Enforce cross-row invariants (lock gating, cascade, ambiguity).
// Dependencies: crate::{core, interfaces, runtime}, rand, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`FactoidStore`] is the single entry point callers use. Each operation
//! resolves the scope handle, then runs exactly one unit of work:
//! - `learn` resolves or creates the key, checks the lock flag, and appends,
//!   all while holding the scope's write serialization.
//! - `unlearn` picks the target position, deletes, and cascades the key
//!   removal in the same unit.
//! - lookups run against a read snapshot.
//!
//! Authorization is not checked here. [`Operation::requires_capability`]
//! tells callers which [`Action`] to check before invoking a mutation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::core::Clock;
use crate::core::Factoid;
use crate::core::FactoidId;
use crate::core::FactoidListing;
use crate::core::ForgetOutcome;
use crate::core::Identity;
use crate::core::KeyInfo;
use crate::core::Provenance;
use crate::core::RandomFactoid;
use crate::core::ScopeId;
use crate::core::ScopeStats;
use crate::core::SystemClock;
use crate::core::UnlearnOutcome;
use crate::interfaces::Action;
use crate::interfaces::CapabilityChecker;
use crate::interfaces::ScopeBackend;
use crate::interfaces::ScopeHandle;
use crate::interfaces::StoreError;
use crate::runtime::FactoidRepository;
use crate::runtime::KeyRegistry;
use crate::runtime::RandomPicker;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default number of factoids returned by `what_is`.
pub const DEFAULT_WHATIS_LIMIT: usize = 20;

/// Facade configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactoidStoreConfig {
    /// Maximum factoids returned by [`FactoidStore::what_is`].
    pub whatis_limit: usize,
}

impl Default for FactoidStoreConfig {
    fn default() -> Self {
        Self {
            whatis_limit: DEFAULT_WHATIS_LIMIT,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Typed outcomes of failed factoid operations.
///
/// # Invariants
/// - Variants carry the data the presentation layer needs for wording.
#[derive(Debug, Error)]
pub enum FactoidError {
    /// No factoids exist for the key.
    #[error("no factoid matches key '{key}'")]
    NotFound {
        /// Requested key text.
        key: String,
    },
    /// The key is locked against new factoids.
    #[error("key '{key}' is locked")]
    Locked {
        /// Requested key text.
        key: String,
    },
    /// Several factoids match and no position was given.
    #[error("{candidates} factoids match key '{key}'; a position is required")]
    AmbiguousKey {
        /// Requested key text.
        key: String,
        /// Number of factoids under the key.
        candidates: u64,
    },
    /// The position is outside the key's factoid range.
    #[error("invalid factoid position {position} (key has {count})")]
    InvalidPosition {
        /// Requested zero-based position.
        position: usize,
        /// Number of factoids under the key.
        count: u64,
    },
    /// The scope holds no factoids.
    #[error("scope has no factoids")]
    Empty,
    /// Persistence failed; the unit was rolled back.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl FactoidError {
    /// Builds a not-found error for `key`.
    fn not_found(key: &str) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Facade operations, for capability gating by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Add a factoid.
    Learn,
    /// List factoids for a key.
    WhatIs,
    /// Fetch one factoid by position.
    WhatIsAt,
    /// Lock a key.
    Lock,
    /// Unlock a key.
    Unlock,
    /// Remove one factoid.
    Unlearn,
    /// Remove a key with all of its factoids.
    Forget,
    /// Pick a random factoid.
    RandomFactoid,
    /// Report lock state and provenance.
    Info,
    /// Report scope row counts.
    Stats,
}

impl Operation {
    /// Returns the capability a caller must hold, or `None` for reads.
    #[must_use]
    pub const fn requires_capability(self) -> Option<Action> {
        match self {
            Self::Learn => Some(Action::Learn),
            Self::Lock => Some(Action::Lock),
            Self::Unlock => Some(Action::Unlock),
            Self::Unlearn | Self::Forget => Some(Action::Unlearn),
            Self::WhatIs | Self::WhatIsAt | Self::RandomFactoid | Self::Info | Self::Stats => {
                None
            }
        }
    }

    /// Asks `checker` whether `identity` may run this operation in `scope`.
    /// Operations without a capability requirement are always permitted.
    #[must_use]
    pub fn permits<C: CapabilityChecker + ?Sized>(
        self,
        checker: &C,
        identity: &Identity,
        scope: &ScopeId,
    ) -> bool {
        self.requires_capability()
            .is_none_or(|action| checker.has_capability(identity, scope, action))
    }
}

// ============================================================================
// SECTION: Store Facade
// ============================================================================

/// Per-scope key to factoid store.
///
/// # Invariants
/// - A key with zero factoids never survives a committed operation.
/// - `learn` never writes a factoid under a locked key.
/// - Positions refer to ascending factoid id order at the time of the call.
#[derive(Debug)]
pub struct FactoidStore<B, C = SystemClock> {
    /// Scope storage backend.
    backend: B,
    /// Time source for `added_at` stamps.
    clock: C,
    /// Facade configuration.
    config: FactoidStoreConfig,
}

impl<B: ScopeBackend> FactoidStore<B> {
    /// Creates a store that stamps factoids with wall-clock time.
    #[must_use]
    pub const fn new(backend: B, config: FactoidStoreConfig) -> Self {
        Self::with_clock(backend, SystemClock, config)
    }
}

impl<B: ScopeBackend, C: Clock> FactoidStore<B, C> {
    /// Creates a store with an explicit time source.
    #[must_use]
    pub const fn with_clock(backend: B, clock: C, config: FactoidStoreConfig) -> Self {
        Self {
            backend,
            clock,
            config,
        }
    }

    /// Returns the storage backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the facade configuration.
    #[must_use]
    pub const fn config(&self) -> &FactoidStoreConfig {
        &self.config
    }

    /// Opens (or creates) the scope's storage.
    fn scope(&self, scope: &ScopeId) -> Result<Arc<B::Handle>, FactoidError> {
        Ok(self.backend.ensure_scope(scope)?)
    }

    /// Adds `fact` under `key`, creating the key when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`FactoidError::Locked`] when the key exists and is locked;
    /// nothing is written in that case.
    pub fn learn(
        &self,
        scope: &ScopeId,
        key: &str,
        fact: &str,
        identity: &Identity,
    ) -> Result<FactoidId, FactoidError> {
        let added_at = self.clock.now();
        let result = self.scope(scope)?.write(|txn| {
            let resolved = KeyRegistry::get_or_create(txn, key)?;
            if resolved.key.locked {
                return Err(FactoidError::Locked {
                    key: key.to_string(),
                });
            }
            Ok(FactoidRepository::append(txn, resolved.key.id, identity, added_at, fact)?)
        });
        match &result {
            Ok(id) => debug!(%scope, key, factoid_id = id.get(), by = %identity, "learned factoid"),
            Err(FactoidError::Locked { .. }) => {
                warn!(%scope, key, by = %identity, "rejected factoid for locked key");
            }
            Err(_) => {}
        }
        result
    }

    /// Lists up to the configured limit of factoids for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`FactoidError::NotFound`] when the key has no factoids.
    pub fn what_is(&self, scope: &ScopeId, key: &str) -> Result<FactoidListing, FactoidError> {
        self.what_is_with_limit(scope, key, self.config.whatis_limit)
    }

    /// Lists up to `limit` factoids for `key` with the true total count.
    ///
    /// # Errors
    ///
    /// Returns [`FactoidError::NotFound`] when the key has no factoids.
    pub fn what_is_with_limit(
        &self,
        scope: &ScopeId,
        key: &str,
        limit: usize,
    ) -> Result<FactoidListing, FactoidError> {
        self.scope(scope)?.read(|txn| {
            let record = KeyRegistry::lookup(txn, key)?.ok_or_else(|| FactoidError::not_found(key))?;
            let (factoids, total_count) = FactoidRepository::list_ordered(txn, record.id, limit)?;
            if total_count == 0 {
                return Err(FactoidError::not_found(key));
            }
            Ok(FactoidListing {
                key: record.text,
                factoids,
                total_count,
            })
        })
    }

    /// Returns the single factoid at zero-based `position` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`FactoidError::NotFound`] when the key has no factoids and
    /// [`FactoidError::InvalidPosition`] when `position` is out of range.
    pub fn what_is_at(
        &self,
        scope: &ScopeId,
        key: &str,
        position: usize,
    ) -> Result<Factoid, FactoidError> {
        self.scope(scope)?.read(|txn| {
            let record = KeyRegistry::lookup(txn, key)?.ok_or_else(|| FactoidError::not_found(key))?;
            let count = FactoidRepository::count_for_key(txn, record.id)?;
            if count == 0 {
                return Err(FactoidError::not_found(key));
            }
            txn.factoid_at(record.id, position)?.ok_or(FactoidError::InvalidPosition {
                position,
                count,
            })
        })
    }

    /// Locks `key` against new factoids.
    ///
    /// # Errors
    ///
    /// Returns [`FactoidError::NotFound`] when the key does not exist.
    pub fn lock(&self, scope: &ScopeId, key: &str) -> Result<(), FactoidError> {
        self.set_locked(scope, key, true)
    }

    /// Unlocks `key`.
    ///
    /// # Errors
    ///
    /// Returns [`FactoidError::NotFound`] when the key does not exist.
    pub fn unlock(&self, scope: &ScopeId, key: &str) -> Result<(), FactoidError> {
        self.set_locked(scope, key, false)
    }

    /// Shared lock/unlock path.
    fn set_locked(&self, scope: &ScopeId, key: &str, locked: bool) -> Result<(), FactoidError> {
        self.scope(scope)?.write(|txn| {
            if KeyRegistry::set_locked(txn, key, locked)? {
                Ok(())
            } else {
                Err(FactoidError::not_found(key))
            }
        })?;
        debug!(%scope, key, locked, "updated key lock");
        Ok(())
    }

    /// Removes one factoid from `key`. With a single factoid the position may
    /// be omitted; a supplied position is always range-checked. Removing the
    /// last factoid deletes the key.
    ///
    /// # Errors
    ///
    /// Returns [`FactoidError::NotFound`] when the key has no factoids,
    /// [`FactoidError::AmbiguousKey`] when several exist and no position was
    /// given, and [`FactoidError::InvalidPosition`] when out of range.
    pub fn unlearn(
        &self,
        scope: &ScopeId,
        key: &str,
        position: Option<usize>,
    ) -> Result<UnlearnOutcome, FactoidError> {
        let outcome = self.scope(scope)?.write(|txn| {
            let record = KeyRegistry::lookup(txn, key)?.ok_or_else(|| FactoidError::not_found(key))?;
            let count = FactoidRepository::count_for_key(txn, record.id)?;
            let position = match (position, count) {
                (_, 0) => return Err(FactoidError::not_found(key)),
                (Some(position), _) => position,
                (None, 1) => 0,
                (None, candidates) => {
                    return Err(FactoidError::AmbiguousKey {
                        key: key.to_string(),
                        candidates,
                    });
                }
            };
            FactoidRepository::delete_at(txn, record.id, position)?
                .ok_or(FactoidError::InvalidPosition { position, count })
        })?;
        debug!(
            %scope,
            key,
            factoid_id = outcome.removed.id.get(),
            key_removed = outcome.key_removed,
            "unlearned factoid"
        );
        Ok(outcome)
    }

    /// Removes `key` together with every factoid it owns.
    ///
    /// # Errors
    ///
    /// Returns [`FactoidError::NotFound`] when the key does not exist.
    pub fn forget(&self, scope: &ScopeId, key: &str) -> Result<ForgetOutcome, FactoidError> {
        let removed_count = self.scope(scope)?.write(|txn| {
            let record = KeyRegistry::lookup(txn, key)?.ok_or_else(|| FactoidError::not_found(key))?;
            Ok::<_, FactoidError>(KeyRegistry::remove(txn, &record)?)
        })?;
        Ok(ForgetOutcome {
            removed_count,
        })
    }

    /// Picks one factoid uniformly at random from the whole scope.
    ///
    /// # Errors
    ///
    /// Returns [`FactoidError::Empty`] when the scope holds no factoids.
    pub fn random_factoid(&self, scope: &ScopeId) -> Result<RandomFactoid, FactoidError> {
        self.scope(scope)?.read(|txn| {
            RandomPicker::pick(txn, &mut rand::thread_rng())?.ok_or(FactoidError::Empty)
        })
    }

    /// Reports the lock flag and who added each factoid under `key`, and when.
    ///
    /// # Errors
    ///
    /// Returns [`FactoidError::NotFound`] when the key does not exist.
    pub fn info(&self, scope: &ScopeId, key: &str) -> Result<KeyInfo, FactoidError> {
        self.scope(scope)?.read(|txn| {
            let record = KeyRegistry::lookup(txn, key)?.ok_or_else(|| FactoidError::not_found(key))?;
            let entries = txn
                .list_factoids(record.id, None)?
                .into_iter()
                .enumerate()
                .map(|(position, factoid)| Provenance {
                    position,
                    added_by: factoid.added_by,
                    added_at: factoid.added_at,
                })
                .collect();
            Ok(KeyInfo {
                key: record.text,
                locked: record.locked,
                entries,
            })
        })
    }

    /// Returns key and factoid counts for the scope.
    ///
    /// # Errors
    ///
    /// Returns [`FactoidError::Storage`] when the backend fails.
    pub fn stats(&self, scope: &ScopeId) -> Result<ScopeStats, FactoidError> {
        self.scope(scope)?.read(|txn| {
            Ok(ScopeStats {
                keys: txn.count_keys()?,
                factoids: txn.count_all_factoids()?,
            })
        })
    }

    /// Releases the scope's open handle.
    ///
    /// # Errors
    ///
    /// Returns [`FactoidError::Storage`] when the backend fails.
    pub fn close_scope(&self, scope: &ScopeId) -> Result<bool, FactoidError> {
        Ok(self.backend.close_scope(scope)?)
    }

    /// Reports backend readiness.
    ///
    /// # Errors
    ///
    /// Returns [`FactoidError::Storage`] when the backend is unavailable.
    pub fn readiness(&self) -> Result<(), FactoidError> {
        Ok(self.backend.readiness()?)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
