// crates/factoid-core/src/runtime/random.rs
// ============================================================================
// Module: Random Factoid Picker
// Description: Uniform random selection across a whole scope.
// Purpose: Pick one factoid with equal probability, independent of key sizes.
// Dependencies: crate::{core, interfaces}, rand
// ============================================================================

//! ## Overview
//! The picker counts every factoid in the scope, draws a uniform offset, and
//! resolves the factoid at that offset in id order. Callers run it inside a
//! read snapshot so the count and the lookup agree.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::Rng;

use crate::core::RandomFactoid;
use crate::interfaces::ScopeTransaction;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Random Picker
// ============================================================================

/// Scope-wide uniform factoid selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPicker;

impl RandomPicker {
    /// Picks one factoid uniformly at random; `None` when the scope is empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails or the snapshot is
    /// inconsistent.
    pub fn pick<R: Rng + ?Sized>(
        txn: &mut dyn ScopeTransaction,
        rng: &mut R,
    ) -> Result<Option<RandomFactoid>, StoreError> {
        let total = txn.count_all_factoids()?;
        if total == 0 {
            return Ok(None);
        }
        let offset = rng.gen_range(0 .. total);
        match txn.factoid_at_offset(offset)? {
            Some(picked) => Ok(Some(picked)),
            None => Err(StoreError::Corrupt(format!(
                "factoid offset {offset} missing from snapshot of {total}"
            ))),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
