// crates/factoid-core/src/core/records.rs
// ============================================================================
// Module: Factoid Records
// Description: Stored rows and structured operation results.
// Purpose: Hand typed data to the presentation layer instead of rendered text.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Records mirror the persisted layout (keys and factoids) and the results of
//! facade operations. Wording, pluralization, and list shrinking are left to
//! the caller; these types only carry data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::FactoidId;
use crate::core::identifiers::Identity;
use crate::core::identifiers::KeyId;
use crate::core::time::UnixSeconds;

// ============================================================================
// SECTION: Stored Rows
// ============================================================================

/// A key row.
///
/// # Invariants
/// - `text` is unique within its scope.
/// - A persisted key always owns at least one factoid once the enclosing
///   transaction commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Surrogate key identifier.
    pub id: KeyId,
    /// Lookup text (case-sensitive).
    pub text: String,
    /// Whether new factoids are rejected for this key.
    pub locked: bool,
}

/// Result of an atomic get-or-create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    /// The resolved key row.
    pub key: KeyRecord,
    /// True when this call inserted the row.
    pub created: bool,
}

/// A factoid row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factoid {
    /// Surrogate factoid identifier (insertion ordered).
    pub id: FactoidId,
    /// Owning key.
    pub key_id: KeyId,
    /// Contributor identity, verbatim.
    pub added_by: Identity,
    /// Insertion time.
    pub added_at: UnixSeconds,
    /// Fact content.
    pub text: String,
}

// ============================================================================
// SECTION: Operation Results
// ============================================================================

/// Ordered, possibly truncated list of factoids for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoidListing {
    /// Key text the listing was requested for.
    pub key: String,
    /// Factoids in ascending id order; position 0 is the oldest.
    pub factoids: Vec<Factoid>,
    /// Number of factoids stored for the key, including unshown ones.
    pub total_count: u64,
}

impl FactoidListing {
    /// Number of factoids included in this listing.
    #[must_use]
    pub fn shown(&self) -> usize {
        self.factoids.len()
    }

    /// Returns true when more factoids exist than were returned.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        u64::try_from(self.factoids.len()).unwrap_or(u64::MAX) < self.total_count
    }
}

/// Who added a factoid and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Zero-based position in the key's ordering.
    pub position: usize,
    /// Contributor identity.
    pub added_by: Identity,
    /// Insertion time.
    pub added_at: UnixSeconds,
}

/// Lock state and provenance of every factoid under a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// Key text.
    pub key: String,
    /// Current lock flag.
    pub locked: bool,
    /// One entry per factoid in ascending id order.
    pub entries: Vec<Provenance>,
}

/// A factoid picked uniformly at random from a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomFactoid {
    /// Text of the owning key.
    pub key: String,
    /// Fact content.
    pub text: String,
}

/// Result of removing one factoid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlearnOutcome {
    /// The removed factoid.
    pub removed: Factoid,
    /// True when the removal emptied the key and the key row was deleted.
    pub key_removed: bool,
}

/// Result of removing a whole key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgetOutcome {
    /// Number of factoids removed with the key.
    pub removed_count: u64,
}

/// Row counts for one scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeStats {
    /// Number of keys.
    pub keys: u64,
    /// Number of factoids.
    pub factoids: u64,
}
