// crates/factoid-core/src/core/identifiers.rs
// ============================================================================
// Module: Factoid Identifiers
// Description: Opaque identifiers for scopes, keys, factoids, and contributors.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Scopes are caller-supplied strings (one per channel in a chat deployment).
//! Key and factoid identifiers are storage surrogates: non-zero, 1-based, and
//! for factoids monotonically increasing in insertion order, which makes them
//! the canonical display order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU64;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a scope identifier in bytes.
pub const MAX_SCOPE_ID_LENGTH: usize = 256;

// ============================================================================
// SECTION: Scope Identifier
// ============================================================================

/// Scope identifier validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeIdError {
    /// Scope identifier was empty.
    #[error("scope id must be non-empty")]
    Empty,
    /// Scope identifier exceeded [`MAX_SCOPE_ID_LENGTH`].
    #[error("scope id exceeds {MAX_SCOPE_ID_LENGTH} bytes: {0}")]
    TooLong(usize),
}

/// Isolation unit owning an independent key/fact namespace.
///
/// # Invariants
/// - Non-empty UTF-8, at most [`MAX_SCOPE_ID_LENGTH`] bytes.
/// - Compared byte-for-byte; no case folding is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScopeId(String);

impl ScopeId {
    /// Creates a scope identifier after validating its length.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeIdError`] when the identifier is empty or too long.
    pub fn new(id: impl Into<String>) -> Result<Self, ScopeIdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ScopeIdError::Empty);
        }
        if id.len() > MAX_SCOPE_ID_LENGTH {
            return Err(ScopeIdError::TooLong(id.len()));
        }
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for ScopeId {
    type Error = ScopeIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ScopeId {
    type Error = ScopeIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ScopeId> for String {
    fn from(value: ScopeId) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Surrogate Identifiers
// ============================================================================

/// Surrogate identifier of a key within one scope.
///
/// # Invariants
/// - Always >= 1 (non-zero, 1-based).
/// - Stable for the lifetime of the key row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(NonZeroU64);

impl KeyId {
    /// Creates a new key identifier from a non-zero value.
    #[must_use]
    pub const fn new(id: NonZeroU64) -> Self {
        Self(id)
    }

    /// Creates a key identifier from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the raw identifier value (always >= 1).
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

/// Surrogate identifier of a factoid within one scope.
///
/// # Invariants
/// - Always >= 1 (non-zero, 1-based).
/// - Strictly increasing in insertion order and never reused within a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactoidId(NonZeroU64);

impl FactoidId {
    /// Creates a new factoid identifier from a non-zero value.
    #[must_use]
    pub const fn new(id: NonZeroU64) -> Self {
        Self(id)
    }

    /// Creates a factoid identifier from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the raw identifier value (always >= 1).
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for FactoidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Contributor identity supplied by the identity-resolution collaborator.
///
/// # Invariants
/// - Opaque UTF-8 string; stored and returned verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Creates a new identity.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
