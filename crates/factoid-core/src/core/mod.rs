// crates/factoid-core/src/core/mod.rs
// ============================================================================
// Module: Factoid Core Types
// Description: Identifiers, timestamps, and records for the factoid store.
// Purpose: Provide stable, serializable types shared by backends and callers.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Core types define scopes, keys, factoids, and the structured results the
//! store hands back to the presentation layer. They carry no storage logic.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod records;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::FactoidId;
pub use identifiers::Identity;
pub use identifiers::KeyId;
pub use identifiers::MAX_SCOPE_ID_LENGTH;
pub use identifiers::ScopeId;
pub use identifiers::ScopeIdError;
pub use records::Factoid;
pub use records::FactoidListing;
pub use records::ForgetOutcome;
pub use records::KeyInfo;
pub use records::KeyRecord;
pub use records::Provenance;
pub use records::RandomFactoid;
pub use records::ResolvedKey;
pub use records::ScopeStats;
pub use records::UnlearnOutcome;
pub use self::time::Clock;
pub use self::time::SystemClock;
pub use self::time::UnixSeconds;
