// crates/factoid-core/src/lib.rs
// ============================================================================
// Module: Factoid Core Library
// Description: Public API surface for the factoid store core.
// Purpose: Expose core types, interfaces, and the store facade.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Factoid core provides a per-scope key to fact store: each key owns an
//! ordered list of free-text factoids plus a lock flag gating further
//! additions. It is backend-agnostic and integrates with persistence through
//! the [`ScopeBackend`] interface; an in-memory backend ships for tests and
//! embedding, and `factoid-store-sqlite` provides the durable one.
//!
//! Authorization and identity resolution are external collaborators: the
//! store consumes an already-authenticated [`Identity`] and exposes which
//! [`Action`] each mutating [`Operation`] requires.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;
pub use crate::interfaces::Action;
pub use crate::interfaces::CapabilityChecker;
pub use crate::interfaces::IdentityResolver;
pub use crate::interfaces::ScopeBackend;
pub use crate::interfaces::ScopeHandle;
pub use crate::interfaces::ScopeTransaction;
pub use crate::interfaces::StoreError;
pub use crate::runtime::DEFAULT_WHATIS_LIMIT;
pub use crate::runtime::FactoidError;
pub use crate::runtime::FactoidRepository;
pub use crate::runtime::FactoidStore;
pub use crate::runtime::FactoidStoreConfig;
pub use crate::runtime::InMemoryScopeBackend;
pub use crate::runtime::KeyRegistry;
pub use crate::runtime::Operation;
pub use crate::runtime::RandomPicker;
