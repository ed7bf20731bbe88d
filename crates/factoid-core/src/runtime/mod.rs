// crates/factoid-core/src/runtime/mod.rs
// ============================================================================
// Module: Factoid Runtime
// Description: Key registry, factoid repository, random picker, and facade.
// Purpose: Implement the store operations on top of any ScopeBackend.
// Dependencies: crate::{core, interfaces}, rand, tracing
// ============================================================================

//! ## Overview
//! Runtime modules implement the factoid store semantics. Storage backends
//! supply row-level primitives; everything that spans rows (lock checks,
//! ambiguity handling, cascading key removal) lives here so it holds for
//! every backend.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod memory;
pub mod random;
pub mod registry;
pub mod repository;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use memory::InMemoryScopeBackend;
pub use memory::InMemoryScopeHandle;
pub use random::RandomPicker;
pub use registry::KeyRegistry;
pub use repository::FactoidRepository;
pub use store::DEFAULT_WHATIS_LIMIT;
pub use store::FactoidError;
pub use store::FactoidStore;
pub use store::FactoidStoreConfig;
pub use store::Operation;
