// crates/factoid-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Factoid Store
// Description: Durable ScopeBackend using one SQLite database per scope.
// Purpose: Provide production persistence for the factoid store.
// Dependencies: factoid-core, rusqlite, sha2, tracing
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`ScopeBackend`] for the factoid
//! store. Each scope lives in its own database file under a configured root
//! directory, created lazily the first time the scope is touched. Writes run
//! in immediate transactions on a single writer connection per scope; reads
//! use a small pool of read-only connections.
//!
//! [`ScopeBackend`]: factoid_core::ScopeBackend

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod paths;
pub mod schema;
pub mod store;
mod transaction;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use paths::MAX_PATH_COMPONENT_LENGTH;
pub use paths::MAX_TOTAL_PATH_LENGTH;
pub use paths::PathLimitViolation;
pub use paths::SCOPE_FILE_SUFFIX;
pub use paths::check_path_limits;
pub use paths::scope_file_name;
pub use schema::SCHEMA_VERSION;
pub use store::SqliteScopeBackend;
pub use store::SqliteScopeHandle;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
