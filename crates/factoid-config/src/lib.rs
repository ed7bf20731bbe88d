// crates/factoid-config/src/lib.rs
// ============================================================================
// Module: Factoid Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for factoids.toml semantics.
// Dependencies: factoid-core, factoid-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `factoid-config` defines the configuration model for the factoid store.
//! Loading is strict and fails closed: oversized, non-UTF-8, unknown-field,
//! or out-of-range configuration is rejected before any store is opened.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
