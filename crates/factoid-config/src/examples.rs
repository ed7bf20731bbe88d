// crates/factoid-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration for the factoid store.
// Purpose: Ship a documented factoids.toml that always passes validation.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The example enables the durable backend with every tunable spelled out.

/// Returns a complete example `factoids.toml`.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[store]
type = "sqlite"
root_dir = "data/factoids"
busy_timeout_ms = 5000
journal_mode = "wal"
sync_mode = "full"
read_pool_size = 4

[query]
whatis_limit = 20
"#,
    )
}
