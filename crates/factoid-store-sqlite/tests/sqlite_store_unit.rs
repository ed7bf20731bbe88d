// crates/factoid-store-sqlite/tests/sqlite_store_unit.rs
// ============================================================================
// Module: SQLite Factoid Store Unit Tests
// Description: Targeted tests for the per-scope SQLite backend.
// Purpose: Validate path safety, schema versioning, persistence, and the
//          factoid store behavior on durable storage.
// ============================================================================

//! ## Overview
//! Unit-level tests for the `SQLite` scope backend:
//! - Root directory and scope path safety checks
//! - Scope file naming for long and case-variant scope ids
//! - Schema creation and version validation
//! - Journal mode pragmas
//! - Persistence across backend restarts
//! - Facade scenarios (ordering, lock gating, cascade) on disk

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::path::Path;
use std::path::PathBuf;

use factoid_core::FactoidError;
use factoid_core::FactoidStore;
use factoid_core::FactoidStoreConfig;
use factoid_core::Identity;
use factoid_core::MAX_SCOPE_ID_LENGTH;
use factoid_core::ScopeBackend;
use factoid_core::ScopeHandle;
use factoid_core::ScopeId;
use factoid_core::StoreError;
use factoid_store_sqlite::MAX_PATH_COMPONENT_LENGTH;
use factoid_store_sqlite::SqliteScopeBackend;
use factoid_store_sqlite::SqliteStoreConfig;
use factoid_store_sqlite::SqliteStoreError;
use factoid_store_sqlite::SqliteStoreMode;
use factoid_store_sqlite::SqliteSyncMode;
use factoid_store_sqlite::scope_file_name;
use rusqlite::Connection;
use rusqlite::params;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const fn config_for_root(root_dir: PathBuf, journal_mode: SqliteStoreMode) -> SqliteStoreConfig {
    SqliteStoreConfig {
        root_dir,
        busy_timeout_ms: 1_000,
        journal_mode,
        sync_mode: SqliteSyncMode::Full,
        read_pool_size: 2,
    }
}

fn backend_for(root: &Path) -> SqliteScopeBackend {
    SqliteScopeBackend::new(config_for_root(root.to_path_buf(), SqliteStoreMode::Wal))
        .expect("backend init")
}

fn store_for(root: &Path) -> FactoidStore<SqliteScopeBackend> {
    FactoidStore::new(backend_for(root), FactoidStoreConfig::default())
}

fn scope(name: &str) -> ScopeId {
    ScopeId::new(name).unwrap()
}

fn texts(store: &FactoidStore<SqliteScopeBackend>, scope: &ScopeId, key: &str) -> Vec<String> {
    store
        .what_is_with_limit(scope, key, 1_000)
        .unwrap()
        .factoids
        .into_iter()
        .map(|factoid| factoid.text)
        .collect()
}

// ============================================================================
// SECTION: Path Safety
// ============================================================================

#[test]
fn sqlite_backend_rejects_empty_root() {
    let config = config_for_root(PathBuf::new(), SqliteStoreMode::Wal);
    let Err(err) = SqliteScopeBackend::new(config) else {
        panic!("expected empty root to fail");
    };
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}

#[test]
fn sqlite_backend_rejects_file_root() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("not-a-dir");
    std::fs::write(&file, b"x").unwrap();
    let Err(err) = SqliteScopeBackend::new(config_for_root(file, SqliteStoreMode::Wal)) else {
        panic!("expected file root to fail");
    };
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}

#[test]
fn sqlite_backend_rejects_overlong_component() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("a".repeat(300));
    let Err(err) = SqliteScopeBackend::new(config_for_root(path, SqliteStoreMode::Wal)) else {
        panic!("expected overlong component to fail");
    };
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}

#[test]
fn sqlite_backend_rejects_overlong_total_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("a".repeat(5000));
    let Err(err) = SqliteScopeBackend::new(config_for_root(path, SqliteStoreMode::Wal)) else {
        panic!("expected overlong path to fail");
    };
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}

#[test]
fn sqlite_backend_creates_missing_root() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("nested").join("factoids");
    let backend = backend_for(&root);
    assert!(root.is_dir());
    backend.readiness().unwrap();
}

#[test]
fn longest_scope_ids_open_and_persist() {
    let temp = TempDir::new().unwrap();
    let ascii = scope(&"#".repeat(MAX_SCOPE_ID_LENGTH));
    let cyrillic = scope(&format!("#{}", "канал".repeat(9)));
    {
        let store = store_for(temp.path());
        for chan in [&ascii, &cyrillic] {
            store.learn(chan, "k", "v", &Identity::new("alice")).unwrap();
            let path = store.backend().scope_path(chan);
            assert!(path.exists());
            assert!(path.file_name().unwrap().len() <= MAX_PATH_COMPONENT_LENGTH);
        }
        assert!(store.close_scope(&ascii).unwrap());
    }

    let store = store_for(temp.path());
    assert_eq!(texts(&store, &ascii, "k"), ["v"]);
    assert_eq!(texts(&store, &cyrillic, "k"), ["v"]);
}

#[test]
fn scopes_differing_only_in_case_use_distinct_files() {
    let temp = TempDir::new().unwrap();
    let store = store_for(temp.path());
    let upper = scope("#Chan");
    let lower = scope("#chan");
    store.learn(&upper, "key", "upper", &Identity::new("a")).unwrap();
    store.learn(&lower, "key", "lower", &Identity::new("a")).unwrap();

    let upper_name = scope_file_name(&upper).to_ascii_lowercase();
    let lower_name = scope_file_name(&lower).to_ascii_lowercase();
    assert_ne!(upper_name, lower_name);
    assert_eq!(texts(&store, &upper, "key"), ["upper"]);
    assert_eq!(texts(&store, &lower, "key"), ["lower"]);
}

// ============================================================================
// SECTION: Schema and Pragmas
// ============================================================================

#[test]
fn ensure_scope_creates_database_lazily() {
    let temp = TempDir::new().unwrap();
    let backend = backend_for(temp.path());
    let chan = scope("#chan");
    let path = backend.scope_path(&chan);
    assert!(!path.exists());

    let handle = backend.ensure_scope(&chan).unwrap();
    assert!(path.exists());
    assert_eq!(handle.scope_id(), &chan);
    assert_eq!(path.file_name().unwrap().to_string_lossy(), scope_file_name(&chan));
}

#[test]
fn ensure_scope_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let backend = backend_for(temp.path());
    let chan = scope("#chan");
    let first = backend.ensure_scope(&chan).unwrap();
    let second = backend.ensure_scope(&chan).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[test]
fn unknown_schema_version_is_rejected() {
    let temp = TempDir::new().unwrap();
    let backend = backend_for(temp.path());
    let chan = scope("#chan");
    let conn = Connection::open(backend.scope_path(&chan)).unwrap();
    conn.execute_batch("CREATE TABLE store_meta (version INTEGER NOT NULL);").unwrap();
    conn.execute("INSERT INTO store_meta (version) VALUES (?1)", params![999_i64]).unwrap();
    drop(conn);

    let err = backend.ensure_scope(&chan).unwrap_err();
    assert!(matches!(err, StoreError::VersionMismatch(_)));
}

#[test]
fn sqlite_backend_sets_wal_mode() {
    let temp = TempDir::new().unwrap();
    let backend = backend_for(temp.path());
    let chan = scope("#chan");
    let _handle = backend.ensure_scope(&chan).unwrap();

    let conn = Connection::open(backend.scope_path(&chan)).unwrap();
    let mode: String = conn.query_row("PRAGMA journal_mode", params![], |row| row.get(0)).unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[test]
fn sqlite_backend_sets_delete_mode() {
    let temp = TempDir::new().unwrap();
    let backend = SqliteScopeBackend::new(config_for_root(
        temp.path().to_path_buf(),
        SqliteStoreMode::Delete,
    ))
    .unwrap();
    let chan = scope("#chan");
    let _handle = backend.ensure_scope(&chan).unwrap();

    let conn = Connection::open(backend.scope_path(&chan)).unwrap();
    let mode: String = conn.query_row("PRAGMA journal_mode", params![], |row| row.get(0)).unwrap();
    assert_eq!(mode.to_lowercase(), "delete");
}

// ============================================================================
// SECTION: Persistence
// ============================================================================

#[test]
fn factoids_survive_backend_restart() {
    let temp = TempDir::new().unwrap();
    let chan = scope("#chan");
    {
        let store = store_for(temp.path());
        store.learn(&chan, "widget", "a small gadget", &Identity::new("alice")).unwrap();
        store.learn(&chan, "widget", "made of parts", &Identity::new("bob")).unwrap();
        store.lock(&chan, "widget").unwrap();
        assert!(store.close_scope(&chan).unwrap());
    }

    let store = store_for(temp.path());
    assert_eq!(texts(&store, &chan, "widget"), ["a small gadget", "made of parts"]);
    let info = store.info(&chan, "widget").unwrap();
    assert!(info.locked);
    assert_eq!(info.entries[1].added_by, Identity::new("bob"));
}

#[test]
fn factoid_ids_are_never_reused() {
    let temp = TempDir::new().unwrap();
    let store = store_for(temp.path());
    let chan = scope("#chan");
    let first = store.learn(&chan, "key", "one", &Identity::new("alice")).unwrap();
    store.unlearn(&chan, "key", None).unwrap();
    let second = store.learn(&chan, "key", "two", &Identity::new("alice")).unwrap();
    assert!(second > first);
}

#[test]
fn scopes_use_separate_files() {
    let temp = TempDir::new().unwrap();
    let store = store_for(temp.path());
    store.learn(&scope("#one"), "shared", "from one", &Identity::new("a")).unwrap();
    store.learn(&scope("#two"), "shared", "from two", &Identity::new("a")).unwrap();

    assert!(store.backend().scope_path(&scope("#one")).exists());
    assert!(store.backend().scope_path(&scope("#two")).exists());
    assert_eq!(texts(&store, &scope("#one"), "shared"), ["from one"]);
    assert_eq!(texts(&store, &scope("#two"), "shared"), ["from two"]);
}

// ============================================================================
// SECTION: Facade Scenarios
// ============================================================================

#[test]
fn ambiguous_unlearn_then_cascade_on_disk() {
    let temp = TempDir::new().unwrap();
    let store = store_for(temp.path());
    let chan = scope("#chan");
    store.learn(&chan, "color", "red", &Identity::new("a")).unwrap();
    store.learn(&chan, "color", "blue", &Identity::new("a")).unwrap();

    assert!(matches!(
        store.unlearn(&chan, "color", None),
        Err(FactoidError::AmbiguousKey { candidates: 2, .. })
    ));
    assert_eq!(store.unlearn(&chan, "color", Some(0)).unwrap().removed.text, "red");
    let last = store.unlearn(&chan, "color", None).unwrap();
    assert!(last.key_removed);

    let conn = Connection::open(store.backend().scope_path(&chan)).unwrap();
    let keys: i64 = conn.query_row("SELECT COUNT(*) FROM keys", params![], |row| row.get(0)).unwrap();
    assert_eq!(keys, 0);
}

#[test]
fn locked_learn_leaves_no_rows_behind() {
    let temp = TempDir::new().unwrap();
    let store = store_for(temp.path());
    let chan = scope("#chan");
    store.learn(&chan, "rule", "be nice", &Identity::new("a")).unwrap();
    store.lock(&chan, "rule").unwrap();
    assert!(matches!(
        store.learn(&chan, "rule", "be mean", &Identity::new("a")),
        Err(FactoidError::Locked { .. })
    ));
    let stats = store.stats(&chan).unwrap();
    assert_eq!(stats.keys, 1);
    assert_eq!(stats.factoids, 1);
}

#[test]
fn truncation_and_positions_on_disk() {
    let temp = TempDir::new().unwrap();
    let store = store_for(temp.path());
    let chan = scope("#chan");
    for index in 0 .. 25 {
        store.learn(&chan, "many", &format!("fact {index}"), &Identity::new("a")).unwrap();
    }
    let listing = store.what_is(&chan, "many").unwrap();
    assert_eq!(listing.shown(), 20);
    assert_eq!(listing.total_count, 25);
    assert_eq!(store.what_is_at(&chan, "many", 24).unwrap().text, "fact 24");
    assert!(matches!(
        store.what_is_at(&chan, "many", 25),
        Err(FactoidError::InvalidPosition { position: 25, count: 25 })
    ));
}

#[test]
fn forget_removes_rows_and_random_sees_empty_scope() {
    let temp = TempDir::new().unwrap();
    let store = store_for(temp.path());
    let chan = scope("#chan");
    store.learn(&chan, "only", "one", &Identity::new("a")).unwrap();
    assert_eq!(store.random_factoid(&chan).unwrap().text, "one");

    assert_eq!(store.forget(&chan, "only").unwrap().removed_count, 1);
    assert!(matches!(store.random_factoid(&chan), Err(FactoidError::Empty)));
}

#[test]
fn failed_write_unit_rolls_back() {
    let temp = TempDir::new().unwrap();
    let backend = backend_for(temp.path());
    let handle = backend.ensure_scope(&scope("#chan")).unwrap();

    let result: Result<(), StoreError> = handle.write(|txn| {
        txn.get_or_create_key("partial")?;
        Err(StoreError::Invalid("abort".to_string()))
    });
    assert!(result.is_err());
    let found = handle.read(|txn| txn.find_key("partial")).unwrap();
    assert!(found.is_none());
}
