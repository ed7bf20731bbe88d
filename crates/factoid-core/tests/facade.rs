// crates/factoid-core/tests/facade.rs
// ============================================================================
// Module: Factoid Store Facade Tests
// Description: Scenario tests for the facade over the in-memory backend.
// Purpose: Validate learn/lookup/lock/unlearn/random/info behavior end to end.
// ============================================================================

//! ## Overview
//! Scenario tests for the factoid store facade:
//! - Learn and lookup ordering with truncation
//! - Lock gating and idempotent lock transitions
//! - Ambiguity and position handling on unlearn
//! - Key cascade on last removal and on forget
//! - Scope isolation and concurrent learners

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

use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::thread;

use factoid_core::Action;
use factoid_core::CapabilityChecker;
use factoid_core::Clock;
use factoid_core::FactoidError;
use factoid_core::FactoidStore;
use factoid_core::FactoidStoreConfig;
use factoid_core::Identity;
use factoid_core::IdentityResolver;
use factoid_core::InMemoryScopeBackend;
use factoid_core::Operation;
use factoid_core::ScopeId;
use factoid_core::UnixSeconds;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Clock that advances one second per reading.
#[derive(Debug, Default)]
struct SteppingClock {
    /// Seconds elapsed since the base time.
    seconds: AtomicI64,
}

impl Clock for SteppingClock {
    fn now(&self) -> UnixSeconds {
        UnixSeconds::new(1_700_000_000 + self.seconds.fetch_add(1, Ordering::SeqCst))
    }
}

type TestStore = FactoidStore<InMemoryScopeBackend, SteppingClock>;

fn store() -> TestStore {
    FactoidStore::with_clock(
        InMemoryScopeBackend::new(),
        SteppingClock::default(),
        FactoidStoreConfig::default(),
    )
}

fn scope(name: &str) -> ScopeId {
    ScopeId::new(name).unwrap()
}

fn alice() -> Identity {
    Identity::new("alice")
}

fn texts(store: &TestStore, scope: &ScopeId, key: &str) -> Vec<String> {
    store
        .what_is(scope, key)
        .unwrap()
        .factoids
        .into_iter()
        .map(|factoid| factoid.text)
        .collect()
}

// ============================================================================
// SECTION: Learn and Lookup
// ============================================================================

#[test]
fn learn_then_what_is_returns_single_factoid() {
    let store = store();
    let chan = scope("#chan");
    store.learn(&chan, "widget", "a small gadget", &alice()).unwrap();

    let listing = store.what_is(&chan, "widget").unwrap();
    assert_eq!(listing.key, "widget");
    assert_eq!(listing.total_count, 1);
    assert_eq!(listing.factoids[0].text, "a small gadget");
    assert_eq!(listing.factoids[0].added_by, alice());
    assert!(!listing.is_truncated());
}

#[test]
fn what_is_on_unknown_key_is_not_found() {
    let store = store();
    let err = store.what_is(&scope("#chan"), "nothing").unwrap_err();
    assert!(matches!(err, FactoidError::NotFound { key } if key == "nothing"));
}

#[test]
fn factoids_are_listed_in_insertion_order() {
    let store = store();
    let chan = scope("#chan");
    for fact in ["red", "blue", "green"] {
        store.learn(&chan, "color", fact, &alice()).unwrap();
    }
    assert_eq!(texts(&store, &chan, "color"), ["red", "blue", "green"]);
}

#[test]
fn listing_is_truncated_to_configured_limit() {
    let store = store();
    let chan = scope("#chan");
    for index in 0 .. 25 {
        store.learn(&chan, "many", &format!("fact {index}"), &alice()).unwrap();
    }

    let listing = store.what_is(&chan, "many").unwrap();
    assert_eq!(listing.shown(), 20);
    assert_eq!(listing.total_count, 25);
    assert!(listing.is_truncated());
    assert_eq!(listing.factoids[0].text, "fact 0");
    assert_eq!(listing.factoids[19].text, "fact 19");

    let wider = store.what_is_with_limit(&chan, "many", 100).unwrap();
    assert_eq!(wider.shown(), 25);
    assert!(!wider.is_truncated());
}

#[test]
fn keys_are_case_sensitive() {
    let store = store();
    let chan = scope("#chan");
    store.learn(&chan, "Rust", "a language", &alice()).unwrap();
    assert!(matches!(store.what_is(&chan, "rust"), Err(FactoidError::NotFound { .. })));
}

#[test]
fn scopes_are_isolated() {
    let store = store();
    store.learn(&scope("#one"), "shared", "from one", &alice()).unwrap();
    store.learn(&scope("#two"), "shared", "from two", &alice()).unwrap();

    assert_eq!(texts(&store, &scope("#one"), "shared"), ["from one"]);
    assert_eq!(texts(&store, &scope("#two"), "shared"), ["from two"]);
    assert!(matches!(store.what_is(&scope("#three"), "shared"), Err(FactoidError::NotFound { .. })));
}

#[test]
fn what_is_at_validates_position() {
    let store = store();
    let chan = scope("#chan");
    store.learn(&chan, "color", "red", &alice()).unwrap();
    store.learn(&chan, "color", "blue", &alice()).unwrap();

    assert_eq!(store.what_is_at(&chan, "color", 1).unwrap().text, "blue");
    let err = store.what_is_at(&chan, "color", 2).unwrap_err();
    assert!(matches!(err, FactoidError::InvalidPosition { position: 2, count: 2 }));
    assert!(matches!(store.what_is_at(&chan, "nope", 0), Err(FactoidError::NotFound { .. })));
}

// ============================================================================
// SECTION: Locking
// ============================================================================

#[test]
fn locked_key_rejects_learn_until_unlocked() {
    let store = store();
    let chan = scope("#chan");
    store.learn(&chan, "rule", "be nice", &alice()).unwrap();
    store.lock(&chan, "rule").unwrap();

    let err = store.learn(&chan, "rule", "be mean", &alice()).unwrap_err();
    assert!(matches!(err, FactoidError::Locked { key } if key == "rule"));
    assert_eq!(texts(&store, &chan, "rule"), ["be nice"]);

    store.unlock(&chan, "rule").unwrap();
    store.learn(&chan, "rule", "be kind", &alice()).unwrap();
    assert_eq!(texts(&store, &chan, "rule"), ["be nice", "be kind"]);
}

#[test]
fn lock_and_unlock_are_idempotent() {
    let store = store();
    let chan = scope("#chan");
    store.learn(&chan, "rule", "be nice", &alice()).unwrap();
    store.lock(&chan, "rule").unwrap();
    store.lock(&chan, "rule").unwrap();
    assert!(store.info(&chan, "rule").unwrap().locked);
    store.unlock(&chan, "rule").unwrap();
    store.unlock(&chan, "rule").unwrap();
    assert!(!store.info(&chan, "rule").unwrap().locked);
}

#[test]
fn lock_unknown_key_is_not_found() {
    let store = store();
    let chan = scope("#chan");
    assert!(matches!(store.lock(&chan, "ghost"), Err(FactoidError::NotFound { .. })));
    assert!(matches!(store.unlock(&chan, "ghost"), Err(FactoidError::NotFound { .. })));
    assert_eq!(store.stats(&chan).unwrap().keys, 0);
}

#[test]
fn unlearn_ignores_lock_flag() {
    let store = store();
    let chan = scope("#chan");
    store.learn(&chan, "rule", "be nice", &alice()).unwrap();
    store.lock(&chan, "rule").unwrap();
    let outcome = store.unlearn(&chan, "rule", None).unwrap();
    assert!(outcome.key_removed);
}

#[test]
fn relearning_after_removal_starts_unlocked() {
    let store = store();
    let chan = scope("#chan");
    store.learn(&chan, "rule", "be nice", &alice()).unwrap();
    store.lock(&chan, "rule").unwrap();
    store.unlearn(&chan, "rule", None).unwrap();

    store.learn(&chan, "rule", "fresh start", &alice()).unwrap();
    assert!(!store.info(&chan, "rule").unwrap().locked);
}

// ============================================================================
// SECTION: Unlearn and Forget
// ============================================================================

#[test]
fn unlearn_requires_position_when_ambiguous() {
    let store = store();
    let chan = scope("#chan");
    store.learn(&chan, "color", "red", &alice()).unwrap();
    store.learn(&chan, "color", "blue", &alice()).unwrap();

    let err = store.unlearn(&chan, "color", None).unwrap_err();
    assert!(matches!(err, FactoidError::AmbiguousKey { candidates: 2, .. }));

    let outcome = store.unlearn(&chan, "color", Some(0)).unwrap();
    assert_eq!(outcome.removed.text, "red");
    assert!(!outcome.key_removed);
    assert_eq!(texts(&store, &chan, "color"), ["blue"]);

    let outcome = store.unlearn(&chan, "color", None).unwrap();
    assert_eq!(outcome.removed.text, "blue");
    assert!(outcome.key_removed);
    assert!(matches!(store.what_is(&chan, "color"), Err(FactoidError::NotFound { .. })));
    assert_eq!(store.stats(&chan).unwrap().keys, 0);
}

#[test]
fn unlearn_rejects_out_of_range_position_without_changes() {
    let store = store();
    let chan = scope("#chan");
    store.learn(&chan, "solo", "only", &alice()).unwrap();

    let err = store.unlearn(&chan, "solo", Some(1)).unwrap_err();
    assert!(matches!(err, FactoidError::InvalidPosition { position: 1, count: 1 }));
    assert_eq!(texts(&store, &chan, "solo"), ["only"]);
}

#[test]
fn unlearn_unknown_key_is_not_found() {
    let store = store();
    let err = store.unlearn(&scope("#chan"), "ghost", Some(0)).unwrap_err();
    assert!(matches!(err, FactoidError::NotFound { .. }));
}

#[test]
fn positions_shift_after_removal() {
    let store = store();
    let chan = scope("#chan");
    for fact in ["a", "b", "c"] {
        store.learn(&chan, "letters", fact, &alice()).unwrap();
    }
    store.unlearn(&chan, "letters", Some(1)).unwrap();
    assert_eq!(store.what_is_at(&chan, "letters", 1).unwrap().text, "c");
}

#[test]
fn forget_removes_key_and_all_factoids() {
    let store = store();
    let chan = scope("#chan");
    for fact in ["a", "b", "c"] {
        store.learn(&chan, "letters", fact, &alice()).unwrap();
    }
    store.learn(&chan, "other", "stays", &alice()).unwrap();

    let outcome = store.forget(&chan, "letters").unwrap();
    assert_eq!(outcome.removed_count, 3);
    let stats = store.stats(&chan).unwrap();
    assert_eq!(stats.keys, 1);
    assert_eq!(stats.factoids, 1);
    assert!(matches!(store.forget(&chan, "letters"), Err(FactoidError::NotFound { .. })));
}

// ============================================================================
// SECTION: Random and Info
// ============================================================================

#[test]
fn random_factoid_on_empty_scope_is_empty() {
    let store = store();
    assert!(matches!(store.random_factoid(&scope("#quiet")), Err(FactoidError::Empty)));
}

#[test]
fn random_factoid_with_single_fact_returns_it() {
    let store = store();
    let chan = scope("#chan");
    store.learn(&chan, "only", "one", &alice()).unwrap();
    for _ in 0 .. 10 {
        let picked = store.random_factoid(&chan).unwrap();
        assert_eq!(picked.key, "only");
        assert_eq!(picked.text, "one");
    }
}

#[test]
fn info_reports_provenance_in_order() {
    let store = store();
    let chan = scope("#chan");
    store.learn(&chan, "color", "red", &alice()).unwrap();
    store.learn(&chan, "color", "blue", &Identity::new("bob")).unwrap();

    let info = store.info(&chan, "color").unwrap();
    assert_eq!(info.key, "color");
    assert!(!info.locked);
    assert_eq!(info.entries.len(), 2);
    assert_eq!(info.entries[0].position, 0);
    assert_eq!(info.entries[0].added_by, alice());
    assert_eq!(info.entries[1].added_by, Identity::new("bob"));
    assert!(info.entries[0].added_at < info.entries[1].added_at);
}

#[test]
fn listing_serializes_with_counts() {
    let store = store();
    let chan = scope("#chan");
    store.learn(&chan, "widget", "a small gadget", &alice()).unwrap();
    let listing = store.what_is(&chan, "widget").unwrap();
    let value = serde_json::to_value(&listing).unwrap();
    assert_eq!(value["key"], "widget");
    assert_eq!(value["total_count"], 1);
    assert_eq!(value["factoids"][0]["added_by"], "alice");
}

// ============================================================================
// SECTION: Capability Gating
// ============================================================================

/// Grants only the learn action.
struct LearnOnly;

impl CapabilityChecker for LearnOnly {
    fn has_capability(&self, _identity: &Identity, _scope: &ScopeId, action: Action) -> bool {
        action == Action::Learn
    }
}

#[test]
fn operations_consult_capability_checker_for_mutations() {
    let chan = scope("#chan");
    assert!(Operation::Learn.permits(&LearnOnly, &alice(), &chan));
    assert!(Operation::WhatIs.permits(&LearnOnly, &alice(), &chan));
    assert!(!Operation::Lock.permits(&LearnOnly, &alice(), &chan));
    assert!(!Operation::Forget.permits(&LearnOnly, &alice(), &chan));
}

/// Resolves `nick!user@host` references to the nick.
struct NickResolver;

impl IdentityResolver for NickResolver {
    fn resolve(&self, caller: &str) -> Identity {
        Identity::new(caller.split('!').next().unwrap_or(caller))
    }
}

#[test]
fn resolved_identity_is_stored_verbatim() {
    let store = store();
    let chan = scope("#chan");
    let identity = NickResolver.resolve("carol!~c@example.net");
    store.learn(&chan, "who", "carol knows", &identity).unwrap();
    let info = store.info(&chan, "who").unwrap();
    assert_eq!(info.entries[0].added_by.as_str(), "carol");
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

#[test]
fn closing_memory_scope_discards_its_contents() {
    let store = store();
    let chan = scope("#ephemeral");
    store.readiness().unwrap();
    store.learn(&chan, "key", "fact", &alice()).unwrap();

    assert!(store.close_scope(&chan).unwrap());
    assert!(!store.close_scope(&chan).unwrap());
    assert!(matches!(store.what_is(&chan, "key"), Err(FactoidError::NotFound { .. })));
    assert_eq!(store.stats(&chan).unwrap().factoids, 0);
}

// ============================================================================
// SECTION: Concurrency
// ============================================================================

#[test]
fn concurrent_learners_share_one_key() {
    let store = Arc::new(store());
    let chan = scope("#busy");
    let workers: Vec<_> = (0 .. 8)
        .map(|worker| {
            let store = Arc::clone(&store);
            let chan = chan.clone();
            thread::spawn(move || {
                for index in 0 .. 25 {
                    store
                        .learn(&chan, "hot", &format!("{worker}-{index}"), &Identity::new("w"))
                        .unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let stats = store.stats(&chan).unwrap();
    assert_eq!(stats.keys, 1);
    assert_eq!(stats.factoids, 200);
    let listing = store.what_is_with_limit(&chan, "hot", 1_000).unwrap();
    let ids: Vec<u64> = listing.factoids.iter().map(|factoid| factoid.id.get()).collect();
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
}
