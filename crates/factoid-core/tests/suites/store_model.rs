// crates/factoid-core/tests/suites/store_model.rs
// ============================================================================
// Module: Factoid Store Model Suite
// Description: Random step sequences and a reference model of one scope.
// Purpose: Check any backend's store behavior against the same model.
// ============================================================================

//! Shared model-based check for factoid store backends.

use std::collections::BTreeMap;

use factoid_core::FactoidError;
use factoid_core::FactoidStore;
use factoid_core::Identity;
use factoid_core::ScopeBackend;
use factoid_core::ScopeId;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

/// One step applied to both the store and the model.
#[derive(Debug, Clone)]
pub enum Step {
    /// Learn a fact.
    Learn(String, String),
    /// Unlearn by optional position.
    Unlearn(String, Option<usize>),
    /// Lock a key.
    Lock(String),
    /// Unlock a key.
    Unlock(String),
    /// Forget a key.
    Forget(String),
}

/// Reference model: key to (locked, facts in order).
type Model = BTreeMap<String, (bool, Vec<String>)>;

/// Strategy over a small key set so steps collide.
fn key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just("a".to_string()), Just("b".to_string()), Just("c".to_string())]
}

/// Strategy producing weighted store steps over three keys.
pub fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (key_strategy(), "[a-z]{1,6}").prop_map(|(key, fact)| Step::Learn(key, fact)),
        2 => (key_strategy(), prop::option::of(0usize .. 4))
            .prop_map(|(key, position)| Step::Unlearn(key, position)),
        1 => key_strategy().prop_map(Step::Lock),
        1 => key_strategy().prop_map(Step::Unlock),
        1 => key_strategy().prop_map(Step::Forget),
    ]
}

/// Applies a step to the model; returns whether the store should accept it.
fn apply_to_model(model: &mut Model, step: &Step) -> bool {
    match step {
        Step::Learn(key, fact) => {
            let entry = model.entry(key.clone()).or_insert((false, Vec::new()));
            if entry.0 {
                return false;
            }
            entry.1.push(fact.clone());
            true
        }
        Step::Unlearn(key, position) => {
            let Some((_, facts)) = model.get_mut(key) else {
                return false;
            };
            let index = match (position, facts.len()) {
                (Some(index), len) if *index < len => *index,
                (None, 1) => 0,
                _ => return false,
            };
            facts.remove(index);
            if facts.is_empty() {
                model.remove(key);
            }
            true
        }
        Step::Lock(key) | Step::Unlock(key) => {
            let Some(entry) = model.get_mut(key) else {
                return false;
            };
            entry.0 = matches!(step, Step::Lock(_));
            true
        }
        Step::Forget(key) => model.remove(key).is_some(),
    }
}

/// Applies `steps` to `store` and the model, then compares final contents.
pub fn check_store_against_model<B: ScopeBackend>(
    store: &FactoidStore<B>,
    scope: &ScopeId,
    steps: &[Step],
) -> Result<(), TestCaseError> {
    let identity = Identity::new("prop");
    let mut model = Model::new();

    for step in steps {
        let expected_ok = apply_to_model(&mut model, step);
        let ok = match step {
            Step::Learn(key, fact) => store.learn(scope, key, fact, &identity).map(|_| ()),
            Step::Unlearn(key, position) => store.unlearn(scope, key, *position).map(|_| ()),
            Step::Lock(key) => store.lock(scope, key),
            Step::Unlock(key) => store.unlock(scope, key),
            Step::Forget(key) => store.forget(scope, key).map(|_| ()),
        };
        if let Err(err) = &ok {
            prop_assert!(!matches!(err, FactoidError::Storage(_)), "storage failure: {err}");
        }
        prop_assert_eq!(ok.is_ok(), expected_ok, "step {:?}", step);
    }

    let stats = store.stats(scope).unwrap();
    prop_assert_eq!(stats.keys, model.len() as u64);
    let total: usize = model.values().map(|(_, facts)| facts.len()).sum();
    prop_assert_eq!(stats.factoids, total as u64);

    for (key, (locked, facts)) in &model {
        prop_assert!(!facts.is_empty());
        let listing = store.what_is_with_limit(scope, key, 100).unwrap();
        let texts: Vec<String> = listing.factoids.into_iter().map(|factoid| factoid.text).collect();
        prop_assert_eq!(&texts, facts);
        prop_assert_eq!(store.info(scope, key).unwrap().locked, *locked);
    }
    Ok(())
}
