//! Universal invariants 1-12 and the round-trip/idempotence laws (spec §8).

use kato_core::hash::hash_pattern;
use kato_e2e_tests::{new_session, observe_strings, permissive_engine, strings};

fn ev(symbols: &[&str]) -> kato_core::Event {
    symbols.iter().map(|s| s.to_string()).collect()
}

#[test]
fn invariant_1_hasher_is_deterministic() {
    let stm = vec![ev(&["a", "b"]), ev(&["c"])];
    assert_eq!(hash_pattern(&stm), hash_pattern(&stm));
}

#[test]
fn invariant_2_distinct_sequences_never_share_a_name() {
    let a = vec![ev(&["a", "b"])];
    let b = vec![ev(&["a", "c"])];
    assert_ne!(hash_pattern(&a), hash_pattern(&b));
}

#[test]
fn invariant_3_stored_event_is_sorted_and_deduped() {
    let engine = permissive_engine();
    let session = new_session(&engine, "inv3-node");
    observe_strings(&engine, &session.session_id, &["b", "a", "a"]);
    let stm = engine.get_stm(&session.session_id).unwrap();
    assert_eq!(stm.stm, vec![vec!["a".to_string(), "b".to_string()]]);
}

#[test]
fn invariant_4_empty_events_never_appear_in_stm() {
    let engine = permissive_engine();
    let session = new_session(&engine, "inv4-node");
    engine.observe(&session.session_id, &kato_core::observe::Observation::default()).unwrap();
    let stm = engine.get_stm(&session.session_id).unwrap();
    assert!(stm.stm.is_empty());
}

#[test]
fn invariant_5_clear_all_empties_stm_but_not_ltm() {
    let engine = permissive_engine();
    let session = new_session(&engine, "inv5-node");
    observe_strings(&engine, &session.session_id, &["a", "b"]);
    engine.learn(&session.session_id).unwrap();
    observe_strings(&engine, &session.session_id, &["c"]);
    engine.clear_all(&session.session_id).unwrap();

    let stm = engine.get_stm(&session.session_id).unwrap();
    assert!(stm.stm.is_empty());

    // pattern store is untouched: re-observing the learned sequence and
    // asking for predictions should still surface it.
    observe_strings(&engine, &session.session_id, &["a", "b"]);
    let predictions = engine.get_predictions(&session.session_id).unwrap();
    assert_eq!(predictions.count, 1);
}

#[test]
fn invariant_6_relearning_same_stm_increments_frequency_by_one() {
    let engine = permissive_engine();
    let session = new_session(&engine, "inv6-node");
    observe_strings(&engine, &session.session_id, &["a", "b"]);
    let first = engine.learn(&session.session_id).unwrap();
    observe_strings(&engine, &session.session_id, &["a", "b"]);
    let second = engine.learn(&session.session_id).unwrap();
    assert_eq!(first.pattern_name, second.pattern_name);

    observe_strings(&engine, &session.session_id, &["a"]);
    let predictions = engine.get_predictions(&session.session_id).unwrap();
    assert_eq!(predictions.predictions[0].frequency, 2);
}

#[test]
fn invariant_7_metadata_union_is_idempotent() {
    let engine = permissive_engine();
    let session = new_session(&engine, "inv7-node");
    let obs = || kato_core::observe::Observation {
        strings: vec!["a".to_string(), "b".to_string()],
        metadata: std::collections::BTreeMap::from([(
            "k".to_string(),
            std::collections::BTreeSet::from(["v".to_string()]),
        )]),
        ..Default::default()
    };
    engine.observe(&session.session_id, &obs()).unwrap();
    engine.learn(&session.session_id).unwrap();
    engine.observe(&session.session_id, &obs()).unwrap();
    engine.learn(&session.session_id).unwrap();

    observe_strings(&engine, &session.session_id, &["a"]);
    let predictions = engine.get_predictions(&session.session_id).unwrap();
    assert_eq!(
        predictions.predictions[0].metadata["k"],
        std::collections::BTreeSet::from(["v".to_string()])
    );
}

#[test]
fn invariant_8_posteriors_sum_to_one() {
    let engine = permissive_engine();
    let session = new_session(&engine, "inv8-node");
    for pair in [["a", "b"], ["a", "c"], ["a", "d"]] {
        engine.observe(&session.session_id, &strings(&pair)).unwrap();
        engine.learn(&session.session_id).unwrap();
    }
    observe_strings(&engine, &session.session_id, &["a"]);
    let predictions = engine.get_predictions(&session.session_id).unwrap();
    assert!(predictions.count >= 1);
    let sum: f64 = predictions.predictions.iter().map(|p| p.bayesian_posterior).sum();
    assert!((sum - 1.0).abs() < 1e-6, "got {sum}");
}

#[test]
fn invariant_9_potential_equals_similarity_times_predictive_information() {
    let engine = permissive_engine();
    let session = new_session(&engine, "inv9-node");
    observe_strings(&engine, &session.session_id, &["a", "b"]);
    engine.learn(&session.session_id).unwrap();
    observe_strings(&engine, &session.session_id, &["a"]);
    let predictions = engine.get_predictions(&session.session_id).unwrap();
    for p in &predictions.predictions {
        assert!((p.potential - p.similarity * p.predictive_information).abs() < 1e-6);
    }
}

#[test]
fn invariant_10_likelihood_equals_similarity() {
    let engine = permissive_engine();
    let session = new_session(&engine, "inv10-node");
    observe_strings(&engine, &session.session_id, &["a", "b"]);
    engine.learn(&session.session_id).unwrap();
    observe_strings(&engine, &session.session_id, &["a"]);
    let predictions = engine.get_predictions(&session.session_id).unwrap();
    for p in &predictions.predictions {
        assert!((p.bayesian_likelihood - p.similarity).abs() < 1e-9);
    }
}

#[test]
fn invariant_11_sessions_on_different_nodes_are_mutually_invisible() {
    let engine = permissive_engine();
    let a = new_session(&engine, "inv11-node-a");
    let b = new_session(&engine, "inv11-node-b");
    observe_strings(&engine, &a.session_id, &["only-in-a"]);
    observe_strings(&engine, &b.session_id, &["only-in-b"]);
    let stm_b = engine.get_stm(&b.session_id).unwrap();
    assert!(!stm_b.stm.iter().flatten().any(|s| s == "only-in-a"));
}

#[test]
fn invariant_12_durable_patterns_persist_past_session_deletion() {
    let engine = permissive_engine();
    let x = new_session(&engine, "inv12-node");
    observe_strings(&engine, &x.session_id, &["m", "n"]);
    let outcome = engine.learn(&x.session_id).unwrap();
    engine.delete_session(&x.session_id).unwrap();

    let y = new_session(&engine, "inv12-node");
    observe_strings(&engine, &y.session_id, &["m"]);
    let predictions = engine.get_predictions(&y.session_id).unwrap();
    assert!(predictions.predictions.iter().any(|p| p.pattern_name == outcome.pattern_name));
}

#[test]
fn roundtrip_observe_clear_observe_yields_identical_stm() {
    let engine = permissive_engine();
    let session = new_session(&engine, "roundtrip-node");
    observe_strings(&engine, &session.session_id, &["x", "y"]);
    let first = engine.get_stm(&session.session_id).unwrap();
    engine.clear_stm(&session.session_id).unwrap();
    observe_strings(&engine, &session.session_id, &["x", "y"]);
    let second = engine.get_stm(&session.session_id).unwrap();
    assert_eq!(first.stm, second.stm);
}

#[test]
fn roundtrip_double_learn_matches_frequency_delta_of_two() {
    let engine = permissive_engine();
    let session = new_session(&engine, "double-learn-node");
    observe_strings(&engine, &session.session_id, &["p", "q"]);
    let a1 = engine.learn(&session.session_id).unwrap();
    observe_strings(&engine, &session.session_id, &["p", "q"]);
    let a2 = engine.learn(&session.session_id).unwrap();
    assert_eq!(a1.pattern_name, a2.pattern_name);

    let session2 = new_session(&engine, "double-learn-node");
    observe_strings(&engine, &session2.session_id, &["p", "q"]);
    engine.learn(&session2.session_id).unwrap();
    observe_strings(&engine, &session2.session_id, &["p"]);
    let predictions = engine.get_predictions(&session2.session_id).unwrap();
    assert_eq!(predictions.predictions[0].frequency, 3);
}

#[test]
fn canonicalize_event_is_idempotent() {
    let once = kato_core::symbol::canonicalize_event(vec!["b".to_string(), "a".to_string(), "a".to_string()]);
    let twice = kato_core::symbol::canonicalize_event(once.clone());
    assert_eq!(once, twice);
}
