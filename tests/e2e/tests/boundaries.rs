//! Boundary behaviors (spec §8): STM at the 1/2-symbol learn threshold,
//! `max_pattern_length = 0` disabling auto-learn, and the two
//! `recall_threshold` extremes.

use kato_e2e_tests::{new_session, observe_strings, permissive_engine};

#[test]
fn stm_with_exactly_one_symbol_cannot_learn() {
    let engine = permissive_engine();
    let session = new_session(&engine, "boundary-one-symbol");
    observe_strings(&engine, &session.session_id, &["a"]);
    let outcome = engine.learn(&session.session_id).unwrap();
    assert_eq!(outcome.status, kato_core::learn::LearnStatus::InsufficientData);
    assert!(outcome.pattern_name.is_empty());

    let predictions = engine.get_predictions(&session.session_id).unwrap();
    assert_eq!(predictions.count, 0);
}

#[test]
fn stm_with_exactly_two_symbols_can_learn_and_predict() {
    let engine = permissive_engine();
    let learner = new_session(&engine, "boundary-two-symbols");
    observe_strings(&engine, &learner.session_id, &["a", "b"]);
    let outcome = engine.learn(&learner.session_id).unwrap();
    assert_eq!(outcome.status, kato_core::learn::LearnStatus::Learned);
    assert!(!outcome.pattern_name.is_empty());

    let reader = new_session(&engine, "boundary-two-symbols");
    observe_strings(&engine, &reader.session_id, &["a", "b"]);
    let predictions = engine.get_predictions(&reader.session_id).unwrap();
    assert_eq!(predictions.count, 1);
}

#[test]
fn max_pattern_length_zero_disables_auto_learn_entirely() {
    let mut config = kato_core::config::NodeConfig::default();
    config.max_pattern_length = 0;
    let engine = kato_core::engine::Engine::new(config, 100);
    let session = new_session(&engine, "boundary-no-auto-learn");

    let mut saw_auto_learn = false;
    for symbol in ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"] {
        let ack = observe_strings(&engine, &session.session_id, &[symbol]);
        if ack.auto_learned_pattern.is_some() {
            saw_auto_learn = true;
        }
    }
    assert!(!saw_auto_learn, "max_pattern_length = 0 must mean unbounded STM, never auto-learn");

    let stm = engine.get_stm(&session.session_id).unwrap();
    assert_eq!(stm.length, 10);
}

#[test]
fn recall_threshold_zero_admits_every_candidate() {
    let engine = permissive_engine();
    let session = new_session(&engine, "boundary-threshold-zero");
    observe_strings(&engine, &session.session_id, &["a", "b"]);
    engine.learn(&session.session_id).unwrap();

    // A near-disjoint probe still has nonzero token overlap through "a"
    // alone; with recall_threshold = 0.0 it must still be admitted.
    observe_strings(&engine, &session.session_id, &["a", "z", "y", "x", "w", "v", "u", "t"]);
    let predictions = engine.get_predictions(&session.session_id).unwrap();
    assert_eq!(predictions.count, 1);
    assert!(predictions.predictions[0].similarity > 0.0);
}

#[test]
fn recall_threshold_one_admits_only_exact_token_multiset_matches() {
    let mut config = kato_core::config::NodeConfig::default();
    config.recall_threshold = 1.0;
    let engine = kato_core::engine::Engine::new(config, 100);

    let learner = new_session(&engine, "boundary-threshold-one");
    observe_strings(&engine, &learner.session_id, &["a", "b"]);
    engine.learn(&learner.session_id).unwrap();

    let near_miss = new_session(&engine, "boundary-threshold-one");
    observe_strings(&engine, &near_miss.session_id, &["a", "b", "c"]);
    let predictions = engine.get_predictions(&near_miss.session_id).unwrap();
    assert_eq!(predictions.count, 0, "partial overlap must be rejected at threshold 1.0");

    let exact = new_session(&engine, "boundary-threshold-one");
    observe_strings(&engine, &exact.session_id, &["a", "b"]);
    let predictions = engine.get_predictions(&exact.session_id).unwrap();
    assert_eq!(predictions.count, 1);
    assert!((predictions.predictions[0].similarity - 1.0).abs() < 1e-9);
}
