//! Seed scenario suite (S1-S6).

use kato_core::config::SessionConfigOverrides;
use kato_e2e_tests::{new_session, observe_strings, permissive_engine};

#[test]
fn s1_token_matching_correctness() {
    let engine = permissive_engine();
    let learner = new_session(&engine, "s1-node");
    for symbol in ["t1", "t2", "t3", "t4", "t5", "t6", "t7", "t8"] {
        observe_strings(&engine, &learner.session_id, &[symbol]);
    }
    engine.learn(&learner.session_id).unwrap();

    let reader = new_session(&engine, "s1-node");
    observe_strings(
        &engine,
        &reader.session_id,
        &["o1", "o2", "o3", "o4", "o5", "o6", "o7", "t1"],
    );

    let mut strict = SessionConfigOverrides::default();
    strict.recall_threshold = Some(0.6);
    engine.update_session_config(&reader.session_id, strict).unwrap();
    let predictions = engine.get_predictions(&reader.session_id).unwrap();
    assert_eq!(predictions.count, 0, "similarity 0.125 must not pass threshold 0.6");

    let mut lenient = SessionConfigOverrides::default();
    lenient.recall_threshold = Some(0.1);
    engine.update_session_config(&reader.session_id, lenient).unwrap();
    let predictions = engine.get_predictions(&reader.session_id).unwrap();
    assert!(predictions.count >= 1);
    assert!((predictions.predictions[0].similarity - 0.125).abs() < 1e-9);
}

#[test]
fn s2_emotives_accumulate_across_relearn() {
    let engine = permissive_engine();
    let session = new_session(&engine, "s2-node");

    engine
        .observe(
            &session.session_id,
            &kato_core::observe::Observation {
                strings: vec!["X".to_string()],
                emotives: std::collections::BTreeMap::from([("mood".to_string(), 0.9_f32)]),
                ..Default::default()
            },
        )
        .unwrap();
    engine
        .observe(
            &session.session_id,
            &kato_core::observe::Observation {
                strings: vec!["Y".to_string()],
                emotives: std::collections::BTreeMap::from([("mood".to_string(), 0.8_f32)]),
                ..Default::default()
            },
        )
        .unwrap();
    engine.learn(&session.session_id).unwrap();

    engine
        .observe(
            &session.session_id,
            &kato_core::observe::Observation {
                strings: vec!["X".to_string()],
                emotives: std::collections::BTreeMap::from([("mood".to_string(), 0.5_f32)]),
                ..Default::default()
            },
        )
        .unwrap();
    engine
        .observe(
            &session.session_id,
            &kato_core::observe::Observation {
                strings: vec!["Y".to_string()],
                emotives: std::collections::BTreeMap::from([("mood".to_string(), 0.3_f32)]),
                ..Default::default()
            },
        )
        .unwrap();
    engine.learn(&session.session_id).unwrap();

    observe_strings(&engine, &session.session_id, &["X"]);
    observe_strings(&engine, &session.session_id, &["Y"]);
    let predictions = engine.get_predictions(&session.session_id).unwrap();
    assert_eq!(predictions.count, 1);
    // Four learn-contributions of mood {0.9, 0.8, 0.5, 0.3} average to 0.625.
    let mood = predictions.predictions[0].emotives["mood"];
    assert!((mood - 0.625).abs() < 1e-4, "got {mood}");
}

#[test]
fn s3_metadata_set_union() {
    let engine = permissive_engine();
    let session = new_session(&engine, "s3-node");

    let obs = |book: Option<&str>, author: Option<&str>, chapter: Option<&str>| {
        let mut metadata = std::collections::BTreeMap::new();
        if let Some(v) = book {
            metadata.insert("book".to_string(), std::collections::BTreeSet::from([v.to_string()]));
        }
        if let Some(v) = author {
            metadata.insert("author".to_string(), std::collections::BTreeSet::from([v.to_string()]));
        }
        if let Some(v) = chapter {
            metadata.insert("chapter".to_string(), std::collections::BTreeSet::from([v.to_string()]));
        }
        kato_core::observe::Observation {
            strings: vec!["e".to_string()],
            metadata,
            ..Default::default()
        }
    };

    engine.observe(&session.session_id, &obs(Some("title1"), Some("Smith"), None)).unwrap();
    engine.observe(&session.session_id, &obs(Some("title2"), None, Some("1"))).unwrap();
    engine.observe(&session.session_id, &obs(Some("title1"), None, Some("2"))).unwrap();
    engine.learn(&session.session_id).unwrap();

    observe_strings(&engine, &session.session_id, &["e"]);
    observe_strings(&engine, &session.session_id, &["e"]);
    let predictions = engine.get_predictions(&session.session_id).unwrap();
    assert_eq!(predictions.count, 1);
    let metadata = &predictions.predictions[0].metadata;
    assert_eq!(
        metadata["book"],
        std::collections::BTreeSet::from(["title1".to_string(), "title2".to_string()])
    );
    assert_eq!(metadata["author"], std::collections::BTreeSet::from(["Smith".to_string()]));
    assert_eq!(
        metadata["chapter"],
        std::collections::BTreeSet::from(["1".to_string(), "2".to_string()])
    );
}

#[test]
fn s4_auto_learn_rolling_policy() {
    let mut config = kato_core::config::NodeConfig::default();
    config.max_pattern_length = 4;
    config.stm_mode = kato_core::config::StmMode::Rolling;
    let engine = kato_core::engine::Engine::new(config, 100);
    let session = new_session(&engine, "s4-node");

    let mut auto_learned = Vec::new();
    for symbol in ["a", "b", "c", "d", "e", "f", "g"] {
        let ack = observe_strings(&engine, &session.session_id, &[symbol]);
        if let Some(name) = ack.auto_learned_pattern {
            auto_learned.push(name);
        }
    }

    assert_eq!(auto_learned.len(), 4, "auto-learn fires on the 4th-7th observations");
    let stm = engine.get_stm(&session.session_id).unwrap();
    assert_eq!(
        stm.stm,
        vec![vec!["e".to_string()], vec!["f".to_string()], vec!["g".to_string()]]
    );
}

#[test]
fn s5_cross_session_isolation() {
    let engine = permissive_engine();
    let a = new_session(&engine, "node-a");
    let b = new_session(&engine, "node-b");

    observe_strings(&engine, &a.session_id, &["alice", "data"]);
    observe_strings(&engine, &b.session_id, &["bob", "info"]);

    let stm_a = engine.get_stm(&a.session_id).unwrap();
    let stm_b = engine.get_stm(&b.session_id).unwrap();
    assert_eq!(stm_a.stm, vec![vec!["alice".to_string(), "data".to_string()]]);
    assert_eq!(stm_b.stm, vec![vec!["bob".to_string(), "info".to_string()]]);

    engine.learn(&a.session_id).unwrap();
    observe_strings(&engine, &b.session_id, &["alice"]);
    let predictions_b = engine.get_predictions(&b.session_id).unwrap();
    assert_eq!(predictions_b.count, 0, "node-b must never see node-a's patterns");
}

#[test]
fn s6_durable_knowledge_across_session_lifetime() {
    let engine = permissive_engine();
    let x = new_session(&engine, "s6-node");
    observe_strings(&engine, &x.session_id, &["p", "q"]);
    let outcome = engine.learn(&x.session_id).unwrap();
    assert_eq!(outcome.status, kato_core::learn::LearnStatus::Learned);
    engine.delete_session(&x.session_id).unwrap();

    let y = new_session(&engine, "s6-node");
    observe_strings(&engine, &y.session_id, &["p"]);
    observe_strings(&engine, &y.session_id, &["q"]);
    let predictions = engine.get_predictions(&y.session_id).unwrap();
    assert!(
        predictions.predictions.iter().any(|p| p.pattern_name == outcome.pattern_name),
        "the pattern learned by X must be visible to Y on the same node"
    );
}
