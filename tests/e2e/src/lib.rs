//! Test harness shared by the `scenarios`, `invariants`, and `boundaries`
//! suites: thin helpers over [`kato_core::Engine`] so individual test files
//! read as scenario descriptions rather than wiring code.

use std::collections::BTreeMap;

use kato_core::config::NodeConfig;
use kato_core::engine::{Engine, SessionRecord};
use kato_core::observe::{Observation, ObserveAck};

/// Builds an in-memory engine with permissive defaults (zero recall
/// threshold, unbounded auto-learn) so tests control learn/predict timing
/// explicitly rather than fighting node defaults.
pub fn permissive_engine() -> Engine {
    let mut config = NodeConfig::default();
    config.recall_threshold = 0.0;
    Engine::new(config, 1000)
}

pub fn new_session(engine: &Engine, node_id: &str) -> SessionRecord {
    engine.create_session(node_id, None, BTreeMap::new()).expect("create_session")
}

/// Observation carrying only bare string symbols, the common case in tests.
pub fn strings(symbols: &[&str]) -> Observation {
    Observation {
        strings: symbols.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

pub fn observe_strings(engine: &Engine, session_id: &str, symbols: &[&str]) -> ObserveAck {
    engine.observe(session_id, &strings(symbols)).expect("observe")
}
