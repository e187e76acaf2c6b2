//! C6 — Observation Processor: ingests one observation, updates session
//! state, and may trigger auto-learn (spec §4.6).

use serde::{Deserialize, Serialize};

use crate::candidates::CandidateIndex;
use crate::config::{NodeConfig, StmMode};
use crate::learn::{learn, ClearPolicy, LearnStatus};
use crate::session::SessionState;
use crate::store::{PatternStore, StoreError};
use crate::symbol::{canonicalize_event, Symbol};
use crate::vector::VectorIndex;

/// One input packet: strings plus vectors resolved through C2, plus the
/// emotive and metadata side-channels (spec §3 "Observation").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub strings: Vec<Symbol>,
    pub vectors: Vec<Vec<f32>>,
    pub emotives: std::collections::BTreeMap<String, f32>,
    pub metadata: std::collections::BTreeMap<String, std::collections::BTreeSet<String>>,
}

/// Ack returned by `observe` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserveAck {
    pub session_id: String,
    pub stm_length: usize,
    pub time: u64,
    /// Name of the pattern auto-learned during this observation, if any.
    pub auto_learned_pattern: Option<Symbol>,
}

/// Resolves `observation` into a sorted symbol set, using `vector_index` to
/// turn each vector into its own symbol plus up to `k - 1` nearest
/// neighbors (spec §3 "Observation", §4.2).
fn resolve_symbols(
    node_id: &str,
    observation: &Observation,
    vector_index: &dyn VectorIndex,
    config: &NodeConfig,
) -> Result<Vec<Symbol>, crate::vector::VectorIndexError> {
    let mut symbols = observation.strings.clone();
    for vector in &observation.vectors {
        let own = vector_index.upsert(node_id, vector)?;
        let neighbors = vector_index.neighbors(node_id, vector, config.vector_neighbor_k)?;
        symbols.push(own);
        symbols.extend(neighbors);
    }
    if config.sort_symbols {
        Ok(canonicalize_event(symbols))
    } else {
        symbols.dedup();
        Ok(symbols)
    }
}

/// Drops the oldest event (and its accumulator contributions) from `state`,
/// implementing the `ROLLING` post-learn STM policy (spec §4.6 step 4).
fn roll_oldest(state: &mut SessionState) {
    if !state.stm.is_empty() {
        state.stm.remove(0);
    }
    if !state.emotives_acc.is_empty() {
        state.emotives_acc.remove(0);
    }
    // The metadata accumulator has no per-event boundary (it is a plain
    // union), so there is nothing apportionable to drop; it is left intact
    // until the next full clear. This mirrors the Learner's own metadata
    // merge, which is a union rather than a per-event ledger.
}

/// Processes one observation against `state`, mutating STM/accumulators/time
/// and running the auto-learn check (spec §4.6).
pub fn observe(
    state: &mut SessionState,
    observation: &Observation,
    vector_index: &dyn VectorIndex,
    pattern_store: &dyn PatternStore,
    candidates: &CandidateIndex,
    config: &NodeConfig,
) -> Result<ObserveAck, StoreError> {
    let symbols = resolve_symbols(&state.node_id, observation, vector_index, config)
        .map_err(|e| StoreError::Permanent(e.to_string()))?;

    if symbols.is_empty() {
        return Ok(ObserveAck {
            session_id: state.session_id.clone(),
            stm_length: state.stm.len(),
            time: state.time,
            auto_learned_pattern: None,
        });
    }

    state.stm.push(symbols);
    state.emotives_acc.push(observation.emotives.clone());
    for (name, values) in &observation.metadata {
        state
            .metadata_acc
            .entry(name.clone())
            .or_default()
            .extend(values.iter().cloned());
    }
    state.time += 1;

    let mut auto_learned_pattern = None;
    if config.max_pattern_length > 0 && state.stm.len() >= config.max_pattern_length {
        let clear_policy = match config.stm_mode {
            StmMode::Clear => ClearPolicy::ClearOnSuccess,
            StmMode::Rolling => ClearPolicy::CallerManaged,
        };
        let outcome = learn(state, pattern_store, candidates, config, clear_policy)?;
        if outcome.status == LearnStatus::Learned {
            auto_learned_pattern = Some(outcome.pattern_name);
        }
        if config.stm_mode == StmMode::Rolling {
            roll_oldest(state);
        }
    }

    Ok(ObserveAck {
        session_id: state.session_id.clone(),
        stm_length: state.stm.len(),
        time: state.time,
        auto_learned_pattern,
    })
}
