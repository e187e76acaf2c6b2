//! C7 — Learner: compresses STM into a content-addressed pattern.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::candidates::CandidateIndex;
use crate::config::NodeConfig;
use crate::hash::hash_pattern;
use crate::session::SessionState;
use crate::store::{PatternDerived, PatternStore};
use crate::symbol::Symbol;

/// Result status of a learn attempt (spec §4.7, §7: `InsufficientData` is a
/// status, not an error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnStatus {
    Learned,
    InsufficientData,
}

/// Outcome of `learn` (spec §6 `learn` shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnOutcome {
    pub status: LearnStatus,
    /// Empty when `status == InsufficientData`.
    pub pattern_name: Symbol,
}

/// Whether `learn` should clear STM/accumulators itself, or leave that to
/// the caller (auto-learn's ROLLING policy does a partial drop instead;
/// spec §4.7 step 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearPolicy {
    ClearOnSuccess,
    CallerManaged,
}

fn total_symbols(stm: &[Vec<Symbol>]) -> usize {
    stm.iter().map(|e| e.len()).sum()
}

/// Compresses `state.stm` into a pattern and upserts it into `store`,
/// registering newly-created patterns into `candidates`. Implements the
/// "2+ symbols" precondition (spec §4.7): fewer than two total symbols
/// across STM returns `InsufficientData` without mutating anything.
pub fn learn(
    state: &mut SessionState,
    store: &dyn PatternStore,
    candidates: &CandidateIndex,
    config: &NodeConfig,
    clear_policy: ClearPolicy,
) -> Result<LearnOutcome, crate::store::StoreError> {
    if total_symbols(&state.stm) < 2 {
        return Ok(LearnOutcome {
            status: LearnStatus::InsufficientData,
            pattern_name: String::new(),
        });
    }

    let name = hash_pattern(&state.stm);

    let mut token_set: BTreeSet<Symbol> = BTreeSet::new();
    let mut token_count = 0usize;
    for event in &state.stm {
        for sym in event {
            token_set.insert(sym.clone());
            token_count += 1;
        }
    }
    let first_token = state.stm.first().and_then(|e| e.first()).cloned();
    let last_token = state.stm.last().and_then(|e| e.last()).cloned();
    let sig = crate::candidates::minhash::minhash_signature(&token_set, config.lsh_bands, config.lsh_rows_per_band);
    let bands = crate::candidates::minhash::lsh_bands(&sig, config.lsh_bands, config.lsh_rows_per_band);

    let derived = PatternDerived {
        token_set,
        token_count,
        first_token,
        last_token,
        minhash_sig: sig,
        lsh_bands: bands,
    };

    let (pattern, fresh) = store.upsert(
        &state.node_id,
        &name,
        &state.stm,
        &derived,
        &state.metadata_acc,
        &state.emotives_acc,
    )?;

    if fresh {
        candidates.register(&state.node_id, &pattern.name, &derived);
    }

    if clear_policy == ClearPolicy::ClearOnSuccess {
        state.clear_all();
    }

    Ok(LearnOutcome {
        status: LearnStatus::Learned,
        pattern_name: pattern.name,
    })
}
