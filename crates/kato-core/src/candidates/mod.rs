//! C4 — Candidate Index: token-level shortlisting so the Predictor never
//! scans all patterns (spec §4.4).

mod inverted;
pub mod minhash;

use std::collections::BTreeSet;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::config::NodeConfig;
use crate::store::PatternDerived;
use crate::symbol::Symbol;
use inverted::InvertedIndex;

/// Candidate index error types.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Retryable storage fault.
    #[error("transient index fault: {0}")]
    Transient(String),
}

impl IndexError {
    pub fn is_transient(&self) -> bool {
        matches!(self, IndexError::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// Shortlists candidate pattern names whose token set plausibly overlaps a
/// query token set, via an inverted index plus LSH bands over MinHash
/// signatures (spec §4.4). Also tracks pattern co-occurrence counts, used
/// by the Predictor to compute `predictive_information` (spec §4.8(e)).
pub struct CandidateIndex {
    inverted: InvertedIndex,
    /// `node_id -> band_hash -> set<pattern_name>`.
    lsh: DashMap<String, RwLock<std::collections::HashMap<u64, BTreeSet<Symbol>>>>,
    /// `node_id -> pattern_name -> times this pattern has appeared in a
    /// shortlist alongside at least one other candidate (a simple,
    /// monotone co-occurrence counter; see predict.rs for how it is turned
    /// into a bounded, normalized `predictive_information` score).
    co_occurrence: DashMap<String, RwLock<std::collections::HashMap<Symbol, u64>>>,
}

impl CandidateIndex {
    pub fn new() -> Self {
        Self {
            inverted: InvertedIndex::new(),
            lsh: DashMap::new(),
            co_occurrence: DashMap::new(),
        }
    }

    /// Registers a freshly-learned pattern's derived fields into both
    /// layers. Re-learns of an existing pattern must not call this (content
    /// addressing means the index entry never changes, spec §4.7 step 3).
    pub fn register(&self, node_id: &str, pattern_name: &Symbol, derived: &PatternDerived) {
        self.inverted.insert(node_id, pattern_name, &derived.token_set);

        let shard = self
            .lsh
            .entry(node_id.to_string())
            .or_insert_with(|| RwLock::new(std::collections::HashMap::new()));
        let mut bands = shard.write();
        for band_hash in &derived.lsh_bands {
            bands.entry(*band_hash).or_default().insert(pattern_name.clone());
        }
    }

    /// Returns the shortlist for `query_tokens`: union of the inverted-index
    /// hits and the LSH-band hits. False positives are expected and
    /// filtered downstream by the Predictor (spec §4.4).
    pub fn query(&self, node_id: &str, query_tokens: &BTreeSet<Symbol>, config: &NodeConfig) -> BTreeSet<Symbol> {
        let mut candidates = self.inverted.query(node_id, query_tokens);

        let query_sig = minhash::minhash_signature(query_tokens, config.lsh_bands, config.lsh_rows_per_band);
        let query_bands = minhash::lsh_bands(&query_sig, config.lsh_bands, config.lsh_rows_per_band);

        if let Some(shard) = self.lsh.get(node_id) {
            let bands = shard.read();
            for band_hash in &query_bands {
                if let Some(names) = bands.get(band_hash) {
                    candidates.extend(names.iter().cloned());
                }
            }
        }
        candidates
    }

    /// Records that `pattern_names` co-occurred in a single shortlist
    /// (called once per prediction request with all surviving candidates).
    /// Monotone: counts only increase, satisfying the "monotone
    /// non-decreasing in repeated co-occurrence" contract of
    /// `predictive_information` (spec §4.8(e)).
    pub fn record_co_occurrence(&self, node_id: &str, pattern_names: &[Symbol]) {
        if pattern_names.len() < 2 {
            return;
        }
        let shard = self
            .co_occurrence
            .entry(node_id.to_string())
            .or_insert_with(|| RwLock::new(std::collections::HashMap::new()));
        let mut counts = shard.write();
        for name in pattern_names {
            *counts.entry(name.clone()).or_insert(0) += 1;
        }
    }

    /// Current co-occurrence count for `pattern_name` under `node_id`.
    pub fn co_occurrence_count(&self, node_id: &str, pattern_name: &str) -> u64 {
        self.co_occurrence
            .get(node_id)
            .and_then(|shard| shard.read().get(pattern_name).copied())
            .unwrap_or(0)
    }
}

impl Default for CandidateIndex {
    fn default() -> Self {
        Self::new()
    }
}
