//! In-memory [`PatternStore`] implementation, sharded by `node_id` with
//! [`dashmap::DashMap`] — the concurrent map this lineage's sibling
//! database engine (`surrealdb-surrealdb`'s `core/src/kvs/index.rs`) uses
//! for its per-index building state.

use std::collections::{BTreeMap, BTreeSet};

use dashmap::DashMap;
use parking_lot::RwLock;

use super::{Pattern, PatternDerived, PatternStore, Result, StoreError};
use crate::symbol::{Event, Symbol};

/// `node_id -> (pattern_name -> Pattern)`, each node's inner map behind its
/// own lock so that upserts to different nodes never contend.
pub struct MemoryPatternStore {
    nodes: DashMap<String, RwLock<BTreeMap<Symbol, Pattern>>>,
}

impl MemoryPatternStore {
    pub fn new() -> Self {
        Self { nodes: DashMap::new() }
    }
}

impl Default for MemoryPatternStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternStore for MemoryPatternStore {
    fn get(&self, node_id: &str, name: &str) -> Result<Option<Pattern>> {
        let Some(shard) = self.nodes.get(node_id) else {
            return Ok(None);
        };
        Ok(shard.read().get(name).cloned())
    }

    fn upsert(
        &self,
        node_id: &str,
        name: &Symbol,
        sequence: &[Event],
        derived: &PatternDerived,
        metadata: &BTreeMap<String, BTreeSet<String>>,
        emotives: &[BTreeMap<String, f32>],
    ) -> Result<(Pattern, bool)> {
        let shard = self
            .nodes
            .entry(node_id.to_string())
            .or_insert_with(|| RwLock::new(BTreeMap::new()));
        let mut patterns = shard.write();

        if let Some(existing) = patterns.get_mut(name) {
            if existing.sequence != sequence {
                return Err(StoreError::HashCollision { name: name.clone() });
            }
            existing.frequency += 1;
            for (key, values) in metadata {
                existing.metadata.entry(key.clone()).or_default().extend(values.iter().cloned());
            }
            existing.emotives.extend(emotives.iter().cloned());
            return Ok((existing.clone(), false));
        }

        let pattern = Pattern {
            name: name.clone(),
            sequence: sequence.to_vec(),
            length: sequence.len(),
            frequency: 1,
            token_set: derived.token_set.clone(),
            token_count: derived.token_count,
            first_token: derived.first_token.clone(),
            last_token: derived.last_token.clone(),
            minhash_sig: derived.minhash_sig.clone(),
            lsh_bands: derived.lsh_bands.clone(),
            metadata: metadata.clone(),
            emotives: emotives.to_vec(),
        };
        patterns.insert(name.clone(), pattern.clone());
        Ok((pattern, true))
    }

    fn count(&self, node_id: &str) -> Result<u64> {
        Ok(self.nodes.get(node_id).map(|s| s.read().len() as u64).unwrap_or(0))
    }
}
