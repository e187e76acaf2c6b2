//! Token-level inverted index: `(node_id, token) -> set<pattern_name>`.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeSet;

use crate::symbol::Symbol;

/// Sharded by `node_id`; each shard maps `token -> set<pattern_name>`.
pub struct InvertedIndex {
    nodes: DashMap<String, RwLock<std::collections::HashMap<Symbol, BTreeSet<Symbol>>>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self { nodes: DashMap::new() }
    }

    /// Registers `pattern_name` under every token in `tokens`, for `node_id`.
    pub fn insert(&self, node_id: &str, pattern_name: &Symbol, tokens: &BTreeSet<Symbol>) {
        let shard = self
            .nodes
            .entry(node_id.to_string())
            .or_insert_with(|| RwLock::new(std::collections::HashMap::new()));
        let mut map = shard.write();
        for token in tokens {
            map.entry(token.clone()).or_default().insert(pattern_name.clone());
        }
    }

    /// Union of pattern names registered under any of `tokens`, for `node_id`.
    pub fn query(&self, node_id: &str, tokens: &BTreeSet<Symbol>) -> BTreeSet<Symbol> {
        let Some(shard) = self.nodes.get(node_id) else {
            return BTreeSet::new();
        };
        let map = shard.read();
        let mut out = BTreeSet::new();
        for token in tokens {
            if let Some(names) = map.get(token) {
                out.extend(names.iter().cloned());
            }
        }
        out
    }
}

impl Default for InvertedIndex {
    fn default() -> Self {
        Self::new()
    }
}
