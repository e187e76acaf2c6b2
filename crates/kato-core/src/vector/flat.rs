//! Deterministic in-memory flat [`super::VectorIndex`] implementation.
//!
//! Brute-force cosine similarity over all vectors stored under a
//! `node_id`. Grounded on the teacher's `search/vector.rs` shape (a
//! dedicated index struct with a fixed metric and a stats/config split)
//! but without HNSW: the spec's tie-break requirement rules out an
//! approximate index as the default.

use dashmap::DashMap;
use parking_lot::RwLock;
use sha1::{Digest, Sha1};

use super::{Result, VectorIndex, VectorIndexError};
use crate::hash::hash_vector;
use crate::symbol::Symbol;

struct Entry {
    symbol: Symbol,
    vector: Vec<f32>,
    /// First 8 bytes of `sha1(symbol)`, used only to break distance ties
    /// deterministically (ascending), independent of process hasher seed.
    tie_break: u64,
}

fn tie_break_key(symbol: &str) -> u64 {
    let mut hasher = Sha1::new();
    hasher.update(symbol.as_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes(digest[0..8].try_into().expect("sha1 digest is 20 bytes"))
}

/// A brute-force, per-node flat vector index.
pub struct FlatVectorIndex {
    nodes: DashMap<String, RwLock<Vec<Entry>>>,
}

impl FlatVectorIndex {
    pub fn new() -> Self {
        Self { nodes: DashMap::new() }
    }
}

impl Default for FlatVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - (dot / (norm_a * norm_b))
}

impl VectorIndex for FlatVectorIndex {
    fn upsert(&self, node_id: &str, vector: &[f32]) -> Result<Symbol> {
        let symbol = hash_vector(vector);
        let shard = self
            .nodes
            .entry(node_id.to_string())
            .or_insert_with(|| RwLock::new(Vec::new()));
        let mut entries = shard.write();
        if !entries.iter().any(|e| e.symbol == symbol) {
            entries.push(Entry {
                symbol: symbol.clone(),
                vector: vector.to_vec(),
                tie_break: tie_break_key(&symbol),
            });
        }
        Ok(symbol)
    }

    fn neighbors(&self, node_id: &str, vector: &[f32], k: usize) -> Result<Vec<Symbol>> {
        let Some(shard) = self.nodes.get(node_id) else {
            return Ok(Vec::new());
        };
        let entries = shard.read();
        if let Some(first) = entries.first() {
            if first.vector.len() != vector.len() {
                return Err(VectorIndexError::DimensionMismatch {
                    expected: first.vector.len(),
                    got: vector.len(),
                });
            }
        }
        let mut scored: Vec<(f32, u64, &Symbol)> = entries
            .iter()
            .map(|e| (cosine_distance(vector, &e.vector), e.tie_break, &e.symbol))
            .collect();
        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        Ok(scored.into_iter().take(k).map(|(_, _, s)| s.clone()).collect())
    }
}
