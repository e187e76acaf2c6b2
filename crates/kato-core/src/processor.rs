//! C9 — Processor Manager: maps `node_id` -> isolated `(C2, C3, C4)` triple.

use std::sync::Arc;

use dashmap::DashMap;
use md5::{Digest, Md5};

use crate::candidates::CandidateIndex;
use crate::store::{MemoryPatternStore, PatternStore};
use crate::vector::{FlatVectorIndex, VectorIndex};

/// Characters replaced by `_` during node-id sanitization (spec §4.9).
const RESERVED_CHARS: &[char] = &['/', '\\', '.', '"', '$', '*', '<', '>', ':', '|', '?', '-', ' '];

const MAX_SANITIZED_LEN: usize = 60;

/// Replaces every reserved character with `_`.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if RESERVED_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Sanitizes `node` and `base`, then ensures `{safe_node}_{safe_base}` fits
/// in [`MAX_SANITIZED_LEN`] characters, truncating `safe_node` and
/// appending an 8-hex-digit MD5 prefix of the original combined string
/// when it doesn't (spec §4.9).
pub fn sanitize_processor_id(node: &str, base: &str) -> String {
    let safe_node = sanitize(node);
    let safe_base = sanitize(base);
    let combined = format!("{safe_node}_{safe_base}");
    if combined.len() <= MAX_SANITIZED_LEN {
        return combined;
    }

    let mut hasher = Md5::new();
    hasher.update(combined.as_bytes());
    let digest = hasher.finalize();
    let suffix = format!("{digest:x}")[0..8].to_string();

    // Reserve "_" + suffix(8) = 9 chars for the reversibility-by-lookup
    // suffix; the rest goes to a truncated safe_node, then the untouched
    // safe_base so the base half (often the more distinguishing half for
    // lookups) survives intact when possible.
    let reserve = 1 + suffix.len() + 1 + safe_base.len();
    let budget = MAX_SANITIZED_LEN.saturating_sub(reserve);
    let truncated_node: String = safe_node.chars().take(budget).collect();
    format!("{truncated_node}_{safe_base}_{suffix}")
}

/// The `(VectorIndex, PatternStore, CandidateIndex)` triple bound to one `node_id`.
pub struct Processor {
    pub vector_index: Arc<dyn VectorIndex>,
    pub pattern_store: Arc<dyn PatternStore>,
    pub candidate_index: Arc<CandidateIndex>,
}

/// Lazily binds and caches a `Processor` per sanitized `node_id`. Once
/// bound, the mapping is stable for the store's lifetime; concurrent
/// first-access yields the same binding (spec §4.9) because
/// [`DashMap::entry`] holds the shard lock across the `or_insert_with`.
pub struct ProcessorManager {
    processors: DashMap<String, Arc<Processor>>,
    factory: Box<dyn Fn() -> Processor + Send + Sync>,
}

impl ProcessorManager {
    /// Builds a manager whose processors share one in-memory
    /// `VectorIndex`/`PatternStore`/`CandidateIndex` triple (the teacher's
    /// default, `bundled-sqlite`, is mirrored by [`Self::with_sqlite`]).
    pub fn in_memory() -> Self {
        Self {
            processors: DashMap::new(),
            factory: Box::new(|| Processor {
                vector_index: Arc::new(FlatVectorIndex::new()),
                pattern_store: Arc::new(MemoryPatternStore::new()),
                candidate_index: Arc::new(CandidateIndex::new()),
            }),
        }
    }

    /// Returns the processor bound to `node_id`, sanitizing the id and
    /// lazily constructing the triple on first access.
    pub fn get_or_create(&self, node_id: &str) -> Arc<Processor> {
        let safe_id = sanitize_processor_id(node_id, "kato");
        self.processors
            .entry(safe_id)
            .or_insert_with(|| Arc::new((self.factory)()))
            .clone()
    }

    pub fn node_count(&self) -> usize {
        self.processors.len()
    }
}
