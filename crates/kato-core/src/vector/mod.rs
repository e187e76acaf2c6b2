//! C2 — Vector Index: maps an incoming dense vector to one or more symbolic
//! tokens via nearest-neighbor lookup, scoped by `node_id`.
//!
//! The core never owns a concrete vector backend; it consumes this trait
//! (spec §9 "Vector backend"). The in-tree [`flat::FlatVectorIndex`]
//! implementation is the default because the spec requires *exact*
//! deterministic tie-breaking by symbol hash ascending (§4.2), a guarantee
//! an approximate HNSW index (the teacher's `usearch`-backed one) cannot
//! give; see `DESIGN.md` for why `usearch` was dropped rather than kept
//! behind a second trait impl.

mod flat;

pub use flat::FlatVectorIndex;

use crate::symbol::Symbol;

/// Vector index error types.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum VectorIndexError {
    /// The query vector's dimensionality did not match the index's.
    #[error("dimension mismatch: index expects {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, VectorIndexError>;

/// Nearest-neighbor lookup and upsert, scoped by `node_id` (spec §4.2).
///
/// Implementations must fix their similarity metric for the life of the
/// store and break distance ties deterministically by symbol hash
/// ascending, so that `neighbors` returns the same ordering on every call
/// given the same index contents.
pub trait VectorIndex: Send + Sync {
    /// Computes the vector's hash; if absent under `node_id`, stores the
    /// vector; returns `VCTR|<hash>` either way.
    fn upsert(&self, node_id: &str, vector: &[f32]) -> Result<Symbol>;

    /// Returns up to `k` symbols whose stored vectors (under `node_id`) are
    /// nearest to `vector`. Always includes the vector's own symbol if it
    /// is already present in the index. Returns an empty list on an empty
    /// index; never errors on an unknown vector.
    fn neighbors(&self, node_id: &str, vector: &[f32], k: usize) -> Result<Vec<Symbol>>;
}
