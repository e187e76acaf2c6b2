//! C3 — Pattern Store: content-addressed key/value store for learned
//! patterns, scoped by `node_id`.

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryPatternStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqlitePatternStore;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::symbol::{Event, Symbol};

/// A learned, content-addressed pattern (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    /// `PTRN|<sha1 hex>`; a pure function of `sequence`.
    pub name: Symbol,
    /// Ordered list of events; immutable after first write.
    pub sequence: Vec<Event>,
    /// `sequence.len()`.
    pub length: usize,
    /// Monotonically increasing; bumped on each re-learn of the same hash.
    pub frequency: u64,
    /// Union of symbols across all events in `sequence`.
    pub token_set: BTreeSet<Symbol>,
    /// Count of tokens with multiplicity.
    pub token_count: usize,
    pub first_token: Option<Symbol>,
    pub last_token: Option<Symbol>,
    /// MinHash signature over `token_set`, used by the candidate index (C4).
    pub minhash_sig: Vec<u64>,
    /// LSH band hashes derived from `minhash_sig`.
    pub lsh_bands: Vec<u64>,
    /// `name -> set<string>`, grows only via set union.
    pub metadata: BTreeMap<String, BTreeSet<String>>,
    /// Append-only list of per-learn emotive maps.
    pub emotives: Vec<BTreeMap<String, f32>>,
}

/// Pattern store error types.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A pattern with this name exists with a different `sequence`. Fatal:
    /// aborts the write (spec §3 Invariant 3, §7 `HashCollisionConflict`).
    #[error("hash collision: pattern {name} already stored with a different sequence")]
    HashCollision { name: Symbol },

    /// Retryable storage fault (spec §7 `StorageTransient`).
    #[error("transient storage fault: {0}")]
    Transient(String),

    /// Unrecoverable storage fault (spec §7 `StoragePermanent`).
    #[error("permanent storage fault: {0}")]
    Permanent(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Fields the [`crate::learn::Learner`] derives from a fresh sequence before
/// the first write of a pattern. Passed as plain data (rather than a
/// closure) so [`PatternStore`] stays object-safe — `ProcessorManager`
/// holds `Arc<dyn PatternStore>` per node.
#[derive(Debug, Clone)]
pub struct PatternDerived {
    pub token_set: BTreeSet<Symbol>,
    pub token_count: usize,
    pub first_token: Option<Symbol>,
    pub last_token: Option<Symbol>,
    pub minhash_sig: Vec<u64>,
    pub lsh_bands: Vec<u64>,
}

/// Scoped-by-`node_id` content-addressed pattern store (spec §4.3).
pub trait PatternStore: Send + Sync {
    /// Fetches a pattern by name, or `None` if absent.
    fn get(&self, node_id: &str, name: &str) -> Result<Option<Pattern>>;

    /// Inserts `pattern` if its name is absent (`frequency = 1`, using
    /// `derived` for the immutable derived fields); otherwise verifies
    /// `sequence` equality (`HashCollision` if it differs), increments
    /// `frequency`, unions `metadata`, and appends `emotives`. Returns the
    /// stored pattern and whether this upsert created it.
    fn upsert(
        &self,
        node_id: &str,
        name: &Symbol,
        sequence: &[Event],
        derived: &PatternDerived,
        metadata: &BTreeMap<String, BTreeSet<String>>,
        emotives: &[BTreeMap<String, f32>],
    ) -> Result<(Pattern, bool)>;

    /// Number of patterns stored under `node_id`.
    fn count(&self, node_id: &str) -> Result<u64>;
}
