//! # kato-core
//!
//! Sequence-learning and pattern-prediction engine. Observations (symbols,
//! vectors, emotives, metadata) accumulate in a per-session short-term
//! memory; learning compresses short-term memory into content-addressed
//! patterns keyed by a deterministic hash of their event sequence;
//! prediction shortlists and scores stored patterns against the current
//! short-term memory.
//!
//! ## Pipeline
//!
//! - **C1 Hasher** (`hash`) — canonical serialization and SHA-1 hashing of
//!   event sequences and vectors.
//! - **C2 Vector Index** (`vector`) — resolves dense vectors into symbols
//!   via nearest-neighbor lookup.
//! - **C3 Pattern Store** (`store`) — content-addressed, `node_id`-scoped
//!   storage of learned patterns.
//! - **C4 Candidate Index** (`candidates`) — token-level and LSH-banded
//!   shortlisting so prediction never scans every stored pattern.
//! - **C5 Session State** (`session`) — per-session short-term memory and
//!   its TTL-governed registry.
//! - **C6 Observation Processor** (`observe`) — ingests one observation.
//! - **C7 Learner** (`learn`) — compresses short-term memory into a pattern.
//! - **C8 Predictor** (`predict`) — scores and ranks candidate patterns.
//! - **C9 Processor Manager** (`processor`) — binds `node_id` to an
//!   isolated `(C2, C3, C4)` triple.
//!
//! [`engine::Engine`] wires all of the above into the external operation
//! surface: session lifecycle, `observe`/`observe_sequence`, `learn`,
//! `get_predictions`, and session config overrides.
//!
//! ## Quick start
//!
//! ```rust
//! use kato_core::config::NodeConfig;
//! use kato_core::engine::Engine;
//! use kato_core::observe::Observation;
//!
//! let engine = Engine::new(NodeConfig::default(), 1000);
//! let session = engine.create_session("demo-node", None, Default::default()).unwrap();
//!
//! engine.observe(&session.session_id, &Observation {
//!     strings: vec!["hello".to_string(), "world".to_string()],
//!     ..Default::default()
//! }).unwrap();
//!
//! let outcome = engine.learn(&session.session_id).unwrap();
//! assert_eq!(outcome.status, kato_core::learn::LearnStatus::Learned);
//! ```
//!
//! ## Feature flags
//!
//! - `sqlite` (default): enables [`store::SqlitePatternStore`], a durable
//!   `rusqlite`-backed implementation of [`store::PatternStore`].

#![warn(rustdoc::missing_crate_level_docs)]

pub mod candidates;
pub mod config;
pub mod engine;
pub mod error;
pub mod hash;
pub mod learn;
pub mod observe;
pub mod predict;
pub mod processor;
pub mod session;
pub mod store;
pub mod symbol;
pub mod vector;

pub use config::{NodeConfig, SessionConfigOverrides, StmMode};
pub use engine::{Engine, ObserveSequenceOptions, ObserveSequenceSummary, SessionRecord, StmView};
pub use error::{KatoError, Result};
pub use learn::{LearnOutcome, LearnStatus};
pub use observe::{Observation, ObserveAck};
pub use predict::{Prediction, PredictionSet, Segments};
pub use store::Pattern;
pub use symbol::{Event, Symbol};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::{
        Engine, KatoError, LearnOutcome, LearnStatus, NodeConfig, ObserveAck, Observation,
        Prediction, PredictionSet, Result, SessionConfigOverrides, SessionRecord, StmView,
    };
}
