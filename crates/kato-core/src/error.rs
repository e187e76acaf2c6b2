//! Crate-level error type.
//!
//! Each subsystem defines its own `thiserror` enum (`store::StoreError`,
//! `vector::VectorIndexError`, `session::SessionError`, ...), matching the
//! teacher's one-error-type-per-module convention. `KatoError` is the
//! `#[from]`-aggregating type returned by the [`crate::engine::Engine`]
//! facade for callers that want a single error type at the boundary.

use crate::candidates::IndexError;
use crate::session::SessionError;
use crate::store::StoreError;
use crate::vector::VectorIndexError;

/// Crate-level error returned by the [`crate::engine::Engine`] facade.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum KatoError {
    /// Session lifecycle failure (not found, expired, bad config).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Pattern store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Candidate index failure.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Vector index failure.
    #[error(transparent)]
    Vector(#[from] VectorIndexError),

    /// Observation was structurally invalid (e.g. NaN/out-of-range emotive).
    #[error("invalid observation: {0}")]
    InvalidObservation(String),

    /// Deadline reached or explicit cancellation requested (spec §5/§7).
    #[error("operation cancelled")]
    Cancelled,
}

impl KatoError {
    /// True for faults the core itself may retry internally (`StorageTransient`).
    pub fn is_transient(&self) -> bool {
        match self {
            KatoError::Store(e) => e.is_transient(),
            KatoError::Index(e) => e.is_transient(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, KatoError>;
