//! Node defaults and per-session configuration overrides (spec §4.5, §6
//! "Environment configuration").
//!
//! Grounded on `examples/original_source/kato/config/user_config.py`:
//! `UserConfiguration` there models every override as `Optional[T]` with
//! `None` meaning "use system default", validates ranges, and rolls back on
//! a failed update rather than leaving a half-applied config. `NodeConfig`
//! plays the role of the Python module's system defaults; `SessionConfigOverrides`
//! is the direct typed translation of `UserConfiguration`.

use serde::{Deserialize, Serialize};

use crate::session::SessionError;

/// STM retention policy applied immediately after an auto-learn fires
/// (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum StmMode {
    /// Empty STM, emotives, and metadata after auto-learn.
    #[default]
    Clear,
    /// Drop the oldest event (and its accumulator contributions) so STM
    /// length becomes `max_pattern_length - 1`, then continue.
    Rolling,
}

/// Process-wide defaults, supplied at [`crate::processor::ProcessorManager`]
/// construction and used whenever a session does not override a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    pub recall_threshold: f64,
    pub persistence: u32,
    pub max_pattern_length: usize,
    pub max_predictions: usize,
    pub sort_symbols: bool,
    pub process_predictions: bool,
    pub stm_mode: StmMode,
    /// K in vector nearest-neighbor lookup (§3: "up to K-1 nearest-neighbor
    /// symbols"; K itself, defaults to 4).
    pub vector_neighbor_k: usize,
    /// Number of LSH bands for the candidate index (C4).
    pub lsh_bands: usize,
    /// Rows hashed per LSH band.
    pub lsh_rows_per_band: usize,
    /// Default session TTL in seconds when a session does not specify one.
    pub default_ttl_seconds: i64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            recall_threshold: 0.1,
            persistence: 5,
            max_pattern_length: 0,
            max_predictions: 100,
            sort_symbols: true,
            process_predictions: true,
            stm_mode: StmMode::Clear,
            vector_neighbor_k: 4,
            lsh_bands: 16,
            lsh_rows_per_band: 4,
            default_ttl_seconds: 3600,
        }
    }
}

impl NodeConfig {
    /// Loads overrides from environment variables, falling back to
    /// [`NodeConfig::default`] for anything unset or unparsable.
    ///
    /// Mirrors `user_config.py`'s role as process-level defaults read once
    /// at startup, before any per-session override is applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_f64("KATO_RECALL_THRESHOLD") {
            cfg.recall_threshold = v;
        }
        if let Some(v) = env_u32("KATO_PERSISTENCE") {
            cfg.persistence = v;
        }
        if let Some(v) = env_usize("KATO_MAX_PATTERN_LENGTH") {
            cfg.max_pattern_length = v;
        }
        if let Some(v) = env_usize("KATO_MAX_PREDICTIONS") {
            cfg.max_predictions = v;
        }
        if let Some(v) = env_usize("KATO_VECTOR_NEIGHBOR_K") {
            cfg.vector_neighbor_k = v;
        }
        if let Some(v) = env_usize("KATO_LSH_BANDS") {
            cfg.lsh_bands = v;
        }
        if let Some(v) = env_usize("KATO_LSH_ROWS_PER_BAND") {
            cfg.lsh_rows_per_band = v;
        }
        cfg
    }

    /// Applies `overrides` on top of this node's defaults, producing the
    /// effective configuration for one session operation.
    pub fn apply_overrides(&self, overrides: &SessionConfigOverrides) -> NodeConfig {
        NodeConfig {
            recall_threshold: overrides.recall_threshold.unwrap_or(self.recall_threshold),
            persistence: overrides.persistence.unwrap_or(self.persistence),
            max_pattern_length: overrides.max_pattern_length.unwrap_or(self.max_pattern_length),
            max_predictions: overrides.max_predictions.unwrap_or(self.max_predictions),
            sort_symbols: overrides.sort_symbols.unwrap_or(self.sort_symbols),
            process_predictions: overrides.process_predictions.unwrap_or(self.process_predictions),
            stm_mode: overrides.stm_mode.unwrap_or(self.stm_mode),
            ..self.clone()
        }
    }
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Per-session overrides of [`NodeConfig`] fields. `None` means "use the
/// node default" (spec §4.5).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfigOverrides {
    pub recall_threshold: Option<f64>,
    pub persistence: Option<u32>,
    pub max_pattern_length: Option<usize>,
    pub max_predictions: Option<usize>,
    pub sort_symbols: Option<bool>,
    pub process_predictions: Option<bool>,
    pub stm_mode: Option<StmMode>,
}

impl SessionConfigOverrides {
    /// Validates every set field, returning `SessionError::InvalidConfig` on
    /// the first violation. Callers apply a patch only after validation
    /// succeeds, so a rejected update never partially lands (mirrors
    /// `UserConfiguration.update`'s rollback-on-failure behavior).
    pub fn validate(&self) -> std::result::Result<(), SessionError> {
        if let Some(t) = self.recall_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(SessionError::InvalidConfig(format!(
                    "recall_threshold must be in [0,1], got {t}"
                )));
            }
        }
        if let Some(p) = self.persistence {
            if !(1..=100).contains(&p) {
                return Err(SessionError::InvalidConfig(format!(
                    "persistence must be in [1,100], got {p}"
                )));
            }
        }
        if let Some(n) = self.max_predictions {
            if !(1..=10_000).contains(&n) {
                return Err(SessionError::InvalidConfig(format!(
                    "max_predictions must be in [1,10000], got {n}"
                )));
            }
        }
        // max_pattern_length has no upper bound; 0 means unbounded (spec §4.5).
        Ok(())
    }

    /// Merges `patch` onto `self` field-by-field (patch wins where set),
    /// validating the result before committing. On failure, `self` is left
    /// untouched.
    pub fn merge(&mut self, patch: SessionConfigOverrides) -> std::result::Result<(), SessionError> {
        patch.validate()?;
        let merged = SessionConfigOverrides {
            recall_threshold: patch.recall_threshold.or(self.recall_threshold),
            persistence: patch.persistence.or(self.persistence),
            max_pattern_length: patch.max_pattern_length.or(self.max_pattern_length),
            max_predictions: patch.max_predictions.or(self.max_predictions),
            sort_symbols: patch.sort_symbols.or(self.sort_symbols),
            process_predictions: patch.process_predictions.or(self.process_predictions),
            stm_mode: patch.stm_mode.or(self.stm_mode),
        };
        merged.validate()?;
        *self = merged;
        Ok(())
    }
}
