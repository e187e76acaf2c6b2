//! Engine facade: wires C1-C9 to the external operation surface (spec §6).
//!
//! Grounded on the teacher's top-level `VestigeMemory` facade in
//! `memory/mod.rs`: one struct owning the long-lived collaborators
//! (`ProcessorManager`, `SessionRegistry`), exposing a flat method surface
//! that maps `SessionError`/`StoreError`/etc into the crate-level
//! [`KatoError`], with `tracing` spans at the boundary of each operation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::{NodeConfig, SessionConfigOverrides};
use crate::error::{KatoError, Result};
use crate::learn::{learn as run_learn, ClearPolicy, LearnOutcome};
use crate::observe::{observe as run_observe, Observation, ObserveAck};
use crate::predict::{predict as run_predict, PredictionSet};
use crate::processor::ProcessorManager;
use crate::session::SessionRegistry;
use crate::symbol::{Event, Symbol};

/// Current STM contents (spec §6 `get_stm`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StmView {
    pub stm: Vec<Event>,
    pub length: usize,
}

/// Summary of a batch `observe_sequence` call (spec §11, grounded on
/// `ObservationSequenceResult` in `original_source/kato/api/schemas`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserveSequenceSummary {
    pub initial_stm_length: usize,
    pub final_stm_length: usize,
    pub observations_processed: usize,
    pub auto_learned_patterns: Vec<Symbol>,
}

/// Externally visible session metadata (spec §11, grounded on
/// `SessionResponse`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub node_id: String,
    pub time: u64,
    pub stm_length: usize,
}

/// Flags accepted by `observe_sequence` (spec §6, §11).
#[derive(Debug, Clone, Copy, Default)]
pub struct ObserveSequenceOptions {
    pub learn_after_each: bool,
    pub learn_at_end: bool,
    pub clear_stm_between: bool,
}

/// Facade over C1-C9, owning the long-lived per-node bindings and the
/// session registry. One `Engine` per process is the expected topology
/// (spec §5: sessions on the same `node_id` share C2/C3/C4, never STM).
pub struct Engine {
    processors: ProcessorManager,
    sessions: SessionRegistry,
    node_config: NodeConfig,
}

impl Engine {
    /// Builds an engine with in-memory backends and the given process-wide
    /// defaults and session capacity.
    pub fn new(node_config: NodeConfig, session_capacity: usize) -> Self {
        Self {
            processors: ProcessorManager::in_memory(),
            sessions: SessionRegistry::new(session_capacity),
            node_config,
        }
    }

    fn effective_config(&self, overrides: &SessionConfigOverrides) -> NodeConfig {
        self.node_config.apply_overrides(overrides)
    }

    #[tracing::instrument(skip(self, metadata))]
    pub fn create_session(
        &self,
        node_id: &str,
        ttl_seconds: Option<i64>,
        metadata: BTreeMap<String, String>,
    ) -> Result<SessionRecord> {
        let ttl = ttl_seconds.unwrap_or(self.node_config.default_ttl_seconds);
        let handle = self.sessions.create(node_id.to_string(), ttl, metadata)?;
        let state = handle.lock();
        Ok(SessionRecord {
            session_id: state.session_id.clone(),
            node_id: state.node_id.clone(),
            time: state.time,
            stm_length: state.stm.len(),
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn get_session(&self, session_id: &str) -> Result<SessionRecord> {
        let handle = self.sessions.get(session_id)?;
        let state = handle.lock();
        Ok(SessionRecord {
            session_id: state.session_id.clone(),
            node_id: state.node_id.clone(),
            time: state.time,
            stm_length: state.stm.len(),
        })
    }

    pub fn extend_session(&self, session_id: &str, ttl_seconds: i64) -> Result<()> {
        Ok(self.sessions.extend(session_id, ttl_seconds)?)
    }

    pub fn delete_session(&self, session_id: &str) -> Result<()> {
        Ok(self.sessions.delete(session_id)?)
    }

    pub fn session_exists(&self, session_id: &str) -> bool {
        self.sessions.exists(session_id)
    }

    #[tracing::instrument(skip(self, observation))]
    pub fn observe(&self, session_id: &str, observation: &Observation) -> Result<ObserveAck> {
        let handle = self.sessions.get(session_id)?;
        let mut state = handle.lock();
        let processor = self.processors.get_or_create(&state.node_id);
        let config = self.effective_config(&state.config_overrides);
        run_observe(
            &mut state,
            observation,
            processor.vector_index.as_ref(),
            processor.pattern_store.as_ref(),
            &processor.candidate_index,
            &config,
        )
        .map_err(KatoError::from)
    }

    #[tracing::instrument(skip(self, observations))]
    pub fn observe_sequence(
        &self,
        session_id: &str,
        observations: &[Observation],
        options: ObserveSequenceOptions,
    ) -> Result<ObserveSequenceSummary> {
        let handle = self.sessions.get(session_id)?;
        let processor = {
            let state = handle.lock();
            self.processors.get_or_create(&state.node_id)
        };

        let initial_stm_length = handle.lock().stm.len();
        let mut auto_learned_patterns = Vec::new();

        for observation in observations {
            let mut state = handle.lock();
            let config = self.effective_config(&state.config_overrides);
            let ack = run_observe(
                &mut state,
                observation,
                processor.vector_index.as_ref(),
                processor.pattern_store.as_ref(),
                &processor.candidate_index,
                &config,
            )?;
            if let Some(name) = ack.auto_learned_pattern {
                auto_learned_patterns.push(name);
            }

            if options.learn_after_each {
                let outcome = run_learn(
                    &mut state,
                    processor.pattern_store.as_ref(),
                    &processor.candidate_index,
                    &config,
                    ClearPolicy::ClearOnSuccess,
                )?;
                if outcome.status == crate::learn::LearnStatus::Learned {
                    auto_learned_patterns.push(outcome.pattern_name);
                }
            }
            if options.clear_stm_between {
                state.clear_all();
            }
        }

        if options.learn_at_end {
            let mut state = handle.lock();
            let config = self.effective_config(&state.config_overrides);
            let outcome = run_learn(
                &mut state,
                processor.pattern_store.as_ref(),
                &processor.candidate_index,
                &config,
                ClearPolicy::ClearOnSuccess,
            )?;
            if outcome.status == crate::learn::LearnStatus::Learned {
                auto_learned_patterns.push(outcome.pattern_name);
            }
        }

        let final_stm_length = handle.lock().stm.len();
        Ok(ObserveSequenceSummary {
            initial_stm_length,
            final_stm_length,
            observations_processed: observations.len(),
            auto_learned_patterns,
        })
    }

    pub fn get_stm(&self, session_id: &str) -> Result<StmView> {
        let handle = self.sessions.get(session_id)?;
        let state = handle.lock();
        Ok(StmView {
            stm: state.stm.clone(),
            length: state.stm.len(),
        })
    }

    pub fn clear_stm(&self, session_id: &str) -> Result<()> {
        let handle = self.sessions.get(session_id)?;
        handle.lock().stm.clear();
        Ok(())
    }

    pub fn clear_all(&self, session_id: &str) -> Result<()> {
        let handle = self.sessions.get(session_id)?;
        handle.lock().clear_all();
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn learn(&self, session_id: &str) -> Result<LearnOutcome> {
        let handle = self.sessions.get(session_id)?;
        let mut state = handle.lock();
        let processor = self.processors.get_or_create(&state.node_id);
        let config = self.effective_config(&state.config_overrides);
        run_learn(
            &mut state,
            processor.pattern_store.as_ref(),
            &processor.candidate_index,
            &config,
            ClearPolicy::ClearOnSuccess,
        )
        .map_err(KatoError::from)
    }

    #[tracing::instrument(skip(self))]
    pub fn get_predictions(&self, session_id: &str) -> Result<PredictionSet> {
        let handle = self.sessions.get(session_id)?;
        let state = handle.lock();
        let processor = self.processors.get_or_create(&state.node_id);
        let config = self.effective_config(&state.config_overrides);
        run_predict(
            &state.node_id,
            &state.stm,
            processor.pattern_store.as_ref(),
            &processor.candidate_index,
            &config,
        )
        .map_err(KatoError::from)
    }

    pub fn update_session_config(
        &self,
        session_id: &str,
        patch: SessionConfigOverrides,
    ) -> Result<()> {
        let handle = self.sessions.get(session_id)?;
        let mut state = handle.lock();
        state.config_overrides.merge(patch)?;
        Ok(())
    }
}

/// Union of distinct symbols observed in `stm`, used by callers that want a
/// raw token set outside of `predict`'s internals (e.g. tests, or a future
/// collaborator inspecting STM contents).
pub fn stm_token_set(stm: &[Event]) -> BTreeSet<Symbol> {
    stm.iter().flatten().cloned().collect()
}
