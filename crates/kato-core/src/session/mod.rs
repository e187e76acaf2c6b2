//! C5 — Session State: per-session mutable state and its registry.
//!
//! Grounded on the teacher's `Storage` (separate guarded resources behind
//! `&self`, `Send + Sync`) but per-session rather than per-process: each
//! session is one `parking_lot::Mutex<SessionState>` inside a
//! `DashMap<SessionId, _>` registry, so STM mutations on session A never
//! contend with session B (spec §5 "Cross-session isolation").

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SessionConfigOverrides;
use crate::symbol::Event;

/// Session lifecycle error types (spec §7).
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
    /// TTL elapsed. Externally equivalent to `NotFound` but distinguishable
    /// in logs (spec §7).
    #[error("session expired: {0}")]
    Expired(String),
    #[error("invalid session config: {0}")]
    InvalidConfig(String),
    /// Session registry is at its configured capacity.
    #[error("session registry at capacity ({0} sessions)")]
    Capacity(usize),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Per-session mutable state (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub node_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ttl_seconds: i64,
    /// Ordered sequence of sorted events.
    pub stm: Vec<Event>,
    /// Ordered list of per-event emotive maps, one per observation in STM.
    pub emotives_acc: Vec<BTreeMap<String, f32>>,
    /// `name -> set<string>` aggregated across observations in STM.
    pub metadata_acc: BTreeMap<String, BTreeSet<String>>,
    /// Session time counter, incremented once per observation.
    pub time: u64,
    pub config_overrides: SessionConfigOverrides,
    /// Arbitrary session metadata supplied at creation (spec §6 `create_session`).
    pub metadata: BTreeMap<String, String>,
}

impl SessionState {
    fn new(node_id: String, ttl_seconds: i64, metadata: BTreeMap<String, String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4().to_string(),
            node_id,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(ttl_seconds),
            ttl_seconds,
            stm: Vec::new(),
            emotives_acc: Vec::new(),
            metadata_acc: BTreeMap::new(),
            time: 0,
            config_overrides: SessionConfigOverrides::default(),
            metadata,
        }
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Slides `expires_at` forward by `ttl_seconds` from `now` (spec §4.5:
    /// "Every read or write operation extends `expires_at`").
    fn touch(&mut self, now: DateTime<Utc>) {
        self.expires_at = now + chrono::Duration::seconds(self.ttl_seconds);
    }

    /// Clears STM and both accumulators, leaving `time` and TTL untouched.
    pub fn clear_all(&mut self) {
        self.stm.clear();
        self.emotives_acc.clear();
        self.metadata_acc.clear();
    }
}

/// Registry of live sessions. Each session's state lives behind its own
/// lock so per-session serialization never blocks unrelated sessions
/// (spec §5 "Per-session serialization").
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Mutex<SessionState>>>,
    capacity: usize,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            capacity,
        }
    }

    pub fn create(
        &self,
        node_id: String,
        ttl_seconds: i64,
        metadata: BTreeMap<String, String>,
    ) -> Result<Arc<Mutex<SessionState>>> {
        if self.sessions.len() >= self.capacity {
            return Err(SessionError::Capacity(self.capacity));
        }
        let state = SessionState::new(node_id, ttl_seconds, metadata);
        let session_id = state.session_id.clone();
        let handle = Arc::new(Mutex::new(state));
        self.sessions.insert(session_id, handle.clone());
        Ok(handle)
    }

    /// Fetches the live session, extending its TTL as a side effect of
    /// access (spec §4.5 sliding expiration). Fails with `Expired` (and
    /// evicts the entry) if the TTL had already elapsed.
    pub fn get(&self, session_id: &str) -> Result<Arc<Mutex<SessionState>>> {
        let handle = self
            .sessions
            .get(session_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        let now = Utc::now();
        {
            let mut state = handle.lock();
            if state.is_expired_at(now) {
                drop(state);
                self.sessions.remove(session_id);
                return Err(SessionError::Expired(session_id.to_string()));
            }
            state.touch(now);
        }
        Ok(handle)
    }

    pub fn exists(&self, session_id: &str) -> bool {
        self.get(session_id).is_ok()
    }

    pub fn extend(&self, session_id: &str, ttl_seconds: i64) -> Result<()> {
        let handle = self.get(session_id)?;
        let mut state = handle.lock();
        state.ttl_seconds = ttl_seconds;
        state.touch(Utc::now());
        Ok(())
    }

    pub fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
