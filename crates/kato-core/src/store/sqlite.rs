//! Durable, rusqlite-backed [`PatternStore`].
//!
//! Grounded on the teacher's `storage/sqlite.rs`: separate reader/writer
//! connections behind `Mutex`, WAL mode, `busy_timeout` for built-in retry
//! tolerance on transient lock contention, and `&self` methods so the store
//! is `Send + Sync` and can sit behind an `Arc` without an outer mutex.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::{Pattern, PatternDerived, PatternStore, Result, StoreError};
use crate::symbol::{Event, Symbol};

pub struct SqlitePatternStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

/// Default on-disk location for the durable pattern store: the platform
/// data directory under a `kato` project namespace (e.g.
/// `~/.local/share/kato/patterns.db` on Linux), mirroring where the
/// teacher's storage layer keeps its database file when no explicit path
/// is configured.
pub fn default_db_path() -> Option<std::path::PathBuf> {
    directories::ProjectDirs::from("", "", "kato").map(|dirs| dirs.data_dir().join("patterns.db"))
}

impl SqlitePatternStore {
    /// Opens the store at [`default_db_path`], creating parent directories
    /// as needed. Returns `StoreError::Permanent` if no data directory
    /// could be resolved for this platform.
    pub fn open_default() -> Result<Self> {
        let path = default_db_path()
            .ok_or_else(|| StoreError::Permanent("no platform data directory available".to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Permanent(e.to_string()))?;
        }
        Self::open(&path)
    }

    pub fn open(path: &Path) -> Result<Self> {
        let writer = Connection::open(path).map_err(|e| StoreError::Permanent(e.to_string()))?;
        let reader = Connection::open(path).map_err(|e| StoreError::Permanent(e.to_string()))?;
        for conn in [&writer, &reader] {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;",
            )
            .map_err(|e| StoreError::Permanent(e.to_string()))?;
        }
        writer
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS patterns (
                    node_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    sequence_json TEXT NOT NULL,
                    frequency INTEGER NOT NULL,
                    token_set_json TEXT NOT NULL,
                    token_count INTEGER NOT NULL,
                    first_token TEXT,
                    last_token TEXT,
                    minhash_sig_json TEXT NOT NULL,
                    lsh_bands_json TEXT NOT NULL,
                    metadata_json TEXT NOT NULL,
                    emotives_json TEXT NOT NULL,
                    PRIMARY KEY (node_id, name)
                );",
            )
            .map_err(|e| StoreError::Permanent(e.to_string()))?;
        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        // A single shared in-memory database requires a named, cached URI —
        // otherwise each new `Connection::open` gets its own empty database.
        let writer = Connection::open("file:kato-pattern-store?mode=memory&cache=shared")
            .map_err(|e| StoreError::Permanent(e.to_string()))?;
        let reader = Connection::open("file:kato-pattern-store?mode=memory&cache=shared")
            .map_err(|e| StoreError::Permanent(e.to_string()))?;
        writer
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS patterns (
                    node_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    sequence_json TEXT NOT NULL,
                    frequency INTEGER NOT NULL,
                    token_set_json TEXT NOT NULL,
                    token_count INTEGER NOT NULL,
                    first_token TEXT,
                    last_token TEXT,
                    minhash_sig_json TEXT NOT NULL,
                    lsh_bands_json TEXT NOT NULL,
                    metadata_json TEXT NOT NULL,
                    emotives_json TEXT NOT NULL,
                    PRIMARY KEY (node_id, name)
                );",
            )
            .map_err(|e| StoreError::Permanent(e.to_string()))?;
        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }

    fn row_to_pattern(row: &rusqlite::Row) -> rusqlite::Result<Pattern> {
        let sequence_json: String = row.get("sequence_json")?;
        let token_set_json: String = row.get("token_set_json")?;
        let minhash_sig_json: String = row.get("minhash_sig_json")?;
        let lsh_bands_json: String = row.get("lsh_bands_json")?;
        let metadata_json: String = row.get("metadata_json")?;
        let emotives_json: String = row.get("emotives_json")?;

        let sequence: Vec<Event> = serde_json::from_str(&sequence_json).unwrap_or_default();
        let token_set: BTreeSet<Symbol> = serde_json::from_str(&token_set_json).unwrap_or_default();
        let minhash_sig: Vec<u64> = serde_json::from_str(&minhash_sig_json).unwrap_or_default();
        let lsh_bands: Vec<u64> = serde_json::from_str(&lsh_bands_json).unwrap_or_default();
        let metadata: BTreeMap<String, BTreeSet<String>> =
            serde_json::from_str(&metadata_json).unwrap_or_default();
        let emotives: Vec<BTreeMap<String, f32>> = serde_json::from_str(&emotives_json).unwrap_or_default();

        Ok(Pattern {
            name: row.get("name")?,
            length: sequence.len(),
            sequence,
            frequency: row.get::<_, i64>("frequency")? as u64,
            token_set,
            token_count: row.get::<_, i64>("token_count")? as usize,
            first_token: row.get("first_token")?,
            last_token: row.get("last_token")?,
            minhash_sig,
            lsh_bands,
            metadata,
            emotives,
        })
    }
}

impl PatternStore for SqlitePatternStore {
    fn get(&self, node_id: &str, name: &str) -> Result<Option<Pattern>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        conn.query_row(
            "SELECT * FROM patterns WHERE node_id = ?1 AND name = ?2",
            params![node_id, name],
            Self::row_to_pattern,
        )
        .optional()
        .map_err(|e| StoreError::Transient(e.to_string()))
    }

    fn upsert(
        &self,
        node_id: &str,
        name: &Symbol,
        sequence: &[Event],
        derived: &PatternDerived,
        metadata: &BTreeMap<String, BTreeSet<String>>,
        emotives: &[BTreeMap<String, f32>],
    ) -> Result<(Pattern, bool)> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        let tx = conn.unchecked_transaction().map_err(|e| StoreError::Transient(e.to_string()))?;

        let existing = tx
            .query_row(
                "SELECT * FROM patterns WHERE node_id = ?1 AND name = ?2",
                params![node_id, name],
                Self::row_to_pattern,
            )
            .optional()
            .map_err(|e| StoreError::Transient(e.to_string()))?;

        if let Some(mut pattern) = existing {
            if pattern.sequence != sequence {
                return Err(StoreError::HashCollision { name: name.clone() });
            }
            pattern.frequency += 1;
            for (key, values) in metadata {
                pattern.metadata.entry(key.clone()).or_default().extend(values.iter().cloned());
            }
            pattern.emotives.extend(emotives.iter().cloned());

            tx.execute(
                "UPDATE patterns SET frequency = ?1, metadata_json = ?2, emotives_json = ?3
                 WHERE node_id = ?4 AND name = ?5",
                params![
                    pattern.frequency as i64,
                    serde_json::to_string(&pattern.metadata).unwrap(),
                    serde_json::to_string(&pattern.emotives).unwrap(),
                    node_id,
                    name,
                ],
            )
            .map_err(|e| StoreError::Transient(e.to_string()))?;
            tx.commit().map_err(|e| StoreError::Transient(e.to_string()))?;
            return Ok((pattern, false));
        }

        let pattern = Pattern {
            name: name.clone(),
            sequence: sequence.to_vec(),
            length: sequence.len(),
            frequency: 1,
            token_set: derived.token_set.clone(),
            token_count: derived.token_count,
            first_token: derived.first_token.clone(),
            last_token: derived.last_token.clone(),
            minhash_sig: derived.minhash_sig.clone(),
            lsh_bands: derived.lsh_bands.clone(),
            metadata: metadata.clone(),
            emotives: emotives.to_vec(),
        };

        tx.execute(
            "INSERT INTO patterns
             (node_id, name, sequence_json, frequency, token_set_json, token_count,
              first_token, last_token, minhash_sig_json, lsh_bands_json, metadata_json, emotives_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                node_id,
                pattern.name,
                serde_json::to_string(&pattern.sequence).unwrap(),
                1_i64,
                serde_json::to_string(&pattern.token_set).unwrap(),
                pattern.token_count as i64,
                pattern.first_token,
                pattern.last_token,
                serde_json::to_string(&pattern.minhash_sig).unwrap(),
                serde_json::to_string(&pattern.lsh_bands).unwrap(),
                serde_json::to_string(&pattern.metadata).unwrap(),
                serde_json::to_string(&pattern.emotives).unwrap(),
            ],
        )
        .map_err(|e| StoreError::Transient(e.to_string()))?;
        tx.commit().map_err(|e| StoreError::Transient(e.to_string()))?;
        Ok((pattern, true))
    }

    fn count(&self, node_id: &str) -> Result<u64> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        conn.query_row(
            "SELECT COUNT(*) FROM patterns WHERE node_id = ?1",
            params![node_id],
            |row| row.get::<_, i64>(0),
        )
        .map(|n| n as u64)
        .map_err(|e| StoreError::Transient(e.to_string()))
    }
}
