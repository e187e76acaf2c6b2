//! C8 — Predictor: shortlists candidates, scores, decomposes segments, and
//! returns the top-K predictions for a session's current STM (spec §4.8).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::candidates::CandidateIndex;
use crate::config::NodeConfig;
use crate::store::{Pattern, PatternStore, StoreError};
use crate::symbol::{Event, Symbol};

/// Alignment of STM against one candidate pattern's sequence (spec §4.8(d)).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segments {
    pub past: Vec<Event>,
    pub present: Vec<Event>,
    pub future: Vec<Event>,
    /// Per present-event symbols present in the pattern but absent from the
    /// corresponding STM event.
    pub missing: Vec<Event>,
    /// Per present-event symbols shared between STM and the pattern.
    pub matches: Vec<Event>,
}

/// One scored prediction (spec §4.8(e), §6 `get_predictions`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub pattern_name: Symbol,
    pub frequency: u64,
    pub similarity: f64,
    pub bayesian_prior: f64,
    pub bayesian_likelihood: f64,
    pub bayesian_posterior: f64,
    pub predictive_information: f64,
    pub potential: f64,
    pub emotives: BTreeMap<String, f32>,
    /// `name -> set<string>`, copied from the stored pattern (spec §6
    /// Prediction shape).
    pub metadata: BTreeMap<String, std::collections::BTreeSet<String>>,
    pub segments: Segments,
}

/// Response shape of `get_predictions` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionSet {
    pub predictions: Vec<Prediction>,
    pub count: usize,
}

fn total_symbols(stm: &[Event]) -> usize {
    stm.iter().map(|e| e.len()).sum()
}

/// Dice coefficient on token multisets (spec §4.8(b)).
fn dice_similarity(stm_tokens: &[Symbol], pattern: &Pattern) -> f64 {
    let stm_count = stm_tokens.len();
    let pattern_count = pattern.token_count;
    if stm_count + pattern_count == 0 {
        return 0.0;
    }
    let mut pattern_multiset: BTreeMap<&str, usize> = BTreeMap::new();
    for event in &pattern.sequence {
        for sym in event {
            *pattern_multiset.entry(sym.as_str()).or_insert(0) += 1;
        }
    }
    let mut matches = 0usize;
    for sym in stm_tokens {
        if let Some(remaining) = pattern_multiset.get_mut(sym.as_str()) {
            if *remaining > 0 {
                *remaining -= 1;
                matches += 1;
            }
        }
    }
    2.0 * matches as f64 / (stm_count + pattern_count) as f64
}

/// Finds the window of `pattern.sequence` that best aligns with `stm`,
/// maximizing matched symbols, then minimizing missing symbols, then
/// preferring the leftmost start (spec §4.8(d)).
fn best_alignment(stm: &[Event], pattern: &[Event]) -> (usize, usize) {
    let window_len = stm.len().min(pattern.len()).max(1).min(pattern.len());
    let mut best_start = 0usize;
    let mut best_matches = -1_i64;
    let mut best_missing = i64::MAX;

    for start in 0..=(pattern.len().saturating_sub(window_len)) {
        let mut matches = 0i64;
        let mut missing = 0i64;
        for i in 0..window_len {
            let p_event = &pattern[start + i];
            let s_event: &[Symbol] = stm.get(i).map(Vec::as_slice).unwrap_or(&[]);
            for sym in p_event {
                if s_event.contains(sym) {
                    matches += 1;
                } else {
                    missing += 1;
                }
            }
        }
        let better = matches > best_matches
            || (matches == best_matches && missing < best_missing);
        if better {
            best_matches = matches;
            best_missing = missing;
            best_start = start;
        }
    }
    (best_start, window_len)
}

fn decompose(stm: &[Event], pattern: &Pattern) -> Segments {
    let (start, window_len) = best_alignment(stm, &pattern.sequence);
    let past = pattern.sequence[..start].to_vec();
    let present = pattern.sequence[start..start + window_len].to_vec();
    let future = pattern.sequence[start + window_len..].to_vec();

    let mut missing = Vec::with_capacity(present.len());
    let mut matches = Vec::with_capacity(present.len());
    for (i, p_event) in present.iter().enumerate() {
        let s_event: &[Symbol] = stm.get(i).map(Vec::as_slice).unwrap_or(&[]);
        let mut missing_syms = Vec::new();
        let mut match_syms = Vec::new();
        for sym in p_event {
            if s_event.contains(sym) {
                match_syms.push(sym.clone());
            } else {
                missing_syms.push(sym.clone());
            }
        }
        missing.push(missing_syms);
        matches.push(match_syms);
    }

    Segments {
        past,
        present,
        future,
        missing,
        matches,
    }
}

fn averaged_emotives(emotives: &[BTreeMap<String, f32>]) -> BTreeMap<String, f32> {
    if emotives.is_empty() {
        return BTreeMap::new();
    }
    let mut sums: BTreeMap<String, f32> = BTreeMap::new();
    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    for map in emotives {
        for (k, v) in map {
            *sums.entry(k.clone()).or_insert(0.0) += v;
            *counts.entry(k.clone()).or_insert(0) += 1;
        }
    }
    sums.into_iter()
        .map(|(k, sum)| {
            let n = counts[&k] as f32;
            (k, sum / n)
        })
        .collect()
}

/// Bounded, deterministic, monotone-non-decreasing-in-co-occurrence score
/// (spec §4.8(e)): logistic-style squashing of `ln(1 + co_occurrence_count)`
/// normalized against the largest such value in the current result batch.
/// Zero when the batch has no co-occurrence history at all.
fn predictive_information(raw: f64, batch_max_raw: f64) -> f64 {
    if batch_max_raw <= 0.0 {
        return 0.0;
    }
    (raw / batch_max_raw).clamp(0.0, 1.0)
}

/// Produces the prediction list for a session's current STM (spec §4.8).
pub fn predict(
    node_id: &str,
    stm: &[Event],
    pattern_store: &dyn PatternStore,
    candidates: &CandidateIndex,
    config: &NodeConfig,
) -> Result<PredictionSet, StoreError> {
    if total_symbols(stm) < 2 {
        return Ok(PredictionSet {
            predictions: Vec::new(),
            count: 0,
        });
    }

    let stm_tokens: Vec<Symbol> = stm.iter().flatten().cloned().collect();
    let query_set: std::collections::BTreeSet<Symbol> = stm_tokens.iter().cloned().collect();
    let shortlist = candidates.query(node_id, &query_set, config);
    if shortlist.is_empty() {
        return Ok(PredictionSet {
            predictions: Vec::new(),
            count: 0,
        });
    }

    let mut survivors = Vec::new();
    for name in &shortlist {
        let Some(pattern) = pattern_store.get(node_id, name)? else {
            continue;
        };
        let similarity = dice_similarity(&stm_tokens, &pattern);
        if similarity < config.recall_threshold {
            continue;
        }
        survivors.push((pattern, similarity));
    }

    if survivors.is_empty() {
        return Ok(PredictionSet {
            predictions: Vec::new(),
            count: 0,
        });
    }

    let names: Vec<Symbol> = survivors.iter().map(|(p, _)| p.name.clone()).collect();
    candidates.record_co_occurrence(node_id, &names);

    let total_frequency: f64 = survivors.iter().map(|(p, _)| p.frequency as f64).sum();
    let evidence: f64 = survivors
        .iter()
        .map(|(p, sim)| {
            let prior = if total_frequency > 0.0 {
                p.frequency as f64 / total_frequency
            } else {
                0.0
            };
            sim * prior
        })
        .sum();

    let raw_info: Vec<f64> = survivors
        .iter()
        .map(|(p, _)| (1.0 + candidates.co_occurrence_count(node_id, &p.name) as f64).ln())
        .collect();
    let batch_max_raw = raw_info.iter().cloned().fold(0.0_f64, f64::max);

    let single_survivor = survivors.len() == 1;
    let mut predictions = Vec::with_capacity(survivors.len());
    for (i, (pattern, similarity)) in survivors.into_iter().enumerate() {
        let prior = if total_frequency > 0.0 {
            pattern.frequency as f64 / total_frequency
        } else {
            0.0
        };
        let posterior = if single_survivor {
            1.0
        } else if evidence > 0.0 {
            (similarity * prior) / evidence
        } else {
            0.0
        };
        let info = predictive_information(raw_info[i], batch_max_raw);
        let segments = decompose(stm, &pattern);
        predictions.push(Prediction {
            pattern_name: pattern.name.clone(),
            frequency: pattern.frequency,
            similarity,
            bayesian_prior: prior,
            bayesian_likelihood: similarity,
            bayesian_posterior: posterior,
            predictive_information: info,
            potential: similarity * info,
            emotives: averaged_emotives(&pattern.emotives),
            metadata: pattern.metadata.clone(),
            segments,
        });
    }

    predictions.sort_by(|a, b| {
        b.bayesian_posterior
            .partial_cmp(&a.bayesian_posterior)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.pattern_name.cmp(&b.pattern_name))
    });
    predictions.truncate(config.max_predictions);

    let count = predictions.len();
    Ok(PredictionSet { predictions, count })
}
