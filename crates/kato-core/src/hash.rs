//! C1 — Hasher: deterministic content hash over canonicalized event
//! sequences and vectors.
//!
//! Determinism is a correctness property: the same sequence must reduce to
//! the same pattern name on every machine, forever (spec §4.1). The
//! canonical textual form is therefore frozen here and must never change.

use sha1::{Digest, Sha1};

use crate::symbol::{Event, Symbol, PATTERN_PREFIX, VECTOR_PREFIX};

/// Serializes a canonical STM (events in given order, symbols within each
/// event already sorted) into the frozen textual form that is hashed.
///
/// Form: events joined by `\n`, symbols within an event joined by `\x1f`
/// (unit separator, never a legal symbol character in practice but not
/// relied upon for safety — the join is unambiguous because event/symbol
/// counts are hashed structurally, not parsed back out).
fn canonical_stm_text(stm: &[Event]) -> String {
    let mut out = String::new();
    for (i, event) in stm.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for (j, sym) in event.iter().enumerate() {
            if j > 0 {
                out.push('\x1f');
            }
            out.push_str(sym);
        }
    }
    out
}

/// Computes `PTRN|<sha1 hex>` over the canonical textual form of `stm`.
///
/// `stm` must already be canonicalized (sorted-within-event); this function
/// does not re-sort, matching the adopted rule that sorting happens once,
/// at ingestion (spec §9 Open Question resolution).
pub fn hash_pattern(stm: &[Event]) -> Symbol {
    let text = canonical_stm_text(stm);
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    format!("{PATTERN_PREFIX}{digest:x}")
}

/// Canonical textual form of a dense vector: fixed-precision decimal digits
/// joined by commas, so floating point formatting never drifts across
/// platforms for the same bit pattern.
fn canonical_vector_text(vector: &[f32]) -> String {
    let mut out = String::with_capacity(vector.len() * 12);
    for (i, v) in vector.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&format!("{v:.8}"));
    }
    out
}

/// Computes `VCTR|<sha1 hex>` over the canonical textual form of `vector`.
pub fn hash_vector(vector: &[f32]) -> Symbol {
    let text = canonical_vector_text(vector);
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    format!("{VECTOR_PREFIX}{digest:x}")
}
