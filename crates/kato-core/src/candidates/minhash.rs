//! MinHash signature + LSH banding over a pattern's token set.
//!
//! Grounded in spirit on the teacher's `neuroscience/hippocampal_index.rs`
//! "index layer is compact and searchable, content layer is full" split:
//! here the MinHash signature is the compact index, banded into groups so
//! that any two token sets sharing a band value become LSH candidates for
//! each other.

use std::collections::BTreeSet;

use crate::symbol::Symbol;

/// One fixed hash function per signature row: `h_i(x) = (a_i * x + b_i) mod p`,
/// over the token's own stable hash. `a`/`b` are derived from a fixed seed so
/// that signatures are reproducible across processes (spec §4.1 determinism
/// applies equally to these derived fields).
const MERSENNE_PRIME: u64 = (1u64 << 61) - 1;

fn token_hash(token: &str) -> u64 {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(token.as_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes(digest[0..8].try_into().expect("sha1 digest is 20 bytes"))
}

fn coefficients(rows: usize) -> Vec<(u64, u64)> {
    // Fixed, deterministic coefficient stream derived from a constant seed
    // via a simple LCG — no external RNG dependency, no per-process
    // randomness, reproducible forever.
    let mut state: u64 = 0x9E3779B97F4A7C15;
    (0..rows)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let a = (state % (MERSENNE_PRIME - 1)) + 1;
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let b = state % MERSENNE_PRIME;
            (a, b)
        })
        .collect()
}

/// Computes a MinHash signature of length `bands * rows_per_band` over
/// `token_set`. Empty token sets yield an all-`u64::MAX` signature.
pub fn minhash_signature(token_set: &BTreeSet<Symbol>, bands: usize, rows_per_band: usize) -> Vec<u64> {
    let total_rows = bands * rows_per_band;
    let coeffs = coefficients(total_rows);
    if token_set.is_empty() {
        return vec![u64::MAX; total_rows];
    }
    coeffs
        .iter()
        .map(|&(a, b)| {
            token_set
                .iter()
                .map(|t| {
                    let x = token_hash(t) % MERSENNE_PRIME;
                    a.wrapping_mul(x).wrapping_add(b) % MERSENNE_PRIME
                })
                .min()
                .unwrap_or(u64::MAX)
        })
        .collect()
}

/// Splits a MinHash signature into `bands` band hashes of `rows_per_band`
/// rows each. Two signatures sharing any band hash are LSH candidates.
pub fn lsh_bands(signature: &[u64], bands: usize, rows_per_band: usize) -> Vec<u64> {
    signature
        .chunks(rows_per_band)
        .take(bands)
        .map(|chunk| {
            use sha1::{Digest, Sha1};
            let mut hasher = Sha1::new();
            for v in chunk {
                hasher.update(v.to_be_bytes());
            }
            let digest = hasher.finalize();
            u64::from_be_bytes(digest[0..8].try_into().expect("sha1 digest is 20 bytes"))
        })
        .collect()
}
