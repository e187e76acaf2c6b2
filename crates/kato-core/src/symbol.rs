//! Symbol, event, and the two reserved content-addressed prefixes.

use serde::{Deserialize, Serialize};

/// Prefix for a vector-derived symbol: `VCTR|<hex>`.
pub const VECTOR_PREFIX: &str = "VCTR|";

/// Prefix for a pattern name: `PTRN|<40 lowercase hex chars>`.
pub const PATTERN_PREFIX: &str = "PTRN|";

/// A single opaque domain token, or a `VCTR|`/`PTRN|`-prefixed derived symbol.
///
/// Two reserved prefixes are semantic (`VCTR|`, `PTRN|`); every other string
/// is an opaque domain token with no interpreted structure.
pub type Symbol = String;

/// Returns true if `s` is a vector-derived symbol (`VCTR|<hex>`).
pub fn is_vector_symbol(s: &str) -> bool {
    s.starts_with(VECTOR_PREFIX)
}

/// Returns true if `s` is a pattern name (`PTRN|` + 40 lowercase hex chars).
pub fn is_pattern_name(s: &str) -> bool {
    let Some(hex) = s.strip_prefix(PATTERN_PREFIX) else {
        return false;
    };
    hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

/// One temporal position in STM: a set of symbols observed simultaneously,
/// stored as a sorted sequence. Never empty once it appears in STM (§3
/// Invariant: "Empty events never appear in STM").
pub type Event = Vec<Symbol>;

/// Sorts a symbol set ascending and removes duplicates (§8 law:
/// `canonical(event) = sort(dedupe(event))`, idempotent).
pub fn canonicalize_event(symbols: impl IntoIterator<Item = Symbol>) -> Event {
    let mut v: Vec<Symbol> = symbols.into_iter().collect();
    v.sort_unstable();
    v.dedup();
    v
}
