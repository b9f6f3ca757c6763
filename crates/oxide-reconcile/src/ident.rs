//! Identifier helpers.

use sha2::{Digest, Sha256};

/// Number of hex characters in the hash suffix of a shortened name.
const HASH_LEN: usize = 32;

/// Shortens `name` to at most `max` bytes.
///
/// Names that fit are returned unchanged. Longer names keep a prefix and get
/// an underscore and a hex digest of the full name appended, so the result
/// is stable across runs and distinct names stay distinct with high
/// probability.
#[must_use]
pub fn shorten(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    let digest = Sha256::digest(name.as_bytes());
    let hash: String = digest[..HASH_LEN / 2]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    if max <= HASH_LEN + 1 {
        return hash[..max.min(HASH_LEN)].to_string();
    }

    let mut cut = max - HASH_LEN - 1;
    while !name.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}_{}", &name[..cut], hash)
}

/// Quotes `name` with `quote`, doubling embedded quote characters.
#[must_use]
pub fn quote_with(quote: char, name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push(quote);
    for c in name.chars() {
        if c == quote {
            out.push(quote);
        }
        out.push(c);
    }
    out.push(quote);
    out
}
