//! Address and hash helpers
//! Address keys are always compared case-insensitively, so every map key
//! is normalized to lowercase before use.

use alloy_primitives::B256;

/// Normalize an address for use as a map key
#[inline]
pub fn normalize_address(address: &str) -> String {
    address.to_lowercase()
}

/// Case-insensitive address equality
#[inline]
pub fn same_address(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Validate a safe-tx hash: must be a 0x-prefixed 32-byte hex string
pub fn is_valid_safe_tx_hash(hash: &str) -> bool {
    hash.starts_with("0x") && hash.parse::<B256>().is_ok()
}

/// Hamming distance: count of differing character positions.
/// Different-length inputs are maximal mismatch (the longer length),
/// never an error.
pub fn hamming_distance(a: &str, b: &str) -> usize {
    if a.len() != b.len() {
        return a.len().max(b.len());
    }
    a.chars().zip(b.chars()).filter(|(x, y)| x != y).count()
}
