//! Address-poisoning lookalike detection
//!
//! An attacker crafts an address whose prefix and suffix match a trusted
//! one, betting the user only eyeballs the ends. Detection buckets
//! addresses by their prefix+suffix fingerprint, then filters each bucket
//! by middle-section Hamming distance so unrelated coincidences drop out.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::SimilarityConfig;
use crate::utils::addresses::{hamming_distance, normalize_address};

/// A set of mutually similar addresses sharing one bucket fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarityGroup {
    /// `lowercase(prefix) + "_" + lowercase(suffix)`
    pub bucket_key: String,
    pub addresses: Vec<String>,
}

/// Detection output with O(1) per-address lookups
#[derive(Debug, Clone, Default)]
pub struct SimilarityReport {
    groups: Vec<SimilarityGroup>,
    index: HashMap<String, usize>,
}

impl SimilarityReport {
    pub fn groups(&self) -> &[SimilarityGroup] {
        &self.groups
    }

    /// Whether this address appears in any similarity group
    pub fn is_flagged(&self, address: &str) -> bool {
        self.index.contains_key(&normalize_address(address))
    }

    /// The group an address belongs to, if any
    pub fn group_for(&self, address: &str) -> Option<&SimilarityGroup> {
        self.index
            .get(&normalize_address(address))
            .map(|position| &self.groups[*position])
    }
}

/// Screen a set of known addresses for poisoning lookalikes.
///
/// A group requires at least two members after edit-distance filtering;
/// empty and singleton inputs always yield zero groups.
pub fn detect<S: AsRef<str>>(addresses: &[S], config: &SimilarityConfig) -> SimilarityReport {
    let span_len = config.prefix_len + config.suffix_len;

    // Bucket by prefix+suffix fingerprint before any pairwise work.
    let mut buckets: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for address in addresses {
        let normalized = normalize_address(address.as_ref());
        let body = normalized.strip_prefix("0x").unwrap_or(&normalized);
        // Slicing below is byte-indexed, so anything that is not plain
        // hex (including multi-byte characters) is skipped, not risked.
        if body.len() < span_len || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
            continue;
        }
        let key = format!(
            "{}_{}",
            &body[..config.prefix_len],
            &body[body.len() - config.suffix_len..]
        );
        buckets.entry(key).or_default().push(normalized);
    }

    let mut groups: Vec<SimilarityGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (bucket_key, members) in buckets {
        if members.len() < 2 {
            continue;
        }

        let middles: Vec<&str> = members
            .iter()
            .map(|address| {
                let body = address.strip_prefix("0x").unwrap_or(address);
                &body[config.prefix_len..body.len() - config.suffix_len]
            })
            .collect();

        // An address survives if it sits within threshold of at least
        // one other bucket member.
        let mut survivors: HashSet<usize> = HashSet::new();
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                if hamming_distance(middles[i], middles[j]) <= config.hamming_threshold {
                    survivors.insert(i);
                    survivors.insert(j);
                }
            }
        }

        let surviving: Vec<String> = members
            .iter()
            .enumerate()
            .filter(|(i, _)| survivors.contains(i))
            .map(|(_, address)| address.clone())
            .collect();

        if surviving.len() < 2 {
            continue;
        }

        let position = groups.len();
        for address in &surviving {
            index.insert(address.clone(), position);
        }
        groups.push(SimilarityGroup {
            bucket_key,
            addresses: surviving,
        });
    }

    SimilarityReport { groups, index }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(prefix_len: usize, suffix_len: usize, hamming_threshold: usize) -> SimilarityConfig {
        SimilarityConfig {
            prefix_len,
            suffix_len,
            hamming_threshold,
        }
    }

    #[test]
    fn test_lookalike_pair_is_grouped() {
        let addresses = vec![
            "0x1234567890abcdef1234567890abcdef12345678".to_string(),
            "0x123456eeeeeeeeee1234567890abcdef12345678".to_string(),
        ];
        // Middle sections differ in 9 positions.
        let report = detect(&addresses, &config(6, 4, 10));

        assert_eq!(report.groups().len(), 1);
        assert!(report.is_flagged(&addresses[0]));
        assert!(report.is_flagged(&addresses[1]));

        let group = report.group_for(&addresses[0]).unwrap();
        assert_eq!(group.bucket_key, "123456_5678");
        assert_eq!(group.addresses.len(), 2);
    }

    #[test]
    fn test_beyond_threshold_is_excluded() {
        let near = "0x1234567890abcdef1234567890abcdef12345678".to_string();
        let close = "0x123456e890abcdef1234567890abcdef12345678".to_string();
        // Same fingerprint but a completely different middle.
        let far = "0x123456ffffffffffffffffffffffffff12345678".to_string();

        let report = detect(&[near.clone(), close.clone(), far.clone()], &config(6, 4, 4));

        assert_eq!(report.groups().len(), 1);
        assert!(report.is_flagged(&near));
        assert!(report.is_flagged(&close));
        assert!(!report.is_flagged(&far));
        assert_eq!(report.group_for(&near).unwrap().addresses.len(), 2);
    }

    #[test]
    fn test_case_insensitive_matching() {
        let addresses = vec![
            "0x1234567890ABCDEF1234567890ABCDEF12345678".to_string(),
            "0x1234567890abcdef1234567890abcdee12345678".to_string(),
        ];
        let report = detect(&addresses, &config(6, 4, 4));
        assert_eq!(report.groups().len(), 1);
        assert!(report.is_flagged("0x1234567890ABCDEF1234567890ABCDEF12345678"));
    }

    #[test]
    fn test_singleton_bucket_discarded() {
        let addresses = vec![
            "0x1234567890abcdef1234567890abcdef12345678".to_string(),
            "0xffff567890abcdef1234567890abcdef1234ffff".to_string(),
        ];
        let report = detect(&addresses, &config(6, 4, 40));
        assert!(report.groups().is_empty());
        assert!(!report.is_flagged(&addresses[0]));
    }

    #[test]
    fn test_non_hex_input_is_skipped_not_sliced() {
        // The accented byte straddles the prefix slice boundary; the
        // entry must be dropped, never byte-sliced.
        let addresses = vec![
            "0x12345é7890abcdef1234567890abcdef12345678".to_string(),
            "0x1234567890abcdef1234567890abcdef12345678".to_string(),
            "0x123456eeeeeeeeee1234567890abcdef12345678".to_string(),
        ];
        let report = detect(&addresses, &config(6, 4, 10));

        assert!(!report.is_flagged(&addresses[0]));
        // The well-formed pair still groups.
        assert_eq!(report.groups().len(), 1);
        assert!(report.is_flagged(&addresses[1]));
        assert!(report.is_flagged(&addresses[2]));
    }

    #[test]
    fn test_single_and_empty_input_yield_no_groups() {
        let one = vec!["0x1234567890abcdef1234567890abcdef12345678".to_string()];
        assert!(detect(&one, &config(6, 4, 4)).groups().is_empty());

        let none: Vec<String> = Vec::new();
        assert!(detect(&none, &config(6, 4, 4)).groups().is_empty());
    }
}
