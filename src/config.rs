//! Configuration module for txsentry
//! Handles guard-provider connection settings and detection thresholds

use std::time::Duration;

/// Configuration for the risk analysis engine
#[derive(Debug, Clone)]
pub struct SentinelConfig {
    /// Base URL of the guard provider API
    pub provider_url: String,

    /// Bearer token for the guard provider. Requests are never issued
    /// without one; missing token short-circuits to a precondition error.
    pub api_key: Option<String>,

    /// Timeout for provider calls
    pub request_timeout: Duration,

    /// Assessment cache TTL in seconds
    pub cache_ttl_secs: u64,

    /// Address-similarity detection thresholds
    pub similarity: SimilarityConfig,
}

/// Thresholds for address-poisoning lookalike detection
#[derive(Debug, Clone)]
pub struct SimilarityConfig {
    /// Hex chars of the address prefix used for bucketing
    pub prefix_len: usize,
    /// Hex chars of the address suffix used for bucketing
    pub suffix_len: usize,
    /// Max differing positions in the middle section for a pair to count
    /// as lookalikes
    pub hamming_threshold: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            prefix_len: 4,
            suffix_len: 4,
            hamming_threshold: 4,
        }
    }
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            provider_url: std::env::var("HYPERNATIVE_API_URL")
                .unwrap_or_else(|_| "https://api.hypernative.xyz".to_string()),
            api_key: std::env::var("HYPERNATIVE_API_KEY").ok(),
            request_timeout: Duration::from_secs(10),
            cache_ttl_secs: 300,
            similarity: SimilarityConfig::default(),
        }
    }
}
