//! Shared utilities

pub mod addresses;
pub mod cache;
pub mod origin;

pub use addresses::{hamming_distance, is_valid_safe_tx_hash, normalize_address, same_address};
pub use cache::{AssessmentCache, CacheStats};
pub use origin::parse_origin;
