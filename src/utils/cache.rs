//! In-Memory Assessment Cache
//!
//! Thread-safe caching layer for normalized guard assessments, keyed by
//! safe-tx hash. Backed by DashMap for concurrent access without lock
//! contention.
//!
//! Features:
//! - TTL-based expiration (5 minutes default)
//! - Key normalization (lowercase)
//! - Cache HIT/MISS logging
//! - Hit/miss counters for monitoring

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::core::normalize::NormalizedAssessment;

/// Default TTL: 5 minutes
const DEFAULT_TTL_SECS: u64 = 300;

/// Cache entry with timestamp for TTL validation
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub assessment: NormalizedAssessment,
    pub created_at: Instant,
    pub ttl_secs: u64,
}

impl CacheEntry {
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > Duration::from_secs(self.ttl_secs)
    }

    pub fn remaining_ttl(&self) -> u64 {
        let elapsed = self.created_at.elapsed().as_secs();
        self.ttl_secs.saturating_sub(elapsed)
    }
}

/// Shared assessment cache, cheap to clone
#[derive(Clone)]
pub struct AssessmentCache {
    /// Internal storage: lowercase safe-tx hash -> CacheEntry
    store: Arc<DashMap<String, CacheEntry>>,
    ttl_secs: u64,
    hits: Arc<std::sync::atomic::AtomicU64>,
    misses: Arc<std::sync::atomic::AtomicU64>,
}

impl Default for AssessmentCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AssessmentCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL_SECS)
    }

    pub fn with_ttl(ttl_secs: u64) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            ttl_secs,
            hits: Arc::new(std::sync::atomic::AtomicU64::new(0)),
            misses: Arc::new(std::sync::atomic::AtomicU64::new(0)),
        }
    }

    #[inline]
    fn normalize_key(hash: &str) -> String {
        hash.to_lowercase()
    }

    /// Get a cached assessment with TTL validation.
    /// Returns None on miss or when the entry expired.
    pub fn get(&self, hash: &str) -> Option<NormalizedAssessment> {
        let key = Self::normalize_key(hash);

        if let Some(entry) = self.store.get(&key) {
            if entry.is_expired() {
                drop(entry); // Release read lock before removing
                self.store.remove(&key);
                self.misses
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                debug!("📭 CACHE MISS (expired): {}", key);
                None
            } else {
                self.hits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                debug!(
                    "✅ CACHE HIT: {} (TTL: {}s remaining)",
                    key,
                    entry.remaining_ttl()
                );
                Some(entry.assessment.clone())
            }
        } else {
            self.misses
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            debug!("📭 CACHE MISS: {}", key);
            None
        }
    }

    pub fn set(&self, hash: &str, assessment: NormalizedAssessment) {
        let key = Self::normalize_key(hash);
        let entry = CacheEntry {
            assessment,
            created_at: Instant::now(),
            ttl_secs: self.ttl_secs,
        };
        self.store.insert(key.clone(), entry);
        debug!("💾 CACHE SET: {} (TTL: {}s)", key, self.ttl_secs);
    }

    /// Drop every expired entry
    #[allow(dead_code)]
    pub fn cleanup_expired(&self) -> usize {
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.is_expired());
        let removed = before - self.store.len();
        if removed > 0 {
            info!("🧹 CACHE CLEANUP: {} expired entries removed", removed);
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(std::sync::atomic::Ordering::Relaxed);
        let misses = self.misses.load(std::sync::atomic::Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            entries: self.store.len(),
            hits,
            misses,
            hit_rate,
            ttl_secs: self.ttl_secs,
        }
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub ttl_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment() -> NormalizedAssessment {
        NormalizedAssessment {
            assessment_id: Some("a-1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_cache_set_get() {
        let cache = AssessmentCache::new();
        let hash = "0xAbC123";

        cache.set(hash, assessment());
        assert!(cache.get(hash).is_some());
    }

    #[test]
    fn test_key_normalization() {
        let cache = AssessmentCache::new();
        cache.set("0xDEADBEEF", assessment());
        assert!(cache.get("0xdeadbeef").is_some());
    }

    #[test]
    fn test_cache_miss() {
        let cache = AssessmentCache::new();
        assert!(cache.get("0x1234").is_none());
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = AssessmentCache::with_ttl(0);
        cache.set("0xabc", assessment());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("0xabc").is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_cache_stats() {
        let cache = AssessmentCache::new();
        cache.set("0xabc", assessment());
        cache.get("0xabc"); // HIT
        cache.get("0xmissing"); // MISS

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }
}
