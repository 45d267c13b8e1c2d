//! TTL caches for agent results
//!
//! Three named instances share one implementation and differ only in TTL:
//! review (10 min), comparison (5 min), price (3 min). Keys are fingerprints
//! of the agent inputs; all instances are safe for concurrent use.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

pub const REVIEW_CACHE_TTL_SECS: u64 = 600;
pub const COMPARISON_CACHE_TTL_SECS: u64 = 300;
pub const PRICE_CACHE_TTL_SECS: u64 = 180;

const DEFAULT_CAPACITY: u64 = 10_000;

/// TTL cache keyed by input fingerprint
pub struct AgentCache<T> {
    cache: Cache<String, Arc<T>>,
}

impl<T: Send + Sync + 'static> AgentCache<T> {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub fn with_ttl_secs(ttl_secs: u64) -> Self {
        Self::new(DEFAULT_CAPACITY, Duration::from_secs(ttl_secs))
    }

    pub async fn get(&self, key: &str) -> Option<Arc<T>> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: impl Into<String>, value: T) {
        self.cache.insert(key.into(), Arc::new(value)).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache: AgentCache<String> = AgentCache::with_ttl_secs(REVIEW_CACHE_TTL_SECS);
        assert!(cache.get("review_analysis_1").await.is_none());

        cache.insert("review_analysis_1", "cached".to_string()).await;
        let hit = cache.get("review_analysis_1").await.unwrap();
        assert_eq!(*hit, "cached");
    }

    #[tokio::test]
    async fn test_expiry() {
        let cache: AgentCache<u32> = AgentCache::new(16, Duration::from_millis(20));
        cache.insert("k", 1).await;
        assert!(cache.get("k").await.is_some());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache: AgentCache<u32> = AgentCache::with_ttl_secs(60);
        cache.insert("k", 1).await;
        cache.invalidate("k").await;
        assert!(cache.get("k").await.is_none());
    }
}
