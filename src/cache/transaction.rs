//! Transaction cache implementation using Moka

use super::keys::CacheKey;
use crate::models::RawTransaction;
use moka::future::Cache;
use std::time::Duration;
use tracing::debug;

/// Caches fetched transactions by signature. Only found transactions are
/// stored; a missing transaction may still land later.
#[derive(Clone)]
pub struct TransactionCacheManager {
    cache: Cache<CacheKey, RawTransaction>,
}

impl TransactionCacheManager {
    /// Create a new transaction cache manager
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    /// Get a cached transaction
    pub async fn get(&self, signature: &str) -> Option<RawTransaction> {
        let key = CacheKey::transaction(signature);
        let result = self.cache.get(&key).await;
        if result.is_some() {
            debug!("Cache hit for key: {}", key);
        } else {
            debug!("Cache miss for key: {}", key);
        }
        result
    }

    /// Store a fetched transaction
    pub async fn insert(&self, signature: &str, transaction: RawTransaction) {
        self.cache
            .insert(CacheKey::transaction(signature), transaction)
            .await;
    }
}
