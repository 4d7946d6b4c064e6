pub mod keys;
pub mod transaction;

pub use keys::CacheKey;
pub use transaction::TransactionCacheManager;

use crate::config::HistoryConfig;

/// Build the transaction cache, or `None` when it is disabled (capacity 0).
pub fn init_transaction_cache(config: &HistoryConfig) -> Option<TransactionCacheManager> {
    if config.cache_max_capacity == 0 {
        return None;
    }
    Some(TransactionCacheManager::new(
        config.cache_max_capacity,
        config.cache_ttl,
    ))
}
