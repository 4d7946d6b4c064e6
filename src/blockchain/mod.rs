pub mod client;
pub mod fetcher;
pub mod models;
pub mod pool;
pub mod processor;
pub mod retry;

// Re-exports for convenience
pub use client::{Connector, LedgerClient, SolanaClient, SolanaConnector, TokenAccountFilter};
pub use fetcher::Fetcher;
pub use pool::{EndpointPool, PooledClient};
pub use processor::{normalize_native, normalize_token};
pub use retry::{with_retry, RetryPolicy};
