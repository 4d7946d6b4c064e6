pub mod blockchain;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod telemetry;
pub mod tokens;
pub mod validation;

#[cfg(test)]
pub mod tests;

// Re-export specific items for convenience
pub use blockchain::{normalize_native, normalize_token, Connector, EndpointPool, LedgerClient};
pub use config::{Endpoint, EndpointConfig, HistoryConfig, RetryConfig, DEFAULT_NETWORK};
pub use error::HistoryError;
pub use models::{
    Pagination, PaginationCursor, RawTransaction, RawTransactionPage, TransactionPage,
    TransferRecord,
};
pub use service::HistoryService;
pub use tokens::{TokenMapping, TokenType};
pub use validation::parse_address;
