use thiserror::Error;
use crate::validation::ValidationError;

#[derive(Error, Debug, Clone)]
pub enum HistoryError {
    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    #[error("Unsupported token type: {0}")]
    UnsupportedTokenType(String),

    #[error("Rate limited by RPC endpoint: {0}")]
    RateLimited(String),

    #[error("Max retries reached after {attempts} attempts")]
    RetriesExhausted { attempts: usize },

    #[error("RPC request failed: {0}")]
    TransactionFetch(String),

    #[error("Malformed transaction record: {0}")]
    MalformedRecord(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid pagination cursor: {0}")]
    InvalidCursor(String),

    #[error("No endpoints configured for network: {0}")]
    UnknownNetwork(String),

    #[error("Invalid endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl HistoryError {
    /// True for the HTTP 429-equivalent signal the retry wrapper reacts to.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, HistoryError::RateLimited(_))
    }
}

impl From<ValidationError> for HistoryError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidSolanaAddress(addr) => HistoryError::InvalidAddress(addr),
            ValidationError::MissingParameter(param) => {
                HistoryError::InvalidAddress(format!("missing {}", param))
            }
            ValidationError::InvalidLimit(limit) => {
                HistoryError::InvalidCursor(format!("limit must be positive, got {}", limit))
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, HistoryError>;
