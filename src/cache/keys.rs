//! Cache key generation and management

use std::fmt;

/// A structured cache key that can be converted to a string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Key for a fetched transaction
    Transaction { signature: String },
    /// Key for an RPC client bound to one endpoint of one network
    Client { network: String, url: String },
}

impl CacheKey {
    /// Create a new transaction key
    pub fn transaction(signature: &str) -> Self {
        Self::Transaction {
            signature: signature.to_string(),
        }
    }

    /// Create a new endpoint client key
    pub fn client(network: &str, url: &str) -> Self {
        Self::Client {
            network: network.to_string(),
            url: url.to_string(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transaction { signature } => write!(f, "tx:{}", signature),
            Self::Client { network, url } => write!(f, "client:{}:{}", network, url),
        }
    }
}
