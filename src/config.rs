use crate::error::{HistoryError, Result};
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

pub const DEFAULT_NETWORK: &str = "mainnet-beta";

const MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";
const TESTNET_RPC_URL: &str = "https://api.testnet.solana.com";

/// A single RPC endpoint. `weight` is carried for forward compatibility;
/// selection is plain round-robin and ignores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            weight: default_weight(),
        }
    }

    pub fn weighted(url: impl Into<String>, weight: u32) -> Self {
        Self {
            url: url.into(),
            weight,
        }
    }
}

/// Ordered, non-empty endpoint lists per named network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    networks: HashMap<String, Vec<Endpoint>>,
}

impl EndpointConfig {
    pub fn new(networks: HashMap<String, Vec<Endpoint>>) -> Result<Self> {
        for (network, endpoints) in &networks {
            if endpoints.is_empty() {
                return Err(HistoryError::Config(format!(
                    "network {} has no endpoints",
                    network
                )));
            }
        }
        Ok(Self { networks })
    }

    /// Add or replace the endpoint list of one network.
    pub fn with_network(mut self, network: &str, endpoints: Vec<Endpoint>) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(HistoryError::Config(format!(
                "network {} has no endpoints",
                network
            )));
        }
        self.networks.insert(network.to_string(), endpoints);
        Ok(self)
    }

    pub fn endpoints(&self, network: &str) -> Option<&[Endpoint]> {
        self.networks.get(network).map(|e| e.as_slice())
    }

    pub fn networks(&self) -> impl Iterator<Item = (&String, &Vec<Endpoint>)> {
        self.networks.iter()
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        let mut networks = HashMap::new();
        networks.insert(DEFAULT_NETWORK.to_string(), vec![Endpoint::new(MAINNET_RPC_URL)]);
        networks.insert("devnet".to_string(), vec![Endpoint::new(DEVNET_RPC_URL)]);
        networks.insert("testnet".to_string(), vec![Endpoint::new(TESTNET_RPC_URL)]);
        Self { networks }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// When false every RPC call is issued exactly once.
    pub enabled: bool,
    /// Total tries, including the first one.
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub endpoints: EndpointConfig,
    pub retry: RetryConfig,
    pub commitment_level: String,
    pub rpc_timeout: Duration,
    pub rpc_rate_limit: Option<u32>,
    pub cache_ttl: Duration,
    pub cache_max_capacity: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            endpoints: EndpointConfig::default(),
            retry: RetryConfig::default(),
            commitment_level: "confirmed".to_string(),
            rpc_timeout: Duration::from_secs(30),
            rpc_rate_limit: None,
            cache_ttl: Duration::from_secs(60),
            cache_max_capacity: 1000,
        }
    }
}

impl HistoryConfig {
    /// Build a config from the process environment (and `.env`), falling back
    /// to the defaults for anything missing or unparsable.
    pub fn from_env() -> Self {
        dotenv().ok();

        let defaults = Self::default();
        let mut endpoints = defaults.endpoints.clone();

        for (var, network) in [
            ("SOLANA_RPC_URL", DEFAULT_NETWORK),
            ("SOLANA_DEVNET_RPC_URL", "devnet"),
            ("SOLANA_TESTNET_RPC_URL", "testnet"),
        ] {
            if let Ok(raw) = env::var(var) {
                let urls = parse_url_list(&raw);
                if let Ok(updated) = endpoints.clone().with_network(network, urls) {
                    endpoints = updated;
                }
            }
        }

        let retry = RetryConfig {
            enabled: env::var("RPC_RETRY_ENABLED")
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(defaults.retry.enabled),
            max_attempts: env::var("RPC_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.retry.max_attempts),
            base_delay: env::var("RPC_RETRY_BASE_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.base_delay),
        };

        let commitment_level = env::var("SOLANA_COMMITMENT_LEVEL")
            .unwrap_or_else(|_| defaults.commitment_level.clone());
        let rpc_timeout = env::var("RPC_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.rpc_timeout);
        let rpc_rate_limit = env::var("RPC_RATE_LIMIT")
            .map(|v| v.parse().ok())
            .unwrap_or(None);
        let cache_ttl = env::var("CACHE_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);
        let cache_max_capacity = env::var("CACHE_MAX_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.cache_max_capacity);

        Self {
            endpoints,
            retry,
            commitment_level,
            rpc_timeout,
            rpc_rate_limit,
            cache_ttl,
            cache_max_capacity,
        }
    }
}

fn parse_url_list(raw: &str) -> Vec<Endpoint> {
    raw.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(Endpoint::new)
        .collect()
}
