use crate::blockchain::client::{Connector, LedgerClient};
use crate::cache::CacheKey;
use crate::config::{Endpoint, EndpointConfig};
use crate::error::{HistoryError, Result};
use moka::future::Cache;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A client handed out by the pool, tagged with the endpoint it talks to.
#[derive(Clone)]
pub struct PooledClient {
    pub url: String,
    client: Arc<dyn LedgerClient>,
}

impl Deref for PooledClient {
    type Target = dyn LedgerClient;

    fn deref(&self) -> &Self::Target {
        self.client.as_ref()
    }
}

struct Rotation {
    endpoints: Vec<Endpoint>,
    next: AtomicUsize,
}

/// Round-robins over each network's endpoints and keeps one client per
/// (network, url) for the lifetime of the pool.
pub struct EndpointPool {
    connector: Arc<dyn Connector>,
    rotations: HashMap<String, Rotation>,
    clients: Cache<CacheKey, Arc<dyn LedgerClient>>,
}

impl EndpointPool {
    pub fn new(config: &EndpointConfig, connector: Arc<dyn Connector>) -> Self {
        let rotations = config
            .networks()
            .map(|(network, endpoints)| {
                (
                    network.clone(),
                    Rotation {
                        endpoints: endpoints.clone(),
                        next: AtomicUsize::new(0),
                    },
                )
            })
            .collect();

        Self {
            connector,
            rotations,
            // no eviction: a client lives as long as the pool
            clients: Cache::builder().build(),
        }
    }

    /// Return the client for the network's current endpoint and advance the
    /// rotation. Construction failures propagate and are not retried.
    pub async fn acquire(&self, network: &str) -> Result<PooledClient> {
        let rotation = self
            .rotations
            .get(network)
            .ok_or_else(|| HistoryError::UnknownNetwork(network.to_string()))?;

        let len = rotation.endpoints.len();
        if len == 0 {
            return Err(HistoryError::UnknownNetwork(network.to_string()));
        }
        let index = match rotation
            .next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| Some((i + 1) % len))
        {
            Ok(previous) | Err(previous) => previous % len,
        };
        let url = rotation.endpoints[index].url.clone();

        let connector = self.connector.clone();
        let connect_url = url.clone();
        let client = self
            .clients
            .try_get_with(CacheKey::client(network, &url), async move {
                connector.connect(&connect_url)
            })
            .await
            .map_err(|e: Arc<HistoryError>| (*e).clone())?;

        debug!("Acquired {} endpoint #{}: {}", network, index, url);
        Ok(PooledClient { url, client })
    }
}
