use crate::blockchain::client::{LedgerClient, TokenAccountFilter};
use crate::blockchain::retry::{with_retry, RetryPolicy};
use crate::cache::TransactionCacheManager;
use crate::error::Result;
use crate::models::{PaginationCursor, RawTransaction, SignatureRecord, TokenAccount};
use futures::future::try_join_all;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

/// Highest message version requested from the ledger. Versioned messages are
/// fetched but only legacy ones can be normalized.
pub const MAX_SUPPORTED_TRANSACTION_VERSION: u8 = 0;

/// RPC reads used by the aggregators, each wrapped in its own retry budget.
#[derive(Clone)]
pub struct Fetcher {
    retry: RetryPolicy,
    cache: Option<TransactionCacheManager>,
}

impl Fetcher {
    pub fn new(retry: RetryPolicy, cache: Option<TransactionCacheManager>) -> Self {
        Self { retry, cache }
    }

    /// One page of signatures for `account`, newest first, as the ledger
    /// orders them.
    pub async fn list_signatures(
        &self,
        client: &dyn LedgerClient,
        account: &Pubkey,
        cursor: &PaginationCursor,
    ) -> Result<Vec<SignatureRecord>> {
        let limit = cursor.limit();
        let before = cursor.before();

        let signatures = with_retry(&self.retry, "getSignaturesForAddress", || {
            client.get_signatures_for_address(account, limit, before)
        })
        .await?;

        debug!(
            "Listed {} signatures for {} (limit {}, before {:?})",
            signatures.len(),
            account,
            limit,
            before
        );
        Ok(signatures)
    }

    /// `Ok(None)` means not found or pruned.
    pub async fn fetch_transaction(
        &self,
        client: &dyn LedgerClient,
        signature: &str,
    ) -> Result<Option<RawTransaction>> {
        if let Some(cache) = &self.cache {
            if let Some(tx) = cache.get(signature).await {
                return Ok(Some(tx));
            }
        }

        let tx = with_retry(&self.retry, "getTransaction", || {
            client.get_transaction(signature, Some(MAX_SUPPORTED_TRANSACTION_VERSION))
        })
        .await?;

        match (&self.cache, &tx) {
            (Some(cache), Some(found)) => cache.insert(signature, found.clone()).await,
            (_, None) => debug!("Transaction {} not found", signature),
            _ => {}
        }
        Ok(tx)
    }

    /// Fetch every signature of a page concurrently, preserving page order.
    pub async fn fetch_page(
        &self,
        client: &dyn LedgerClient,
        signatures: &[SignatureRecord],
    ) -> Result<Vec<Option<RawTransaction>>> {
        try_join_all(
            signatures
                .iter()
                .map(|record| self.fetch_transaction(client, &record.signature)),
        )
        .await
    }

    pub async fn token_accounts(
        &self,
        client: &dyn LedgerClient,
        owner: &Pubkey,
        filter: TokenAccountFilter,
    ) -> Result<Vec<TokenAccount>> {
        with_retry(&self.retry, "getTokenAccountsByOwner", || {
            client.get_token_accounts_by_owner(owner, filter)
        })
        .await
    }

    pub async fn balance(&self, client: &dyn LedgerClient, account: &Pubkey) -> Result<u64> {
        with_retry(&self.retry, "getBalance", || client.get_balance(account)).await
    }
}
