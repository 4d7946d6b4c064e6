//! Paged transaction history for a wallet.
//!
//! Every call acquires a client from the endpoint pool, lists one page of
//! signatures per queried account, fetches those transactions concurrently and
//! derives the next cursor. Pagination rules differ per path:
//!
//! - native: `before` is the oldest listed signature, `has_more` is
//!   `listed == limit` (a full last page still reports more).
//! - token: pages of every token account for the mint are concatenated,
//!   `before` is the last fetched transaction's own signature and `has_more`
//!   compares the concatenated count with the single-page limit.
//! - all tokens: sub-results are merged, sorted newest first by block time,
//!   truncated to `limit` and the cursor is recomputed on the truncated set.

use crate::blockchain::client::{Connector, LedgerClient, SolanaConnector, TokenAccountFilter};
use crate::blockchain::fetcher::Fetcher;
use crate::blockchain::pool::EndpointPool;
use crate::blockchain::processor::{normalize_native, normalize_token, NATIVE_UNIT};
use crate::blockchain::retry::RetryPolicy;
use crate::cache::init_transaction_cache;
use crate::config::HistoryConfig;
use crate::error::Result;
use crate::models::{
    Amount, Pagination, PaginationCursor, RawTransaction, RawTransactionPage, TokenAccount,
    TokenHolding, TransactionPage, TransferRecord, WalletBalances,
};
use crate::tokens::{TokenMapping, TokenType};
use crate::validation::parse_address;
use futures::future::join_all;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{debug, error, info};

fn token_program_id() -> Pubkey {
    Pubkey::new_from_array(spl_token::ID.to_bytes())
}

pub struct HistoryService {
    pool: EndpointPool,
    fetcher: Fetcher,
    tokens: TokenMapping,
}

impl HistoryService {
    pub fn new(config: &HistoryConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            pool: EndpointPool::new(&config.endpoints, connector),
            fetcher: Fetcher::new(RetryPolicy::from(&config.retry), init_transaction_cache(config)),
            tokens: TokenMapping::default(),
        }
    }

    /// Service backed by real Solana RPC endpoints.
    pub fn solana(config: &HistoryConfig) -> Self {
        Self::new(config, Arc::new(SolanaConnector::new(config)))
    }

    pub fn with_token_mapping(mut self, tokens: TokenMapping) -> Self {
        self.tokens = tokens;
        self
    }

    /// One page of raw transactions for `address` and `token_type`.
    ///
    /// The address and the token label are validated before any RPC call.
    pub async fn get_transactions(
        &self,
        address: &str,
        token_type: &str,
        network: &str,
        cursor: &PaginationCursor,
    ) -> Result<RawTransactionPage> {
        let owner = parse_address(address)?;
        let token = self.tokens.resolve(token_type)?;

        info!(
            "Fetching {} transactions for {} on {} (limit {}, before {:?})",
            token.label(),
            owner,
            network,
            cursor.limit(),
            cursor.before()
        );
        self.page_for(&owner, &token, network, cursor).await
    }

    /// Same page as [`get_transactions`](Self::get_transactions), normalized.
    /// Entries that cannot be normalized are dropped; pagination is unchanged.
    pub async fn get_transfers(
        &self,
        address: &str,
        token_type: &str,
        network: &str,
        cursor: &PaginationCursor,
    ) -> Result<TransactionPage<TransferRecord>> {
        let owner = parse_address(address)?;
        let token = self.tokens.resolve(token_type)?;

        let page = self.page_for(&owner, &token, network, cursor).await?;
        let transfers = page
            .transactions
            .iter()
            .flatten()
            .filter_map(|tx| match &token {
                TokenType::Native => normalize_native(tx),
                TokenType::Token { mint, label } => normalize_token(tx, mint, label),
            })
            .collect();

        Ok(TransactionPage {
            transactions: transfers,
            pagination: page.pagination,
        })
    }

    /// Native plus every held token, merged newest first and cut to `limit`.
    /// A token type that fails contributes nothing instead of failing the call.
    pub async fn get_all_token_transactions(
        &self,
        address: &str,
        network: &str,
        cursor: &PaginationCursor,
    ) -> Result<RawTransactionPage> {
        let owner = parse_address(address)?;

        let client = self.pool.acquire(network).await?;
        let held = self
            .fetcher
            .token_accounts(&*client, &owner, TokenAccountFilter::ProgramId(token_program_id()))
            .await?;

        let mut token_types = vec![TokenType::Native];
        token_types.extend(self.held_token_types(&held));
        debug!(
            "Aggregating {} token types for {}: {:?}",
            token_types.len(),
            owner,
            token_types.iter().map(TokenType::label).collect::<Vec<_>>()
        );

        let owner_ref = &owner;
        let sub_pages = join_all(token_types.iter().map(|token| async move {
            match self.page_for(owner_ref, token, network, cursor).await {
                Ok(page) => page.transactions,
                Err(e) => {
                    error!(
                        "Failed to fetch {} transactions for {}: {}",
                        token.label(),
                        owner_ref,
                        e
                    );
                    Vec::new()
                }
            }
        }))
        .await;

        let mut combined: Vec<Option<RawTransaction>> = sub_pages.into_iter().flatten().collect();
        combined.sort_by_key(|tx| Reverse(block_time_or_epoch(tx)));
        combined.truncate(cursor.limit());

        let pagination = Pagination {
            before: last_fetched_signature(&combined),
            has_more: combined.len() == cursor.limit(),
        };
        Ok(TransactionPage {
            transactions: combined,
            pagination,
        })
    }

    /// Native balance and positive token holdings of `address`.
    pub async fn get_balances(&self, address: &str, network: &str) -> Result<WalletBalances> {
        let owner = parse_address(address)?;
        let client = self.pool.acquire(network).await?;

        let lamports = self.fetcher.balance(&*client, &owner).await?;
        let accounts = self
            .fetcher
            .token_accounts(&*client, &owner, TokenAccountFilter::ProgramId(token_program_id()))
            .await?;

        let mut tokens: Vec<TokenHolding> = Vec::new();
        for account in accounts.iter().filter(|a| a.amount > 0) {
            match tokens.iter_mut().find(|h| h.mint == account.mint) {
                Some(holding) => {
                    holding.amount += account.ui_amount;
                    holding.accounts += 1;
                }
                None => tokens.push(TokenHolding {
                    mint: account.mint,
                    token_type: self.label_for(&account.mint),
                    amount: account.ui_amount,
                    accounts: 1,
                }),
            }
        }

        Ok(WalletBalances {
            address: owner,
            native: Amount {
                value: lamports as f64 / LAMPORTS_PER_SOL as f64,
                unit: NATIVE_UNIT.to_string(),
            },
            tokens,
        })
    }

    async fn page_for(
        &self,
        owner: &Pubkey,
        token: &TokenType,
        network: &str,
        cursor: &PaginationCursor,
    ) -> Result<RawTransactionPage> {
        match token {
            TokenType::Native => self.native_page(owner, network, cursor).await,
            TokenType::Token { mint, .. } => self.token_page(owner, mint, network, cursor).await,
        }
    }

    async fn native_page(
        &self,
        owner: &Pubkey,
        network: &str,
        cursor: &PaginationCursor,
    ) -> Result<RawTransactionPage> {
        let client = self.pool.acquire(network).await?;
        let signatures = self.fetcher.list_signatures(&*client, owner, cursor).await?;
        let transactions = self.fetcher.fetch_page(&*client, &signatures).await?;

        let pagination = Pagination {
            before: signatures.last().map(|s| s.signature.clone()),
            has_more: signatures.len() == cursor.limit(),
        };
        Ok(TransactionPage {
            transactions,
            pagination,
        })
    }

    async fn token_page(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
        network: &str,
        cursor: &PaginationCursor,
    ) -> Result<RawTransactionPage> {
        let client = self.pool.acquire(network).await?;
        let accounts = self
            .fetcher
            .token_accounts(&*client, owner, TokenAccountFilter::Mint(*mint))
            .await?;
        debug!("{} owns {} token accounts for mint {}", owner, accounts.len(), mint);

        let mut transactions = Vec::new();
        for account in &accounts {
            transactions.extend(self.account_page(&*client, account, cursor).await?);
        }

        let pagination = Pagination {
            before: last_fetched_signature(&transactions),
            has_more: transactions.len() == cursor.limit(),
        };
        Ok(TransactionPage {
            transactions,
            pagination,
        })
    }

    async fn account_page(
        &self,
        client: &dyn LedgerClient,
        account: &TokenAccount,
        cursor: &PaginationCursor,
    ) -> Result<Vec<Option<RawTransaction>>> {
        let signatures = self
            .fetcher
            .list_signatures(client, &account.address, cursor)
            .await?;
        self.fetcher.fetch_page(client, &signatures).await
    }

    /// Distinct mints with a positive balance, in the order they were listed.
    fn held_token_types(&self, accounts: &[TokenAccount]) -> Vec<TokenType> {
        let mut seen: Vec<Pubkey> = Vec::new();
        for account in accounts.iter().filter(|a| a.amount > 0) {
            if !seen.contains(&account.mint) {
                seen.push(account.mint);
            }
        }
        seen.into_iter()
            .map(|mint| TokenType::Token {
                mint,
                label: self.label_for(&mint),
            })
            .collect()
    }

    fn label_for(&self, mint: &Pubkey) -> String {
        self.tokens
            .label_for(mint)
            .map(str::to_string)
            .unwrap_or_else(|| mint.to_string())
    }
}

fn block_time_or_epoch(tx: &Option<RawTransaction>) -> i64 {
    tx.as_ref().and_then(|t| t.block_time).unwrap_or(0)
}

fn last_fetched_signature(transactions: &[Option<RawTransaction>]) -> Option<String> {
    transactions
        .last()
        .and_then(|tx| tx.as_ref())
        .and_then(|tx| tx.signature())
        .map(str::to_string)
}
