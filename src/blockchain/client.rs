use crate::blockchain::models::{parse_token_account, to_raw_transaction};
use crate::config::HistoryConfig;
use crate::error::{HistoryError, Result};
use crate::models::{RawTransaction, SignatureRecord, TokenAccount};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::StatusCode;
use serde_json::json;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_client::rpc_request::{RpcRequest, TokenAccountsFilter};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_transaction_status::{EncodedConfirmedTransactionWithStatusMeta, UiTransactionEncoding};
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAccountFilter {
    Mint(Pubkey),
    ProgramId(Pubkey),
}

/// The ledger RPC capability the history core is written against.
///
/// Implementations classify failures: a rate-limit signal must come back as
/// [`HistoryError::RateLimited`], anything else as
/// [`HistoryError::TransactionFetch`].
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Signatures touching `account`, newest first, strictly older than `before`.
    async fn get_signatures_for_address(
        &self,
        account: &Pubkey,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Vec<SignatureRecord>>;

    /// `Ok(None)` when the transaction is unknown or pruned.
    async fn get_transaction(
        &self,
        signature: &str,
        max_supported_version: Option<u8>,
    ) -> Result<Option<RawTransaction>>;

    /// Native balance in lamports.
    async fn get_balance(&self, account: &Pubkey) -> Result<u64>;

    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        filter: TokenAccountFilter,
    ) -> Result<Vec<TokenAccount>>;
}

/// Builds a ledger client for one endpoint URL.
pub trait Connector: Send + Sync {
    fn connect(&self, url: &str) -> Result<Arc<dyn LedgerClient>>;
}

pub struct SolanaConnector {
    commitment: CommitmentConfig,
    timeout: Duration,
    rate_limit: Option<NonZeroU32>,
}

impl SolanaConnector {
    pub fn new(config: &HistoryConfig) -> Self {
        // Use commitment level from config or default to "confirmed"
        let commitment = match config.commitment_level.as_str() {
            "processed" => CommitmentConfig::processed(),
            "confirmed" => CommitmentConfig::confirmed(),
            "finalized" => CommitmentConfig::finalized(),
            _ => CommitmentConfig::confirmed(),
        };

        Self {
            commitment,
            timeout: config.rpc_timeout,
            rate_limit: config.rpc_rate_limit.and_then(NonZeroU32::new),
        }
    }
}

impl Connector for SolanaConnector {
    fn connect(&self, url: &str) -> Result<Arc<dyn LedgerClient>> {
        let parsed = Url::parse(url).map_err(|e| HistoryError::InvalidEndpoint {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(HistoryError::InvalidEndpoint {
                url: url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        Ok(Arc::new(SolanaClient::new(
            url,
            self.commitment,
            self.timeout,
            self.rate_limit,
        )))
    }
}

pub struct SolanaClient {
    rpc_client: RpcClient,
    commitment: CommitmentConfig,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl SolanaClient {
    pub fn new(
        rpc_url: &str,
        commitment: CommitmentConfig,
        timeout: Duration,
        rate_limit: Option<NonZeroU32>,
    ) -> Self {
        info!(
            "Initializing Solana client with RPC endpoint: {}, commitment: {:?}",
            rpc_url, commitment
        );

        let rpc_client =
            RpcClient::new_with_timeout_and_commitment(rpc_url.to_string(), timeout, commitment);
        let limiter = rate_limit.map(|per_second| RateLimiter::direct(Quota::per_second(per_second)));

        Self {
            rpc_client,
            commitment,
            limiter,
        }
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[async_trait]
impl LedgerClient for SolanaClient {
    async fn get_signatures_for_address(
        &self,
        account: &Pubkey,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Vec<SignatureRecord>> {
        let before_sig = match before {
            Some(sig) => Some(
                Signature::from_str(sig)
                    .map_err(|_| HistoryError::InvalidSignature(sig.to_string()))?,
            ),
            None => None,
        };

        self.throttle().await;
        let signatures = self
            .rpc_client
            .get_signatures_for_address_with_config(
                account,
                GetConfirmedSignaturesForAddress2Config {
                    before: before_sig,
                    until: None,
                    limit: Some(limit),
                    commitment: Some(self.commitment),
                },
            )
            .await
            .map_err(classify_error)?;

        Ok(signatures
            .into_iter()
            .map(|status| SignatureRecord {
                signature: status.signature,
                slot: status.slot,
                block_time: status.block_time,
                err: status.err.map(|e| format!("{:?}", e)),
            })
            .collect())
    }

    async fn get_transaction(
        &self,
        signature: &str,
        max_supported_version: Option<u8>,
    ) -> Result<Option<RawTransaction>> {
        Signature::from_str(signature)
            .map_err(|_| HistoryError::InvalidSignature(signature.to_string()))?;

        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Json),
            commitment: Some(self.commitment),
            max_supported_transaction_version: max_supported_version,
        };

        self.throttle().await;
        // The node answers `null` for unknown or pruned transactions
        let tx: Option<EncodedConfirmedTransactionWithStatusMeta> = self
            .rpc_client
            .send(RpcRequest::GetTransaction, json!([signature, config]))
            .await
            .map_err(classify_error)?;

        Ok(tx.map(|tx| to_raw_transaction(signature, tx)))
    }

    async fn get_balance(&self, account: &Pubkey) -> Result<u64> {
        self.throttle().await;
        let response = self
            .rpc_client
            .get_balance_with_commitment(account, self.commitment)
            .await
            .map_err(classify_error)?;
        Ok(response.value)
    }

    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        filter: TokenAccountFilter,
    ) -> Result<Vec<TokenAccount>> {
        let filter = match filter {
            TokenAccountFilter::Mint(mint) => TokenAccountsFilter::Mint(mint),
            TokenAccountFilter::ProgramId(program_id) => TokenAccountsFilter::ProgramId(program_id),
        };

        self.throttle().await;
        let accounts = self
            .rpc_client
            .get_token_accounts_by_owner(owner, filter)
            .await
            .map_err(classify_error)?;

        let mut parsed = Vec::with_capacity(accounts.len());
        for keyed in accounts {
            let data = match serde_json::to_value(&keyed.account.data) {
                Ok(data) => data,
                Err(e) => {
                    warn!("Unreadable token account data for {}: {}", keyed.pubkey, e);
                    continue;
                }
            };
            match parse_token_account(&keyed.pubkey, &data) {
                Some(account) => parsed.push(account),
                None => warn!("Skipping unparsable token account {}", keyed.pubkey),
            }
        }
        Ok(parsed)
    }
}

fn classify_error(err: ClientError) -> HistoryError {
    if is_rate_limit_error(&err) {
        HistoryError::RateLimited(err.to_string())
    } else {
        HistoryError::TransactionFetch(err.to_string())
    }
}

fn is_rate_limit_error(err: &ClientError) -> bool {
    if let ClientErrorKind::Reqwest(e) = err.kind() {
        if e.status().map(|s| s.as_u16()) == Some(StatusCode::TOO_MANY_REQUESTS.as_u16()) {
            return true;
        }
    }
    is_rate_limit_message(&err.to_string())
}

fn is_rate_limit_message(message: &str) -> bool {
    message.contains("429") || message.contains("Too Many Requests")
}
