//! Scripted ledger and connector doubles with invocation counters.

use crate::blockchain::client::{Connector, LedgerClient, TokenAccountFilter};
use crate::error::{HistoryError, Result};
use crate::models::{
    RawTransaction, SignatureRecord, TokenAccount, TokenBalance, TransactionEnvelope,
    TransactionMessage, TransactionMeta,
};
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const WALLET: &str = "9ii1FEiWSgDzXAbwj2oTmJXzkfCw78mnHwPQv9WQ5iTn";
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

pub fn wallet() -> Pubkey {
    crate::validation::parse_address(WALLET).unwrap()
}

pub fn usdc() -> Pubkey {
    crate::validation::parse_address(USDC_MINT).unwrap()
}

pub fn key(n: u8) -> Pubkey {
    Pubkey::new_from_array([n; 32])
}

pub fn signature_record(signature: &str, block_time: i64) -> SignatureRecord {
    SignatureRecord {
        signature: signature.to_string(),
        slot: block_time as u64,
        block_time: Some(block_time),
        err: None,
    }
}

pub fn legacy_tx(
    signature: &str,
    block_time: Option<i64>,
    keys: &[Pubkey],
    balances: (u64, u64),
    post_token_balances: Vec<TokenBalance>,
) -> RawTransaction {
    RawTransaction {
        slot: block_time.unwrap_or(0) as u64,
        block_time,
        transaction: Some(TransactionEnvelope {
            signatures: vec![signature.to_string()],
            message: TransactionMessage::Legacy {
                account_keys: keys.iter().map(|k| k.to_string()).collect(),
            },
        }),
        meta: Some(TransactionMeta {
            err: None,
            fee: 5000,
            pre_balances: vec![balances.0, 0],
            post_balances: vec![balances.1, 0],
            pre_token_balances: Vec::new(),
            post_token_balances,
        }),
    }
}

pub fn versioned_tx(signature: &str, block_time: Option<i64>) -> RawTransaction {
    let mut tx = legacy_tx(signature, block_time, &[key(1), key(2)], (10, 5), Vec::new());
    if let Some(envelope) = tx.transaction.as_mut() {
        envelope.message = TransactionMessage::Versioned { version: 0 };
    }
    tx
}

pub fn token_balance(mint: &Pubkey, ui_amount: Option<f64>, ui_amount_string: &str) -> TokenBalance {
    TokenBalance {
        account_index: 1,
        mint: mint.to_string(),
        owner: Some(WALLET.to_string()),
        amount: "0".to_string(),
        decimals: 6,
        ui_amount,
        ui_amount_string: ui_amount_string.to_string(),
    }
}

pub fn token_account(address: Pubkey, mint: Pubkey, amount: u64) -> TokenAccount {
    TokenAccount {
        address,
        mint,
        amount,
        decimals: 6,
        ui_amount: amount as f64 / 1_000_000.0,
    }
}

/// In-memory ledger. Signature histories are stored newest first and served
/// with the same `before`/`limit` semantics as a node.
#[derive(Default)]
pub struct SpyLedger {
    histories: Mutex<HashMap<Pubkey, Vec<SignatureRecord>>>,
    transactions: Mutex<HashMap<String, RawTransaction>>,
    token_accounts: Mutex<Vec<TokenAccount>>,
    failing_accounts: Mutex<HashSet<Pubkey>>,
    failing_transactions: Mutex<HashSet<String>>,
    rate_limited_listings: AtomicUsize,
    rate_limited_transactions: AtomicUsize,
    balance: AtomicU64,
    pub signature_calls: AtomicUsize,
    pub transaction_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
    pub token_account_calls: AtomicUsize,
}

impl SpyLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record a transaction touching `account`; later calls are newer.
    pub fn push(&self, account: Pubkey, tx: RawTransaction) {
        let signature = tx
            .signature()
            .map(str::to_string)
            .unwrap_or_default();
        let record = signature_record(&signature, tx.block_time.unwrap_or(0));
        self.histories
            .lock()
            .unwrap()
            .entry(account)
            .or_default()
            .insert(0, record);
        self.transactions.lock().unwrap().insert(signature, tx);
    }

    /// A signature the ledger lists but can no longer return.
    pub fn push_pruned(&self, account: Pubkey, signature: &str, block_time: i64) {
        self.histories
            .lock()
            .unwrap()
            .entry(account)
            .or_default()
            .insert(0, signature_record(signature, block_time));
    }

    pub fn add_token_account(&self, account: TokenAccount) {
        self.token_accounts.lock().unwrap().push(account);
    }

    pub fn fail_listing_for(&self, account: Pubkey) {
        self.failing_accounts.lock().unwrap().insert(account);
    }

    pub fn fail_transaction(&self, signature: &str) {
        self.failing_transactions
            .lock()
            .unwrap()
            .insert(signature.to_string());
    }

    pub fn rate_limit_next_listings(&self, count: usize) {
        self.rate_limited_listings.store(count, Ordering::SeqCst);
    }

    pub fn rate_limit_next_transactions(&self, count: usize) {
        self.rate_limited_transactions.store(count, Ordering::SeqCst);
    }

    pub fn set_balance(&self, lamports: u64) {
        self.balance.store(lamports, Ordering::SeqCst);
    }

    pub fn total_calls(&self) -> usize {
        self.signature_calls.load(Ordering::SeqCst)
            + self.transaction_calls.load(Ordering::SeqCst)
            + self.balance_calls.load(Ordering::SeqCst)
            + self.token_account_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for SpyLedger {
    async fn get_signatures_for_address(
        &self,
        account: &Pubkey,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Vec<SignatureRecord>> {
        self.signature_calls.fetch_add(1, Ordering::SeqCst);

        let pending = self.rate_limited_listings.load(Ordering::SeqCst);
        if pending > 0 {
            self.rate_limited_listings.store(pending - 1, Ordering::SeqCst);
            return Err(HistoryError::RateLimited("429 Too Many Requests".to_string()));
        }
        if self.failing_accounts.lock().unwrap().contains(account) {
            return Err(HistoryError::TransactionFetch(format!("listing failed for {}", account)));
        }

        let histories = self.histories.lock().unwrap();
        let history = histories.get(account).cloned().unwrap_or_default();
        let start = match before {
            Some(sig) => history
                .iter()
                .position(|r| r.signature == sig)
                .map(|i| i + 1)
                .unwrap_or(history.len()),
            None => 0,
        };
        Ok(history.into_iter().skip(start).take(limit).collect())
    }

    async fn get_transaction(
        &self,
        signature: &str,
        _max_supported_version: Option<u8>,
    ) -> Result<Option<RawTransaction>> {
        self.transaction_calls.fetch_add(1, Ordering::SeqCst);
        let limited = self
            .rate_limited_transactions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if limited {
            return Err(HistoryError::RateLimited("429 Too Many Requests".to_string()));
        }
        if self.failing_transactions.lock().unwrap().contains(signature) {
            return Err(HistoryError::TransactionFetch(format!("fetch failed for {}", signature)));
        }
        Ok(self.transactions.lock().unwrap().get(signature).cloned())
    }

    async fn get_balance(&self, _account: &Pubkey) -> Result<u64> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.balance.load(Ordering::SeqCst))
    }

    async fn get_token_accounts_by_owner(
        &self,
        _owner: &Pubkey,
        filter: TokenAccountFilter,
    ) -> Result<Vec<TokenAccount>> {
        self.token_account_calls.fetch_add(1, Ordering::SeqCst);
        let accounts = self.token_accounts.lock().unwrap();
        Ok(accounts
            .iter()
            .filter(|a| match filter {
                TokenAccountFilter::Mint(mint) => a.mint == mint,
                TokenAccountFilter::ProgramId(_) => true,
            })
            .cloned()
            .collect())
    }
}

/// Hands out the same ledger for every URL and records each construction.
pub struct SpyConnector {
    ledger: Arc<SpyLedger>,
    failing_urls: HashSet<String>,
    pub connects: Mutex<Vec<String>>,
}

impl SpyConnector {
    pub fn new(ledger: Arc<SpyLedger>) -> Arc<Self> {
        Arc::new(Self {
            ledger,
            failing_urls: HashSet::new(),
            connects: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_on(ledger: Arc<SpyLedger>, url: &str) -> Arc<Self> {
        Arc::new(Self {
            ledger,
            failing_urls: [url.to_string()].into_iter().collect(),
            connects: Mutex::new(Vec::new()),
        })
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().unwrap().len()
    }
}

impl Connector for SpyConnector {
    fn connect(&self, url: &str) -> Result<Arc<dyn LedgerClient>> {
        self.connects.lock().unwrap().push(url.to_string());
        if self.failing_urls.contains(url) {
            return Err(HistoryError::InvalidEndpoint {
                url: url.to_string(),
                reason: "malformed".to_string(),
            });
        }
        Ok(self.ledger.clone())
    }
}
