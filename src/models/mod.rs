// Ledger records as the core sees them, normalized transfer records and the
// paged response shape returned to callers.

use crate::error::{HistoryError, Result};
use crate::validation::validate_limit;
use serde::{Deserialize, Serialize, Serializer};
use solana_sdk::pubkey::Pubkey;
use std::fmt;

pub const DEFAULT_PAGE_LIMIT: usize = 20;

fn serialize_pubkey<S: Serializer>(key: &Pubkey, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(key)
}

/// `before` is an exclusive upper bound: results are strictly older than it.
/// Deserialization goes through [`PaginationCursor::new`], so the limit is
/// always positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawCursor")]
pub struct PaginationCursor {
    limit: usize,
    before: Option<String>,
}

impl PaginationCursor {
    pub fn new(limit: usize) -> Result<Self> {
        Ok(Self {
            limit: validate_limit(limit)?,
            before: None,
        })
    }

    pub fn with_before(mut self, before: impl Into<String>) -> Self {
        self.before = Some(before.into());
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn before(&self) -> Option<&str> {
        self.before.as_deref()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCursor {
    limit: usize,
    #[serde(default)]
    before: Option<String>,
}

impl TryFrom<RawCursor> for PaginationCursor {
    type Error = HistoryError;

    fn try_from(raw: RawCursor) -> Result<Self> {
        let cursor = Self::new(raw.limit)?;
        Ok(match raw.before {
            Some(before) => cursor.with_before(before),
            None => cursor,
        })
    }
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            before: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRecord {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub err: Option<String>,
}

/// The two message encodings a fetched transaction can carry. Only legacy
/// messages expose their account keys directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TransactionMessage {
    #[serde(rename_all = "camelCase")]
    Legacy { account_keys: Vec<String> },
    /// Account keys need lookup-table resolution, which is not performed.
    Versioned { version: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEnvelope {
    pub signatures: Vec<String>,
    pub message: TransactionMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub account_index: u8,
    pub mint: String,
    pub owner: Option<String>,
    pub amount: String,
    pub decimals: u8,
    pub ui_amount: Option<f64>,
    pub ui_amount_string: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    pub err: Option<String>,
    pub fee: u64,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
}

/// A transaction as returned by the ledger, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub slot: u64,
    pub block_time: Option<i64>,
    pub transaction: Option<TransactionEnvelope>,
    pub meta: Option<TransactionMeta>,
}

impl RawTransaction {
    /// The transaction's own (first) signature.
    pub fn signature(&self) -> Option<&str> {
        self.transaction
            .as_ref()
            .and_then(|tx| tx.signatures.first())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Amount {
    pub value: f64,
    pub unit: String,
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    #[serde(serialize_with = "serialize_pubkey")]
    pub token_mint: Pubkey,
    pub token_type: String,
}

/// Simplified transfer. `from`/`to` are best-effort: account keys 0 and 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub signature: String,
    #[serde(serialize_with = "serialize_pubkey")]
    pub from: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub to: Pubkey,
    pub amount: Amount,
    pub timestamp: String,
    #[serde(flatten)]
    pub token: Option<TokenTransfer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub before: Option<String>,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionPage<T> {
    pub transactions: Vec<T>,
    pub pagination: Pagination,
}

/// Raw page as produced by the aggregators; entries are `None` when the
/// ledger no longer has the transaction.
pub type RawTransactionPage = TransactionPage<Option<RawTransaction>>;

/// A token account owned by a wallet, read from parsed account data.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenAccount {
    pub address: Pubkey,
    pub mint: Pubkey,
    pub amount: u64,
    pub decimals: u8,
    pub ui_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHolding {
    #[serde(serialize_with = "serialize_pubkey")]
    pub mint: Pubkey,
    pub token_type: String,
    pub amount: f64,
    pub accounts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalances {
    #[serde(serialize_with = "serialize_pubkey")]
    pub address: Pubkey,
    pub native: Amount,
    pub tokens: Vec<TokenHolding>,
}
