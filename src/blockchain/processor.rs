use crate::error::{HistoryError, Result};
use crate::models::{
    Amount, RawTransaction, TokenBalance, TokenTransfer, TransactionEnvelope, TransactionMessage,
    TransactionMeta, TransferRecord,
};
use chrono::{DateTime, SecondsFormat, Utc};
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use tracing::warn;

pub const NATIVE_UNIT: &str = "SOL";

/// Simplify a native-currency transaction.
///
/// The amount is the balance delta of account key 0 and the parties are
/// account keys 0 and 1. This is a heuristic, not an instruction parser, so
/// `from`/`to` are best-effort. Returns `None` for missing parts, versioned
/// messages and malformed records; it never fails.
pub fn normalize_native(tx: &RawTransaction) -> Option<TransferRecord> {
    let (envelope, meta, account_keys) = legacy_parts(tx, "native")?;

    match native_transfer(envelope, meta, account_keys, tx.block_time) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Skipping native transaction {:?}: {}", tx.signature(), e);
            None
        }
    }
}

/// Simplify a token transaction using the first post-transfer balance entry
/// for `token_mint`. Returns `None` when the mint was not moved, for
/// versioned messages and for malformed entries.
pub fn normalize_token(
    tx: &RawTransaction,
    token_mint: &Pubkey,
    token_type: &str,
) -> Option<TransferRecord> {
    let (envelope, meta, account_keys) = legacy_parts(tx, "token")?;

    let mint = token_mint.to_string();
    let entry = meta.post_token_balances.iter().find(|b| b.mint == mint)?;

    match token_transfer(envelope, account_keys, entry, token_mint, token_type, tx.block_time) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Skipping token transaction {:?}: {}", tx.signature(), e);
            None
        }
    }
}

fn legacy_parts<'a>(
    tx: &'a RawTransaction,
    path: &str,
) -> Option<(&'a TransactionEnvelope, &'a TransactionMeta, &'a [String])> {
    let envelope = tx.transaction.as_ref()?;
    let meta = tx.meta.as_ref()?;

    match &envelope.message {
        TransactionMessage::Legacy { account_keys } => Some((envelope, meta, account_keys)),
        TransactionMessage::Versioned { version } => {
            warn!(
                "versioned transactions unsupported for {} processing (v{}, {:?})",
                path,
                version,
                tx.signature()
            );
            None
        }
    }
}

fn native_transfer(
    envelope: &TransactionEnvelope,
    meta: &TransactionMeta,
    account_keys: &[String],
    block_time: Option<i64>,
) -> Result<TransferRecord> {
    let signature = first_signature(envelope)?;
    let (from, to) = parties(account_keys)?;

    let pre = *meta
        .pre_balances
        .first()
        .ok_or_else(|| HistoryError::MalformedRecord("missing pre balance".to_string()))?;
    let post = *meta
        .post_balances
        .first()
        .ok_or_else(|| HistoryError::MalformedRecord("missing post balance".to_string()))?;
    let lamports = pre.abs_diff(post);

    Ok(TransferRecord {
        signature,
        from,
        to,
        amount: Amount {
            value: lamports as f64 / LAMPORTS_PER_SOL as f64,
            unit: NATIVE_UNIT.to_string(),
        },
        timestamp: format_timestamp(block_time),
        token: None,
    })
}

fn token_transfer(
    envelope: &TransactionEnvelope,
    account_keys: &[String],
    entry: &TokenBalance,
    token_mint: &Pubkey,
    token_type: &str,
    block_time: Option<i64>,
) -> Result<TransferRecord> {
    let signature = first_signature(envelope)?;
    let (from, to) = parties(account_keys)?;

    // uiAmount is null for some older records; fall back to the string form
    let value = entry
        .ui_amount
        .or_else(|| entry.ui_amount_string.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            HistoryError::MalformedRecord(format!(
                "unreadable token amount for account index {}",
                entry.account_index
            ))
        })?;

    Ok(TransferRecord {
        signature,
        from,
        to,
        amount: Amount {
            value,
            unit: token_type.to_uppercase(),
        },
        timestamp: format_timestamp(block_time),
        token: Some(TokenTransfer {
            token_mint: *token_mint,
            token_type: token_type.to_string(),
        }),
    })
}

fn first_signature(envelope: &TransactionEnvelope) -> Result<String> {
    envelope
        .signatures
        .first()
        .cloned()
        .ok_or_else(|| HistoryError::MalformedRecord("transaction has no signatures".to_string()))
}

fn parties(account_keys: &[String]) -> Result<(Pubkey, Pubkey)> {
    let key = |index: usize| -> Result<Pubkey> {
        let raw = account_keys.get(index).ok_or_else(|| {
            HistoryError::MalformedRecord(format!("missing account key {}", index))
        })?;
        Pubkey::from_str(raw)
            .map_err(|_| HistoryError::MalformedRecord(format!("invalid account key {}", raw)))
    };
    Ok((key(0)?, key(1)?))
}

/// RFC 3339 UTC; a missing block time is the epoch.
pub fn format_timestamp(block_time: Option<i64>) -> String {
    DateTime::<Utc>::from_timestamp(block_time.unwrap_or(0), 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}
