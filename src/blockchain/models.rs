use crate::models::{
    RawTransaction, TokenAccount, TokenBalance, TransactionEnvelope, TransactionMessage,
    TransactionMeta,
};
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::TransactionVersion;
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, EncodedTransaction, UiMessage,
    UiTransactionStatusMeta, UiTransactionTokenBalance,
};
use std::str::FromStr;
use tracing::warn;

/// Convert an RPC transaction into the core's raw record. The message version
/// decides the variant: any numbered version is `Versioned`, no version or
/// `legacy` is `Legacy`.
pub fn to_raw_transaction(
    signature: &str,
    tx_data: EncodedConfirmedTransactionWithStatusMeta,
) -> RawTransaction {
    let slot = tx_data.slot;
    let block_time = tx_data.block_time;
    let with_meta = tx_data.transaction;
    let version = with_meta.version;

    let transaction = match with_meta.transaction {
        EncodedTransaction::Json(tx) => {
            let message = match (version, tx.message) {
                (Some(TransactionVersion::Number(version)), _) => {
                    TransactionMessage::Versioned { version }
                }
                (_, UiMessage::Raw(message)) => TransactionMessage::Legacy {
                    account_keys: message.account_keys,
                },
                (_, UiMessage::Parsed(message)) => TransactionMessage::Legacy {
                    account_keys: message
                        .account_keys
                        .into_iter()
                        .map(|account| account.pubkey)
                        .collect(),
                },
            };
            Some(TransactionEnvelope {
                signatures: tx.signatures,
                message,
            })
        }
        _ => {
            warn!("Unsupported transaction encoding for {}", signature);
            None
        }
    };

    RawTransaction {
        slot,
        block_time,
        transaction,
        meta: with_meta.meta.map(to_meta),
    }
}

fn to_meta(meta: UiTransactionStatusMeta) -> TransactionMeta {
    TransactionMeta {
        err: meta.err.as_ref().map(|e| format!("{:?}", e)),
        fee: meta.fee,
        pre_balances: meta.pre_balances,
        post_balances: meta.post_balances,
        pre_token_balances: to_token_balances(meta.pre_token_balances),
        post_token_balances: to_token_balances(meta.post_token_balances),
    }
}

fn to_token_balances<B>(balances: B) -> Vec<TokenBalance>
where
    B: Into<Option<Vec<UiTransactionTokenBalance>>>,
{
    let balances: Option<Vec<UiTransactionTokenBalance>> = balances.into();
    balances
        .unwrap_or_default()
        .into_iter()
        .map(|balance| TokenBalance {
            account_index: balance.account_index,
            mint: balance.mint,
            owner: balance.owner.into(),
            amount: balance.ui_token_amount.amount,
            decimals: balance.ui_token_amount.decimals,
            ui_amount: balance.ui_token_amount.ui_amount,
            ui_amount_string: balance.ui_token_amount.ui_amount_string,
        })
        .collect()
}

/// Read a jsonParsed SPL token account (`{"parsed": {"info": {...}}}`).
pub fn parse_token_account(address: &str, data: &Value) -> Option<TokenAccount> {
    let info = data.get("parsed")?.get("info")?;
    let token_amount = info.get("tokenAmount")?;

    let address = Pubkey::from_str(address).ok()?;
    let mint = Pubkey::from_str(info.get("mint")?.as_str()?).ok()?;
    let amount = token_amount.get("amount")?.as_str()?.parse::<u64>().ok()?;
    let decimals = u8::try_from(token_amount.get("decimals")?.as_u64()?).ok()?;
    let ui_amount = token_amount
        .get("uiAmount")
        .and_then(Value::as_f64)
        .or_else(|| {
            token_amount
                .get("uiAmountString")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<f64>().ok())
        })
        .unwrap_or(0.0);

    Some(TokenAccount {
        address,
        mint,
        amount,
        decimals,
        ui_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SIG: &str = "5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW";
    const KEY_A: &str = "9ii1FEiWSgDzXAbwj2oTmJXzkfCw78mnHwPQv9WQ5iTn";
    const KEY_B: &str = "AhAkbf3cGD6HkFod2rBEE8mie8ks9p7vuss6WGkUFAM9";
    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn rpc_transaction(version: Value) -> Value {
        json!({
            "slot": 250_000_000u64,
            "blockTime": 1_700_000_000i64,
            "version": version,
            "transaction": {
                "signatures": [SIG],
                "message": {
                    "header": {
                        "numRequiredSignatures": 1,
                        "numReadonlySignedAccounts": 0,
                        "numReadonlyUnsignedAccounts": 1
                    },
                    "accountKeys": [KEY_A, KEY_B, "11111111111111111111111111111111"],
                    "recentBlockhash": "EETubP5AKHgjPAhzPAFcb8BAY1hMH639CWCFTqi3hq1k",
                    "instructions": []
                }
            },
            "meta": {
                "err": null,
                "status": { "Ok": null },
                "fee": 5000,
                "preBalances": [2_000_005_000u64, 0, 1],
                "postBalances": [1_000_000_000u64, 1_000_000_000u64, 1],
                "innerInstructions": [],
                "logMessages": [],
                "preTokenBalances": [],
                "postTokenBalances": [{
                    "accountIndex": 1,
                    "mint": USDC,
                    "owner": KEY_B,
                    "uiTokenAmount": {
                        "uiAmount": 12.5,
                        "decimals": 6,
                        "amount": "12500000",
                        "uiAmountString": "12.5"
                    }
                }],
                "rewards": []
            }
        })
    }

    #[test]
    fn legacy_transaction_exposes_account_keys() {
        let encoded: EncodedConfirmedTransactionWithStatusMeta =
            serde_json::from_value(rpc_transaction(json!("legacy"))).unwrap();
        let raw = to_raw_transaction(SIG, encoded);

        assert_eq!(raw.signature(), Some(SIG));
        assert_eq!(raw.block_time, Some(1_700_000_000));
        match &raw.transaction.as_ref().unwrap().message {
            TransactionMessage::Legacy { account_keys } => {
                assert_eq!(account_keys[0], KEY_A);
                assert_eq!(account_keys[1], KEY_B);
            }
            other => panic!("expected legacy message, got {:?}", other),
        }

        let meta = raw.meta.unwrap();
        assert_eq!(meta.pre_balances[0], 2_000_005_000);
        assert_eq!(meta.post_token_balances.len(), 1);
        assert_eq!(meta.post_token_balances[0].owner.as_deref(), Some(KEY_B));
        assert_eq!(meta.post_token_balances[0].ui_amount, Some(12.5));
    }

    #[test]
    fn numbered_version_becomes_versioned_message() {
        let encoded: EncodedConfirmedTransactionWithStatusMeta =
            serde_json::from_value(rpc_transaction(json!(0))).unwrap();
        let raw = to_raw_transaction(SIG, encoded);

        assert_eq!(
            raw.transaction.unwrap().message,
            TransactionMessage::Versioned { version: 0 }
        );
    }

    #[test]
    fn parses_json_token_account() {
        let data = json!({
            "program": "spl-token",
            "parsed": {
                "type": "account",
                "info": {
                    "mint": USDC,
                    "owner": KEY_A,
                    "tokenAmount": {
                        "amount": "2500000",
                        "decimals": 6,
                        "uiAmount": 2.5,
                        "uiAmountString": "2.5"
                    }
                }
            },
            "space": 165
        });

        let account = parse_token_account(KEY_B, &data).unwrap();
        assert_eq!(account.mint.to_string(), USDC);
        assert_eq!(account.amount, 2_500_000);
        assert_eq!(account.decimals, 6);
        assert_eq!(account.ui_amount, 2.5);

        assert!(parse_token_account(KEY_B, &json!(["base64data", "base64"])).is_none());
    }
}
