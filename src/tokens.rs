//! Token label resolution.
//!
//! Labels are matched case-insensitively. `"sol"` always means native currency;
//! every other label must map to a mint.

use crate::error::{HistoryError, Result};
use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;

pub const NATIVE_LABEL: &str = "sol";

const USDC_MINT: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
const USDT_MINT: Pubkey = pubkey!("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenType {
    Native,
    Token { mint: Pubkey, label: String },
}

impl TokenType {
    pub fn label(&self) -> &str {
        match self {
            TokenType::Native => NATIVE_LABEL,
            TokenType::Token { label, .. } => label,
        }
    }
}

/// Label -> mint table. A `None` mint marks native currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMapping {
    entries: HashMap<String, Option<Pubkey>>,
}

impl TokenMapping {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, label: &str, mint: Option<Pubkey>) {
        self.entries.insert(label.trim().to_lowercase(), mint);
    }

    pub fn get(&self, label: &str) -> Option<Option<Pubkey>> {
        self.entries.get(&label.trim().to_lowercase()).copied()
    }

    /// Reverse lookup of the label registered for `mint`.
    pub fn label_for(&self, mint: &Pubkey) -> Option<&str> {
        let mut labels: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, m)| m.as_ref() == Some(mint))
            .map(|(label, _)| label.as_str())
            .collect();
        // several labels may share a mint; pick deterministically
        labels.sort_unstable();
        labels.first().copied()
    }

    pub fn resolve(&self, label: &str) -> Result<TokenType> {
        let normalized = label.trim().to_lowercase();
        if normalized == NATIVE_LABEL {
            return Ok(TokenType::Native);
        }

        match self.entries.get(&normalized) {
            Some(Some(mint)) => Ok(TokenType::Token {
                mint: *mint,
                label: normalized,
            }),
            _ => Err(HistoryError::UnsupportedTokenType(label.to_string())),
        }
    }
}

impl Default for TokenMapping {
    fn default() -> Self {
        let mut mapping = Self::empty();
        mapping.insert(NATIVE_LABEL, None);
        mapping.insert("usdc_sol", Some(USDC_MINT));
        mapping.insert("usdt_sol", Some(USDT_MINT));
        mapping
    }
}
