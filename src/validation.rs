use bs58;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid Solana address format: {0}")]
    InvalidSolanaAddress(String),

    #[error("Invalid page limit: {0}. Must be a positive integer")]
    InvalidLimit(usize),
}

pub fn validate_solana_address(address: &str) -> Result<(), ValidationError> {
    // Check if address is empty
    if address.trim().is_empty() {
        return Err(ValidationError::MissingParameter("address".to_string()));
    }

    // Decode base58 string
    let decoded = match bs58::decode(address).into_vec() {
        Ok(bytes) => bytes,
        Err(_) => return Err(ValidationError::InvalidSolanaAddress(address.to_string())),
    };

    // Solana addresses are 32 bytes
    if decoded.len() != 32 {
        return Err(ValidationError::InvalidSolanaAddress(address.to_string()));
    }

    Ok(())
}

/// Parse a base-58 account reference into a `Pubkey`.
pub fn parse_address(address: &str) -> Result<Pubkey, ValidationError> {
    let trimmed = address.trim();
    validate_solana_address(trimmed)?;

    let bytes = bs58::decode(trimmed)
        .into_vec()
        .map_err(|_| ValidationError::InvalidSolanaAddress(address.to_string()))?;

    Pubkey::try_from(bytes.as_slice())
        .map_err(|_| ValidationError::InvalidSolanaAddress(address.to_string()))
}

pub fn validate_limit(limit: usize) -> Result<usize, ValidationError> {
    if limit == 0 {
        return Err(ValidationError::InvalidLimit(limit));
    }
    Ok(limit)
}
