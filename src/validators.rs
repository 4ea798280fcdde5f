/// Input validators module - rejects malformed identifiers and content before business logic
/// Features:
/// 1. Wallet address format check
/// 2. Session identifier format check
/// 3. Post content length and control character limits

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_POST_LENGTH: usize = 5000;
const MIN_SESSION_ID_LENGTH: usize = 16;
const MAX_SESSION_ID_LENGTH: usize = 128;

lazy_static! {
    // EVM-style address: 0x followed by 40 hex digits
    static ref WALLET_ADDRESS_REGEX: Regex = Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap();

    static ref SESSION_ID_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

/// Validates a wallet address and returns it trimmed
pub fn validate_wallet_address(address: &str) -> Result<String, ValidationError> {
    let trimmed = address.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("wallet_address".to_string()));
    }

    if !WALLET_ADDRESS_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("wallet_address".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a session identifier supplied by the session layer
pub fn validate_session_id(session_id: &str) -> Result<&str, ValidationError> {
    if session_id.is_empty() {
        return Err(ValidationError::EmptyField("session_id".to_string()));
    }

    if session_id.len() < MIN_SESSION_ID_LENGTH
        || session_id.len() > MAX_SESSION_ID_LENGTH
        || !SESSION_ID_REGEX.is_match(session_id)
    {
        return Err(ValidationError::InvalidFormat("session_id".to_string()));
    }

    Ok(session_id)
}

/// Validates post content
/// - Must not be blank
/// - Length counted in characters, not bytes
/// - NUL bytes are rejected outright
pub fn validate_post_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyField("content".to_string()));
    }

    if content.chars().count() > MAX_POST_LENGTH {
        return Err(ValidationError::TooLong("content".to_string(), MAX_POST_LENGTH));
    }

    if content.contains('\0') {
        return Err(ValidationError::SuspiciousContent("content".to_string()));
    }

    Ok(())
}
