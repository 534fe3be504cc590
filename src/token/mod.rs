//! Access and refresh tokens
//!
//! Two interchangeable makers behind [`TokenMaker`]: PASETO v4.local
//! (encrypted, the default) and HS256 JSON web tokens. The payload id
//! doubles as the session id for refresh tokens.

mod jwt;
mod paseto;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use jwt::JwtMaker;
pub use paseto::PasetoMaker;

/// Shortest accepted JWT signing secret, in bytes
pub const MIN_SECRET_KEY_SIZE: usize = 32;
/// PASETO v4.local key length, in bytes
pub const SYMMETRIC_KEY_SIZE: usize = 32;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Invalid key size: must be at least {min} characters, got {0}", min = MIN_SECRET_KEY_SIZE)]
    InvalidKeySize(usize),

    #[error("Invalid key size: must be exactly {size} characters, got {0}", size = SYMMETRIC_KEY_SIZE)]
    InvalidSymmetricKeySize(usize),

    #[error("Token is invalid")]
    Invalid,

    #[error("Token has expired")]
    Expired,

    #[error("Token encoding failed: {0}")]
    Encode(String),
}

/// Token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub id: Uuid,
    pub username: String,
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expired_at: DateTime<Utc>,
}

impl Payload {
    pub fn new(username: &str, duration: Duration) -> Self {
        let issued_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            issued_at,
            expired_at: issued_at
                .checked_add_signed(duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Reject a payload whose expiry has passed
    pub fn check_expiry(&self, now: DateTime<Utc>) -> Result<(), TokenError> {
        if now > self.expired_at {
            return Err(TokenError::Expired);
        }
        Ok(())
    }
}

/// Creates and verifies tokens
pub trait TokenMaker: Send + Sync {
    /// Issue a token for `username` valid for `duration`
    fn create_token(
        &self,
        username: &str,
        duration: Duration,
    ) -> Result<(String, Payload), TokenError>;

    /// Check integrity and expiry, returning the payload
    fn verify_token(&self, token: &str) -> Result<Payload, TokenError>;
}

/// Token format selected in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[default]
    Paseto,
    Jwt,
}

/// Build the configured maker
pub fn new_maker(
    kind: TokenKind,
    symmetric_key: &str,
) -> Result<Arc<dyn TokenMaker>, TokenError> {
    Ok(match kind {
        TokenKind::Paseto => Arc::new(PasetoMaker::new(symmetric_key)?),
        TokenKind::Jwt => Arc::new(JwtMaker::new(symmetric_key)?),
    })
}
