//! PASETO v4.local tokens
//!
//! The JSON payload is encrypted with XChaCha20 and authenticated with
//! BLAKE2b, so clients cannot read or alter it. Expiry is checked here
//! after decryption.

use chrono::{Duration, Utc};
use pasetors::Local;
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::version4::{LocalToken, V4};

use super::{Payload, SYMMETRIC_KEY_SIZE, TokenError, TokenMaker};

/// Encrypts and decrypts tokens with one 32-byte symmetric key
pub struct PasetoMaker {
    key: SymmetricKey<V4>,
}

impl PasetoMaker {
    pub fn new(symmetric_key: &str) -> Result<Self, TokenError> {
        if symmetric_key.len() != SYMMETRIC_KEY_SIZE {
            return Err(TokenError::InvalidSymmetricKeySize(symmetric_key.len()));
        }
        let key = SymmetricKey::<V4>::from(symmetric_key.as_bytes())
            .map_err(|_| TokenError::InvalidSymmetricKeySize(symmetric_key.len()))?;
        Ok(Self { key })
    }
}

impl TokenMaker for PasetoMaker {
    fn create_token(
        &self,
        username: &str,
        duration: Duration,
    ) -> Result<(String, Payload), TokenError> {
        let payload = Payload::new(username, duration);
        let message =
            serde_json::to_vec(&payload).map_err(|e| TokenError::Encode(e.to_string()))?;
        let token = LocalToken::encrypt(&self.key, &message, None, None)
            .map_err(|e| TokenError::Encode(e.to_string()))?;
        Ok((token, payload))
    }

    fn verify_token(&self, token: &str) -> Result<Payload, TokenError> {
        let untrusted =
            UntrustedToken::<Local, V4>::try_from(token).map_err(|_| TokenError::Invalid)?;
        let trusted = LocalToken::decrypt(&self.key, &untrusted, None, None)
            .map_err(|_| TokenError::Invalid)?;
        let payload: Payload =
            serde_json::from_str(trusted.payload()).map_err(|_| TokenError::Invalid)?;

        payload.check_expiry(Utc::now())?;
        Ok(payload)
    }
}
