//! HS256 JSON web tokens

use chrono::Duration;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};

use super::{MIN_SECRET_KEY_SIZE, Payload, TokenError, TokenMaker};

/// Signs and verifies JWTs with one shared secret
#[derive(Clone)]
pub struct JwtMaker {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtMaker {
    pub fn new(secret_key: &str) -> Result<Self, TokenError> {
        if secret_key.len() < MIN_SECRET_KEY_SIZE {
            return Err(TokenError::InvalidKeySize(secret_key.len()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret_key.as_bytes()),
            validation,
        })
    }
}

impl TokenMaker for JwtMaker {
    fn create_token(
        &self,
        username: &str,
        duration: Duration,
    ) -> Result<(String, Payload), TokenError> {
        let payload = Payload::new(username, duration);
        let token = encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)
            .map_err(|e| TokenError::Encode(e.to_string()))?;
        Ok((token, payload))
    }

    /// Check signature, algorithm and expiry
    fn verify_token(&self, token: &str) -> Result<Payload, TokenError> {
        decode::<Payload>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_create_and_verify() {
        let maker = JwtMaker::new(SECRET).unwrap();
        let issued_at = Utc::now();

        let (token, created) = maker.create_token("alice", Duration::minutes(1)).unwrap();
        assert!(!token.is_empty());

        let payload = maker.verify_token(&token).unwrap();
        assert_eq!(payload.id, created.id);
        assert!(!payload.id.is_nil());
        assert_eq!(payload.username, "alice");
        assert!((payload.issued_at - issued_at).num_seconds().abs() <= 1);
        assert!(
            (payload.expired_at - (issued_at + Duration::minutes(1)))
                .num_seconds()
                .abs()
                <= 1
        );
    }

    #[test]
    fn test_expired_token() {
        let maker = JwtMaker::new(SECRET).unwrap();
        let (token, _) = maker.create_token("alice", -Duration::minutes(1)).unwrap();

        assert!(matches!(maker.verify_token(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_wrong_algorithm_rejected() {
        let maker = JwtMaker::new(SECRET).unwrap();
        let payload = Payload::new("alice", Duration::minutes(1));
        let token = encode(
            &Header::new(Algorithm::HS512),
            &payload,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(maker.verify_token(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_foreign_key_rejected() {
        let maker = JwtMaker::new(SECRET).unwrap();
        let other = JwtMaker::new("ffffffffffffffffffffffffffffffff").unwrap();
        let (token, _) = other.create_token("alice", Duration::minutes(1)).unwrap();

        assert!(matches!(maker.verify_token(&token), Err(TokenError::Invalid)));
        assert!(matches!(maker.verify_token("garbage"), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(
            JwtMaker::new("too-short"),
            Err(TokenError::InvalidKeySize(9))
        ));
    }
}
