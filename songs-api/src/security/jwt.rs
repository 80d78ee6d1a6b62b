//! JWT access tokens (HMAC)

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use songs_common::config::AuthConfig;
use songs_common::{Error, Result};
use thiserror::Error;

/// Token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// Reasons a presented token is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
}

/// Issues and verifies access tokens with one shared secret
#[derive(Clone)]
pub struct JwtManager {
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtManager {
    pub fn new(secret: &str, algorithm: Algorithm, ttl: Duration) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            header: Header::new(algorithm),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let algorithm = parse_algorithm(&config.jwt_algorithm)?;
        Ok(Self::new(
            &config.jwt_secret,
            algorithm,
            Duration::minutes(config.token_ttl_minutes),
        ))
    }

    /// Sign a token for `username`
    pub fn issue(&self, username: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("Failed to encode token: {}", e)))
    }

    /// Verify signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> std::result::Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

/// HMAC algorithms only; the secret is symmetric
fn parse_algorithm(name: &str) -> Result<Algorithm> {
    match name.to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(Error::Config(format!("Unsupported JWT algorithm: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(ttl_minutes: i64) -> JwtManager {
        JwtManager::new("test-secret", Algorithm::HS256, Duration::minutes(ttl_minutes))
    }

    #[test]
    fn test_issue_then_verify() {
        let jwt = manager(60);
        let token = jwt.issue("alice").unwrap();
        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_expired_token_rejected() {
        let jwt = manager(-5);
        let token = jwt.issue("alice").unwrap();
        assert_eq!(jwt.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = manager(60).issue("alice").unwrap();
        let other = JwtManager::new("other-secret", Algorithm::HS256, Duration::minutes(60));
        assert_eq!(other.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(manager(60).verify("not.a.token"), Err(TokenError::Invalid));
    }

    #[test]
    fn test_unsupported_algorithm_is_config_error() {
        let config = AuthConfig {
            jwt_algorithm: "RS256".to_string(),
            ..AuthConfig::default()
        };
        assert!(matches!(JwtManager::from_config(&config), Err(Error::Config(_))));
    }
}
