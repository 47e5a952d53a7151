//! HS256 signing for self-contained (JWT) access tokens
//!
//! Without a configured key a random one is generated per process, so every
//! JWT becomes unverifiable after a restart. There is no rotation.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::IssuerError;

const MIN_KEY_LEN: usize = 32;

/// Claims carried inside a JWT access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub iss: String,
    pub sub: String,
    pub client_id: String,
    /// Space-separated scope list
    pub scope: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

pub struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

impl SigningKey {
    /// Generate an ephemeral random key
    pub fn generate() -> Self {
        let mut secret = [0u8; MIN_KEY_LEN];
        rand::rng().fill(&mut secret);
        Self::from_secret(&secret)
    }

    /// Load a key from its base64 encoding
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let secret = STANDARD
            .decode(encoded.trim())
            .context("Signing key is not valid base64")?;
        anyhow::ensure!(
            secret.len() >= MIN_KEY_LEN,
            "Signing key must be at least {} bytes",
            MIN_KEY_LEN
        );
        Ok(Self::from_secret(&secret))
    }

    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn sign(&self, claims: &JwtClaims) -> Result<String, IssuerError> {
        Ok(encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding,
        )?)
    }

    /// Verify signature and issuer. Expiry is left to the caller so that the
    /// `now < exp` rule is applied the same way as for reference tokens.
    pub fn verify(&self, token: &str, issuer: &str) -> Result<JwtClaims, IssuerError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_issuer(&[issuer]);

        decode::<JwtClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT verification failed: {}", e);
                IssuerError::InvalidSignature
            })
    }
}

/// Cheap shape check used to route a token to JWT verification
pub fn looks_like_jwt(token: &str) -> bool {
    token.split('.').count() == 3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> JwtClaims {
        JwtClaims {
            iss: "http://localhost:5000".to_string(),
            sub: "1".to_string(),
            client_id: "C1".to_string(),
            scope: "read".to_string(),
            iat: 1_700_000_000,
            exp: 1_700_003_600,
            jti: "abc".to_string(),
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let key = SigningKey::generate();
        let token = key.sign(&claims()).unwrap();

        assert!(looks_like_jwt(&token));
        // Expiry is not checked here, so an old exp still verifies
        assert_eq!(key.verify(&token, "http://localhost:5000").unwrap(), claims());
    }

    #[test]
    fn test_other_key_fails_verification() {
        let token = SigningKey::generate().sign(&claims()).unwrap();
        let err = SigningKey::generate()
            .verify(&token, "http://localhost:5000")
            .unwrap_err();
        assert!(matches!(err, IssuerError::InvalidSignature));
    }

    #[test]
    fn test_wrong_issuer_fails_verification() {
        let key = SigningKey::generate();
        let token = key.sign(&claims()).unwrap();
        assert!(key.verify(&token, "http://elsewhere").is_err());
    }

    #[test]
    fn test_from_base64() {
        let encoded = STANDARD.encode([7u8; 32]);
        let key = SigningKey::from_base64(&encoded).unwrap();
        let token = key.sign(&claims()).unwrap();

        let same = SigningKey::from_base64(&encoded).unwrap();
        assert!(same.verify(&token, "http://localhost:5000").is_ok());

        assert!(SigningKey::from_base64(&STANDARD.encode([7u8; 8])).is_err());
        assert!(SigningKey::from_base64("***").is_err());
    }

    #[test]
    fn test_looks_like_jwt() {
        assert!(!looks_like_jwt("garbage"));
        assert!(!looks_like_jwt("a.b"));
        assert!(looks_like_jwt("a.b.c"));
    }
}
