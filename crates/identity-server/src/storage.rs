//! In-memory table of issued reference tokens
//!
//! The only mutable shared state in the issuer. Tokens are keyed by the
//! SHA-256 hash of their value; raw token values are never stored.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

/// A stored reference token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredToken {
    pub token_hash: String,
    pub subject_id: String,
    pub client_id: String,
    pub scopes: BTreeSet<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Default)]
pub struct TokenStore {
    /// Maps token hash -> token data
    tokens: RwLock<HashMap<String, StoredToken>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, StoredToken>> {
        self.tokens.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, StoredToken>> {
        self.tokens.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a new token
    pub fn store(&self, token: StoredToken) {
        self.write().insert(token.token_hash.clone(), token);
    }

    /// Get a token by its hash, expired or not
    pub fn get(&self, token_hash: &str) -> Option<StoredToken> {
        self.read().get(token_hash).cloned()
    }

    /// Remove a token by its hash. Returns whether it was present.
    pub fn revoke(&self, token_hash: &str) -> bool {
        self.write().remove(token_hash).is_some()
    }

    /// Remove a token only if it was issued to `client_id`
    pub fn revoke_for_client(&self, token_hash: &str, client_id: &str) -> bool {
        let mut tokens = self.write();
        match tokens.get(token_hash) {
            Some(t) if t.client_id == client_id => tokens.remove(token_hash).is_some(),
            _ => false,
        }
    }

    /// Drop every token expired at `now`. Returns how many were removed.
    pub fn cleanup_expired(&self, now: DateTime<Utc>) -> usize {
        let mut tokens = self.write();
        let before = tokens.len();
        tokens.retain(|_, t| !t.is_expired_at(now));
        before - tokens.len()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

// --- Utility Functions ---

/// Generate a cryptographically secure random string
pub fn generate_random_string(len: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Hash a token or secret for storage (we don't store raw values)
pub fn hash_token(token: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let result = hasher.finalize();
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, result)
}
