//! Token issuance, validation and revocation
//!
//! A token moves `issued -> valid -> {expired | revoked}` and never back.
//! Reference tokens live in the `TokenStore`; JWTs carry their own claims and
//! are checked against the signing key.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;

use crate::config::IssuerConfig;
use crate::error::IssuerError;
use crate::password;
use crate::registry::{AccessTokenType, ApiResource, Client, GrantType, Registry, UserClaim};
use crate::signing::{JwtClaims, SigningKey, looks_like_jwt};
use crate::storage::{StoredToken, TokenStore, generate_random_string, hash_token};

/// Length of generated reference token values
const REFERENCE_TOKEN_LEN: usize = 48;

/// Resource owner password credentials request
#[derive(Debug, Clone)]
pub struct PasswordGrant {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    /// Space-separated scopes; `None` or empty means every allowed scope
    pub scope: Option<String>,
}

/// A freshly minted access token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub value: String,
    pub subject_id: String,
    pub client_id: String,
    pub scopes: BTreeSet<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub token_type: AccessTokenType,
}

impl IssuedToken {
    /// Seconds from issuance to expiry
    pub fn expires_in(&self) -> u64 {
        (self.expires_at - self.issued_at).num_seconds().max(0) as u64
    }

    pub fn scope(&self) -> String {
        join_scopes(&self.scopes)
    }
}

/// What a valid token says about its bearer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub subject_id: String,
    pub client_id: String,
    pub scopes: BTreeSet<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub token_type: AccessTokenType,
    pub user_claims: Vec<UserClaim>,
}

impl Claims {
    pub fn scope(&self) -> String {
        join_scopes(&self.scopes)
    }
}

pub struct Issuer {
    registry: Registry,
    store: TokenStore,
    signing_key: SigningKey,
    issuer_url: String,
    lifetime: Duration,
}

impl Issuer {
    pub fn new(
        registry: Registry,
        signing_key: SigningKey,
        issuer_url: impl Into<String>,
        lifetime: Duration,
    ) -> Self {
        Self {
            registry,
            store: TokenStore::new(),
            signing_key,
            issuer_url: issuer_url.into(),
            lifetime,
        }
    }

    /// Build an issuer from configuration, generating a signing key if none is configured
    pub fn from_config(config: &IssuerConfig, issuer_url: &str) -> anyhow::Result<Self> {
        let registry = Registry::from_config(config)?;
        let signing_key = match &config.tokens.signing_key {
            Some(encoded) => SigningKey::from_base64(encoded)?,
            None => {
                tracing::warn!(
                    "No signing key configured; generated an ephemeral key (JWTs will not survive a restart)"
                );
                SigningKey::generate()
            }
        };
        Ok(Self::new(
            registry,
            signing_key,
            issuer_url,
            config.tokens.access_token_lifetime(),
        ))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn issuer_url(&self) -> &str {
        &self.issuer_url
    }

    /// Authenticate a client by id and secret
    pub fn authenticate_client(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<&Client, IssuerError> {
        let client = self
            .registry
            .client(client_id)
            .ok_or_else(|| IssuerError::UnknownClient(client_id.to_string()))?;
        if !client.verify_secret(client_secret) {
            return Err(IssuerError::InvalidClientCredentials);
        }
        Ok(client)
    }

    /// Authenticate an API resource by name and secret
    pub fn authenticate_api_resource(
        &self,
        name: &str,
        secret: &str,
    ) -> Result<&ApiResource, IssuerError> {
        let resource = self
            .registry
            .api_resource(name)
            .ok_or_else(|| IssuerError::UnknownClient(name.to_string()))?;
        if !resource.verify_secret(secret) {
            return Err(IssuerError::InvalidClientCredentials);
        }
        Ok(resource)
    }

    /// Run the password grant. Every check is terminal; nothing is stored
    /// unless all of them pass.
    pub fn issue_token(&self, grant: &PasswordGrant) -> Result<IssuedToken, IssuerError> {
        let client = self.authenticate_client(&grant.client_id, &grant.client_secret)?;

        if !client.allows_grant(GrantType::Password) {
            return Err(IssuerError::UnsupportedGrantType {
                client_id: client.client_id.clone(),
                grant_type: GrantType::Password.as_str(),
            });
        }

        let user = match self.registry.user_by_username(&grant.username) {
            Some(user) if user.verify_password(&grant.password) => user,
            Some(_) => return Err(IssuerError::InvalidUserCredentials),
            None => {
                // Same hashing cost whether or not the username exists
                password::verify_dummy(&grant.password);
                return Err(IssuerError::InvalidUserCredentials);
            }
        };

        let scopes = self.resolve_scopes(client, grant.scope.as_deref())?;

        let issued_at = Utc::now();
        let expires_at = issued_at + self.lifetime;

        let value = match client.token_type {
            AccessTokenType::Reference => {
                let value = generate_random_string(REFERENCE_TOKEN_LEN);
                self.store.store(StoredToken {
                    token_hash: hash_token(&value),
                    subject_id: user.subject_id.clone(),
                    client_id: client.client_id.clone(),
                    scopes: scopes.clone(),
                    issued_at,
                    expires_at,
                });
                value
            }
            AccessTokenType::Jwt => self.signing_key.sign(&JwtClaims {
                iss: self.issuer_url.clone(),
                sub: user.subject_id.clone(),
                client_id: client.client_id.clone(),
                scope: join_scopes(&scopes),
                iat: issued_at.timestamp(),
                exp: expires_at.timestamp(),
                jti: uuid::Uuid::new_v4().to_string(),
            })?,
        };

        Ok(IssuedToken {
            value,
            subject_id: user.subject_id.clone(),
            client_id: client.client_id.clone(),
            scopes,
            issued_at,
            expires_at,
            token_type: client.token_type,
        })
    }

    fn resolve_scopes(
        &self,
        client: &Client,
        requested: Option<&str>,
    ) -> Result<BTreeSet<String>, IssuerError> {
        let requested: BTreeSet<String> = requested
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        if requested.is_empty() {
            return Ok(client.allowed_scopes.clone());
        }

        match requested
            .iter()
            .find(|s| !client.allowed_scopes.contains(*s) || !self.registry.has_scope(s))
        {
            Some(scope) => Err(IssuerError::InvalidScope(scope.clone())),
            None => Ok(requested),
        }
    }

    pub fn validate_token(&self, value: &str) -> Result<Claims, IssuerError> {
        self.validate_token_at(value, Utc::now())
    }

    /// Validate a token as of `now`
    pub fn validate_token_at(&self, value: &str, now: DateTime<Utc>) -> Result<Claims, IssuerError> {
        let claims = if looks_like_jwt(value) {
            let jwt = self.signing_key.verify(value, &self.issuer_url)?;
            let issued_at = timestamp(jwt.iat)?;
            let expires_at = timestamp(jwt.exp)?;
            Claims {
                subject_id: jwt.sub,
                client_id: jwt.client_id,
                scopes: jwt.scope.split_whitespace().map(str::to_string).collect(),
                issued_at,
                expires_at,
                token_type: AccessTokenType::Jwt,
                user_claims: Vec::new(),
            }
        } else {
            let stored = self
                .store
                .get(&hash_token(value))
                .ok_or(IssuerError::TokenNotFound)?;
            Claims {
                subject_id: stored.subject_id,
                client_id: stored.client_id,
                scopes: stored.scopes,
                issued_at: stored.issued_at,
                expires_at: stored.expires_at,
                token_type: AccessTokenType::Reference,
                user_claims: Vec::new(),
            }
        };

        if now >= claims.expires_at {
            return Err(IssuerError::TokenExpired);
        }

        let user_claims = self
            .registry
            .user_by_subject(&claims.subject_id)
            .map(|user| user.claims.clone())
            .unwrap_or_default();

        Ok(Claims {
            user_claims,
            ..claims
        })
    }

    /// Introspect a token on behalf of an API resource.
    ///
    /// Returns `None` for anything the resource must treat as inactive,
    /// including valid tokens that carry none of the resource's scopes.
    pub fn introspect(&self, resource: &ApiResource, value: &str) -> Option<Claims> {
        match self.validate_token(value) {
            Ok(claims) if claims.scopes.iter().any(|s| resource.scopes.contains(s)) => {
                Some(claims)
            }
            Ok(_) => {
                tracing::debug!("Token has no scope for API resource {}", resource.name);
                None
            }
            Err(e) => {
                tracing::debug!("Introspection by {}: {}", resource.name, e);
                None
            }
        }
    }

    /// Revoke a reference token. Revoking an unknown token or a JWT is a no-op.
    pub fn revoke_token(&self, value: &str) {
        if self.store.revoke(&hash_token(value)) {
            tracing::info!("Revoked reference token");
        }
    }

    /// Revoke a reference token only if it belongs to `client_id` (RFC 7009)
    pub fn revoke_token_for_client(&self, value: &str, client_id: &str) {
        if self.store.revoke_for_client(&hash_token(value), client_id) {
            tracing::info!("Revoked reference token for client {}", client_id);
        }
    }

    /// Sweep expired reference tokens. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let removed = self.store.cleanup_expired(Utc::now());
        if removed > 0 {
            tracing::info!("Cleaned up {} expired tokens", removed);
        }
        removed
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, IssuerError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or(IssuerError::InvalidSignature)
}

fn join_scopes(scopes: &BTreeSet<String>) -> String {
    scopes.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Scope, User};

    const ISSUER: &str = "http://localhost:5000";

    fn registry(token_type: AccessTokenType) -> Registry {
        let mut registry = Registry::new();
        for name in ["read", "write"] {
            registry
                .register_scope(Scope {
                    name: name.to_string(),
                    display_name: name.to_string(),
                })
                .unwrap();
        }
        registry
            .register_api_resource(ApiResource::new("api", "api-secret", ["read".to_string()]))
            .unwrap();
        registry
            .register_client(Client::new(
                "C1",
                "S1",
                [GrantType::Password],
                ["read".to_string()],
                token_type,
            ))
            .unwrap();
        registry
            .register_client(Client::new(
                "machine",
                "S2",
                [GrantType::ClientCredentials],
                ["read".to_string()],
                token_type,
            ))
            .unwrap();
        registry
            .register_user(
                User::with_password(
                    "1",
                    "alice",
                    "pw123",
                    vec![UserClaim::new("name", "Alice")],
                )
                .unwrap(),
            )
            .unwrap();
        registry
    }

    fn issuer(token_type: AccessTokenType) -> Issuer {
        Issuer::new(
            registry(token_type),
            SigningKey::generate(),
            ISSUER,
            Duration::hours(1),
        )
    }

    fn grant(secret: &str, password: &str, scope: Option<&str>) -> PasswordGrant {
        PasswordGrant {
            client_id: "C1".to_string(),
            client_secret: secret.to_string(),
            username: "alice".to_string(),
            password: password.to_string(),
            scope: scope.map(str::to_string),
        }
    }

    #[test]
    fn test_issued_reference_token_validates() {
        let issuer = issuer(AccessTokenType::Reference);
        let token = issuer.issue_token(&grant("S1", "pw123", Some("read"))).unwrap();

        assert_eq!(token.token_type, AccessTokenType::Reference);
        assert_eq!(token.expires_in(), 3600);

        let claims = issuer.validate_token(&token.value).unwrap();
        assert_eq!(claims.subject_id, "1");
        assert_eq!(claims.client_id, "C1");
        assert_eq!(claims.scope(), "read");
        assert_eq!(claims.user_claims, vec![UserClaim::new("name", "Alice")]);
    }

    #[test]
    fn test_issued_jwt_validates() {
        let issuer = issuer(AccessTokenType::Jwt);
        let token = issuer.issue_token(&grant("S1", "pw123", Some("read"))).unwrap();

        assert!(looks_like_jwt(&token.value));
        let claims = issuer.validate_token(&token.value).unwrap();
        assert_eq!(claims.token_type, AccessTokenType::Jwt);
        assert_eq!(claims.scope(), "read");
        assert_eq!(claims.user_claims.len(), 1);
    }

    #[test]
    fn test_empty_scope_grants_all_allowed() {
        let issuer = issuer(AccessTokenType::Reference);
        let token = issuer.issue_token(&grant("S1", "pw123", None)).unwrap();
        assert_eq!(token.scope(), "read");

        let token = issuer.issue_token(&grant("S1", "pw123", Some("  "))).unwrap();
        assert_eq!(token.scope(), "read");
    }

    #[test]
    fn test_wrong_secret_wins_over_user_errors() {
        let issuer = issuer(AccessTokenType::Reference);
        for password in ["pw123", "wrong"] {
            let err = issuer
                .issue_token(&grant("bad", password, Some("write")))
                .unwrap_err();
            assert!(matches!(err, IssuerError::InvalidClientCredentials));
        }
    }

    #[test]
    fn test_unknown_client() {
        let issuer = issuer(AccessTokenType::Reference);
        let mut request = grant("S1", "pw123", None);
        request.client_id = "nobody".to_string();

        let err = issuer.issue_token(&request).unwrap_err();
        assert!(matches!(err, IssuerError::UnknownClient(id) if id == "nobody"));
    }

    #[test]
    fn test_client_without_password_grant() {
        let issuer = issuer(AccessTokenType::Reference);
        let mut request = grant("S2", "pw123", None);
        request.client_id = "machine".to_string();

        let err = issuer.issue_token(&request).unwrap_err();
        assert!(matches!(err, IssuerError::UnsupportedGrantType { .. }));
    }

    #[test]
    fn test_bad_user_credentials() {
        let issuer = issuer(AccessTokenType::Reference);

        let err = issuer.issue_token(&grant("S1", "wrong", None)).unwrap_err();
        assert!(matches!(err, IssuerError::InvalidUserCredentials));

        let mut request = grant("S1", "pw123", None);
        request.username = "mallory".to_string();
        let err = issuer.issue_token(&request).unwrap_err();
        assert!(matches!(err, IssuerError::InvalidUserCredentials));
    }

    #[test]
    fn test_scope_outside_allowed_set() {
        let issuer = issuer(AccessTokenType::Reference);

        for scope in ["write", "read write", "unregistered"] {
            let err = issuer
                .issue_token(&grant("S1", "pw123", Some(scope)))
                .unwrap_err();
            assert!(matches!(err, IssuerError::InvalidScope(_)), "scope {scope}");
        }
        // Nothing was stored for the failed requests
        assert!(issuer.store.is_empty());
    }

    #[test]
    fn test_expired_tokens() {
        for token_type in [AccessTokenType::Reference, AccessTokenType::Jwt] {
            let issuer = issuer(token_type);
            let token = issuer.issue_token(&grant("S1", "pw123", None)).unwrap();

            let later = token.expires_at + Duration::seconds(1);
            let err = issuer.validate_token_at(&token.value, later).unwrap_err();
            assert!(matches!(err, IssuerError::TokenExpired), "{token_type:?}");

            // Exactly at expires_at is already expired
            let err = issuer
                .validate_token_at(&token.value, token.expires_at)
                .unwrap_err();
            assert!(matches!(err, IssuerError::TokenExpired));
        }
    }

    #[test]
    fn test_unknown_and_forged_tokens() {
        let issuer = issuer(AccessTokenType::Jwt);

        let err = issuer.validate_token("garbage").unwrap_err();
        assert!(matches!(err, IssuerError::TokenNotFound));

        let foreign = Issuer::new(
            registry(AccessTokenType::Jwt),
            SigningKey::generate(),
            ISSUER,
            Duration::hours(1),
        );
        let token = foreign.issue_token(&grant("S1", "pw123", None)).unwrap();
        let err = issuer.validate_token(&token.value).unwrap_err();
        assert!(matches!(err, IssuerError::InvalidSignature));
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let issuer = issuer(AccessTokenType::Reference);
        let token = issuer.issue_token(&grant("S1", "pw123", None)).unwrap();

        issuer.revoke_token(&token.value);
        let first = issuer.validate_token(&token.value).unwrap_err();
        issuer.revoke_token(&token.value);
        let second = issuer.validate_token(&token.value).unwrap_err();

        assert!(matches!(first, IssuerError::TokenNotFound));
        assert!(matches!(second, IssuerError::TokenNotFound));
    }

    #[test]
    fn test_revoke_for_other_client_is_ignored() {
        let issuer = issuer(AccessTokenType::Reference);
        let token = issuer.issue_token(&grant("S1", "pw123", None)).unwrap();

        issuer.revoke_token_for_client(&token.value, "machine");
        assert!(issuer.validate_token(&token.value).is_ok());

        issuer.revoke_token_for_client(&token.value, "C1");
        assert!(issuer.validate_token(&token.value).is_err());
    }

    #[test]
    fn test_introspect_checks_resource_scopes() {
        let issuer = issuer(AccessTokenType::Reference);
        let token = issuer.issue_token(&grant("S1", "pw123", None)).unwrap();

        let api = issuer.authenticate_api_resource("api", "api-secret").unwrap();
        assert!(issuer.introspect(api, &token.value).is_some());
        assert!(issuer.introspect(api, "garbage").is_none());

        let other = ApiResource::new("other", "x", ["write".to_string()]);
        assert!(issuer.introspect(&other, &token.value).is_none());

        assert!(matches!(
            issuer.authenticate_api_resource("api", "wrong"),
            Err(IssuerError::InvalidClientCredentials)
        ));
    }

    #[test]
    fn test_cleanup_expired() {
        let issuer = Issuer::new(
            registry(AccessTokenType::Reference),
            SigningKey::generate(),
            ISSUER,
            Duration::zero(),
        );
        issuer.issue_token(&grant("S1", "pw123", None)).unwrap();

        assert_eq!(issuer.cleanup_expired(), 1);
        assert_eq!(issuer.cleanup_expired(), 0);
    }
}
