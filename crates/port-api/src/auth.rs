//! Bearer token authorization
//!
//! Tokens are checked by asking the identity server (RFC 7662
//! introspection), which handles reference tokens and JWTs alike. Every
//! reason a token is refused collapses into `AuthError::Unauthorized`.

use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::ApiConfig;
use crate::error::AuthError;

/// Claims of an active token, as reported by introspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub client_id: String,
    /// Space-separated scope list
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub exp: Option<i64>,
    /// User claims and any other introspection fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Claims {
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.split_whitespace()
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().any(|s| s == scope)
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    /// Not found, expired, revoked or forged; the issuer does not say which
    #[error("Token is not active")]
    Inactive,

    #[error("Introspection failed: {0}")]
    Unavailable(String),
}

/// Something that can turn a bearer token into claims
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<Claims, ValidationError>;
}

/// Validates tokens against the identity server's introspection endpoint
pub struct IntrospectionValidator {
    http: reqwest::Client,
    endpoint: Url,
    api_name: String,
    api_secret: String,
}

impl IntrospectionValidator {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build introspection HTTP client")?;
        Ok(Self {
            http,
            endpoint: config.introspection_endpoint(),
            api_name: config.api_name.clone(),
            api_secret: config.api_secret.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    active: bool,
    #[serde(flatten)]
    fields: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
impl TokenValidator for IntrospectionValidator {
    async fn validate(&self, token: &str) -> Result<Claims, ValidationError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .basic_auth(&self.api_name, Some(&self.api_secret))
            .form(&[("token", token), ("token_type_hint", "access_token")])
            .send()
            .await
            .map_err(|e| ValidationError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ValidationError::Unavailable(format!(
                "introspection returned {}",
                response.status()
            )));
        }

        let body: IntrospectionResponse = response
            .json()
            .await
            .map_err(|e| ValidationError::Unavailable(format!("bad introspection body: {e}")))?;

        if !body.active {
            return Err(ValidationError::Inactive);
        }

        serde_json::from_value(serde_json::Value::Object(body.fields))
            .map_err(|e| ValidationError::Unavailable(format!("bad introspection claims: {e}")))
    }
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Authenticate a request by its bearer token
pub async fn authorize_request(
    headers: &HeaderMap,
    validator: &dyn TokenValidator,
) -> Result<Claims, AuthError> {
    let Some(token) = bearer_token(headers) else {
        tracing::debug!("No usable bearer token on request");
        return Err(AuthError::MissingToken);
    };

    match validator.validate(token).await {
        Ok(claims) => {
            tracing::debug!(
                "Request authenticated for subject {} via client {}",
                claims.sub,
                claims.client_id
            );
            Ok(claims)
        }
        Err(ValidationError::Inactive) => {
            tracing::debug!("Invalid or expired token");
            Err(AuthError::Unauthorized)
        }
        Err(ValidationError::Unavailable(reason)) => {
            tracing::error!("Token validation failed: {}", reason);
            Err(AuthError::IssuerUnavailable)
        }
    }
}

/// Check that validated claims include `scope`
pub fn require_scope(claims: &Claims, scope: &str) -> Result<(), AuthError> {
    if claims.has_scope(scope) {
        Ok(())
    } else {
        tracing::debug!("Subject {} lacks scope {}", claims.sub, scope);
        Err(AuthError::InsufficientScope(scope.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::http::HeaderValue;

    /// Accepts exactly one token value
    pub(crate) struct StaticValidator {
        pub token: &'static str,
        pub scope: &'static str,
    }

    #[async_trait]
    impl TokenValidator for StaticValidator {
        async fn validate(&self, token: &str) -> Result<Claims, ValidationError> {
            match token {
                "down" => Err(ValidationError::Unavailable("connection refused".into())),
                t if t == self.token => Ok(Claims {
                    sub: "1".to_string(),
                    client_id: "C1".to_string(),
                    scope: self.scope.to_string(),
                    exp: None,
                    extra: BTreeMap::new(),
                }),
                _ => Err(ValidationError::Inactive),
            }
        }
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Bearer  abc ")), Some("abc"));
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_authorize_request() {
        let validator = StaticValidator {
            token: "good",
            scope: "read",
        };

        let claims = authorize_request(&headers("Bearer good"), &validator)
            .await
            .unwrap();
        assert_eq!(claims.sub, "1");

        assert_eq!(
            authorize_request(&HeaderMap::new(), &validator).await,
            Err(AuthError::MissingToken)
        );
        assert_eq!(
            authorize_request(&headers("Bearer garbage"), &validator).await,
            Err(AuthError::Unauthorized)
        );
        assert_eq!(
            authorize_request(&headers("Bearer down"), &validator).await,
            Err(AuthError::IssuerUnavailable)
        );
    }

    #[test]
    fn test_require_scope() {
        let claims = Claims {
            sub: "1".to_string(),
            client_id: "C1".to_string(),
            scope: "api.read profile".to_string(),
            exp: None,
            extra: BTreeMap::new(),
        };

        assert!(require_scope(&claims, "api.read").is_ok());
        assert!(require_scope(&claims, "profile").is_ok());
        assert_eq!(
            require_scope(&claims, "api.write"),
            Err(AuthError::InsufficientScope("api.write".to_string()))
        );
        // Whole-word match only
        assert!(require_scope(&claims, "api").is_err());
    }

    #[test]
    fn test_claims_from_introspection_fields() {
        let json = serde_json::json!({
            "sub": "1",
            "client_id": "console-client",
            "scope": "api.read",
            "exp": 1_700_000_000,
            "name": "Alice Smith"
        });
        let claims: Claims = serde_json::from_value(json).unwrap();
        assert!(claims.has_scope("api.read"));
        assert_eq!(claims.extra["name"], "Alice Smith");
    }
}
