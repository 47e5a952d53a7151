//! OAuth 2.0 endpoints
//!
//! Implements:
//! - RFC 6749 section 4.3: Resource Owner Password Credentials grant
//! - RFC 7662: Token Introspection
//! - RFC 7009: Token Revocation
//! - OpenID Connect Discovery (metadata document only)

pub mod discovery;
pub mod introspect;
pub mod revocation;
pub mod token;

use axum::{
    Json,
    extract::rejection::FormRejection,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::Engine;
use percent_encoding::percent_decode_str;
use serde::Serialize;

use crate::error::IssuerError;

/// OAuth error response body (RFC 6749 section 5.2)
#[derive(Debug, Serialize)]
pub struct OAuthError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// Build an error response with the given status and error code
pub fn error_response(status: StatusCode, error: &str, description: impl Into<String>) -> Response {
    (
        status,
        [(header::CACHE_CONTROL, "no-store")],
        Json(OAuthError {
            error: error.to_string(),
            error_description: Some(description.into()),
        }),
    )
        .into_response()
}

/// `invalid_request` for a form body that did not deserialize
pub fn invalid_form(rejection: FormRejection) -> Response {
    tracing::debug!("Rejected form body: {}", rejection.body_text());
    error_response(
        StatusCode::BAD_REQUEST,
        "invalid_request",
        rejection.body_text(),
    )
}

impl IntoResponse for IssuerError {
    fn into_response(self) -> Response {
        let status = match &self {
            IssuerError::UnknownClient(_) | IssuerError::InvalidClientCredentials => {
                StatusCode::UNAUTHORIZED
            }
            IssuerError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        // Never tell the caller which client ids exist
        let description = match &self {
            IssuerError::UnknownClient(_) => IssuerError::InvalidClientCredentials.to_string(),
            IssuerError::Signing(_) => "Failed to generate token".to_string(),
            other => other.to_string(),
        };
        error_response(status, self.oauth_error_code(), description)
    }
}

/// Credentials from an `Authorization: Basic` header (RFC 6749 section 2.3.1)
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?.trim();
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    Some((form_decode(id)?, form_decode(secret)?))
}

/// Undo `application/x-www-form-urlencoded` escaping of a Basic credential
fn form_decode(value: &str) -> Option<String> {
    let value = value.replace('+', " ");
    percent_decode_str(&value)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Client credentials from the Basic header, falling back to form fields
pub fn client_credentials(
    headers: &HeaderMap,
    client_id: Option<&str>,
    client_secret: Option<&str>,
) -> Option<(String, String)> {
    basic_credentials(headers).or_else(|| {
        Some((
            client_id?.to_string(),
            client_secret.unwrap_or_default().to_string(),
        ))
    })
}
