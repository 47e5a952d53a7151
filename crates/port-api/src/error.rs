//! Errors surfaced to API callers

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing or malformed Authorization header")]
    MissingToken,

    /// Covers unknown, expired, revoked and forged tokens alike
    #[error("Invalid or expired token")]
    Unauthorized,

    #[error("Token lacks required scope: {0}")]
    InsufficientScope(String),

    #[error("Identity server unavailable")]
    IssuerUnavailable,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, challenge) = match &self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Bearer".to_string()),
            AuthError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Bearer error=\"invalid_token\"".to_string(),
            ),
            AuthError::InsufficientScope(scope) => (
                StatusCode::FORBIDDEN,
                format!("Bearer error=\"insufficient_scope\", scope=\"{}\"", scope),
            ),
            AuthError::IssuerUnavailable => {
                return (StatusCode::SERVICE_UNAVAILABLE, self.to_string()).into_response();
            }
        };

        (
            status,
            [(header::WWW_AUTHENTICATE, challenge)],
            self.to_string(),
        )
            .into_response()
    }
}
