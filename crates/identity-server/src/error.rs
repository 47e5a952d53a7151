//! Issuer error taxonomy

use thiserror::Error;

/// Broad class of an issuer failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Unknown client, bad secret, grant not allowed
    Client,
    /// Bad resource owner credentials
    User,
    /// Requested scope not allowed
    Scope,
    /// Token not found, expired or forged
    Token,
    /// Failure on our side
    Server,
}

#[derive(Debug, Error)]
pub enum IssuerError {
    #[error("Unknown client: {0}")]
    UnknownClient(String),

    #[error("Invalid client credentials")]
    InvalidClientCredentials,

    #[error("Client {client_id} is not allowed to use the {grant_type} grant")]
    UnsupportedGrantType {
        client_id: String,
        grant_type: &'static str,
    },

    #[error("Invalid username or password")]
    InvalidUserCredentials,

    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Token not found")]
    TokenNotFound,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

impl IssuerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            IssuerError::UnknownClient(_)
            | IssuerError::InvalidClientCredentials
            | IssuerError::UnsupportedGrantType { .. } => ErrorCategory::Client,
            IssuerError::InvalidUserCredentials => ErrorCategory::User,
            IssuerError::InvalidScope(_) => ErrorCategory::Scope,
            IssuerError::TokenNotFound
            | IssuerError::TokenExpired
            | IssuerError::InvalidSignature => ErrorCategory::Token,
            IssuerError::Signing(_) => ErrorCategory::Server,
        }
    }

    /// RFC 6749 section 5.2 error code for the token endpoint
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            IssuerError::UnknownClient(_) | IssuerError::InvalidClientCredentials => {
                "invalid_client"
            }
            IssuerError::UnsupportedGrantType { .. } => "unauthorized_client",
            IssuerError::InvalidUserCredentials => "invalid_grant",
            IssuerError::InvalidScope(_) => "invalid_scope",
            IssuerError::TokenNotFound
            | IssuerError::TokenExpired
            | IssuerError::InvalidSignature => "invalid_token",
            IssuerError::Signing(_) => "server_error",
        }
    }
}
