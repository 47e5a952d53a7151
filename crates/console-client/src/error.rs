//! Errors surfaced by the token and API clients

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The identity server answered with an OAuth error body
    #[error(
        "{error}: {}",
        .error_description.as_deref().unwrap_or("no description")
    )]
    TokenRequest {
        error: String,
        error_description: Option<String>,
    },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Unexpected response status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Connection failures and timeouts; worth retrying, unlike the rest
    #[error("Network error: {0}")]
    TransientNetwork(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::TransientNetwork(_))
    }

    /// The OAuth error code, if this is a token request error
    pub fn oauth_error(&self) -> Option<&str> {
        match self {
            ClientError::TokenRequest { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::InvalidResponse(e.to_string())
        } else {
            ClientError::TransientNetwork(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_request_display() {
        let err = ClientError::TokenRequest {
            error: "invalid_scope".to_string(),
            error_description: Some("Invalid scope: write".to_string()),
        };
        assert_eq!(err.to_string(), "invalid_scope: Invalid scope: write");
        assert_eq!(err.oauth_error(), Some("invalid_scope"));
        assert!(!err.is_transient());

        let err = ClientError::TokenRequest {
            error: "invalid_grant".to_string(),
            error_description: None,
        };
        assert_eq!(err.to_string(), "invalid_grant: no description");
    }
}
