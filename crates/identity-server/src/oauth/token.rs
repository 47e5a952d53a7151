//! OAuth 2.0 Token Endpoint
//!
//! Handles the resource owner password credentials grant. Client
//! credentials may arrive in the form body or as HTTP Basic.

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::issuer::PasswordGrant;
use crate::oauth::{client_credentials, error_response, invalid_form};

/// Token request (form-encoded)
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    /// Grant type: only "password" is supported
    #[serde(default)]
    pub grant_type: Option<String>,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Space-separated scopes
    #[serde(default)]
    pub scope: Option<String>,
}

/// Successful token response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub scope: String,
}

/// Handler for `POST /connect/token`
pub async fn handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Response {
    let request = match form {
        Ok(Form(request)) => request,
        Err(rejection) => return invalid_form(rejection),
    };

    match request.grant_type.as_deref() {
        Some("password") => {}
        Some(other) => {
            tracing::debug!("Rejected grant_type {}", other);
            return error_response(
                StatusCode::BAD_REQUEST,
                "unsupported_grant_type",
                "Only the password grant is supported",
            );
        }
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "grant_type is required",
            );
        }
    }

    let Some((client_id, client_secret)) = client_credentials(
        &headers,
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    ) else {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "invalid_client",
            "Client authentication is required",
        );
    };

    let (Some(username), Some(password)) = (request.username, request.password) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "username and password are required",
        );
    };

    let grant = PasswordGrant {
        client_id,
        client_secret,
        username,
        password,
        scope: request.scope,
    };

    match state.issuer.issue_token(&grant) {
        Ok(token) => {
            tracing::info!(
                "Issued {:?} access token for client {} (subject {}, scope \"{}\")",
                token.token_type,
                token.client_id,
                token.subject_id,
                token.scope()
            );
            (
                StatusCode::OK,
                [(header::CACHE_CONTROL, "no-store")],
                Json(TokenResponse {
                    expires_in: token.expires_in(),
                    scope: token.scope(),
                    access_token: token.value,
                    token_type: "Bearer".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!("Token request from client {} rejected: {}", grant.client_id, e);
            e.into_response()
        }
    }
}
