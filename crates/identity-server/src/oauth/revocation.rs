//! RFC 7009: OAuth 2.0 Token Revocation

use std::sync::Arc;

use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::AppState;
use crate::oauth::{client_credentials, error_response, invalid_form};

#[derive(Debug, Deserialize)]
pub struct RevocationRequest {
    pub token: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Handler for `POST /connect/revocation`
///
/// Responds 200 for any authenticated client, whether or not the token
/// existed or belonged to it.
pub async fn handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<RevocationRequest>, FormRejection>,
) -> Response {
    let request = match form {
        Ok(Form(request)) => request,
        Err(rejection) => return invalid_form(rejection),
    };

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

    let client = match state.issuer.authenticate_client(&client_id, &client_secret) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("Revocation by {} rejected: {}", client_id, e);
            return e.into_response();
        }
    };

    state
        .issuer
        .revoke_token_for_client(&request.token, &client.client_id);
    StatusCode::OK.into_response()
}
