//! RFC 7662: OAuth 2.0 Token Introspection
//!
//! Called by API resources to validate bearer tokens. The resource
//! authenticates with its name and secret over HTTP Basic. Any token the
//! resource may not accept comes back as `{"active": false}` with no hint
//! as to why.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::issuer::Claims;
use crate::oauth::{basic_credentials, error_response, invalid_form};
use crate::registry::AccessTokenType;

#[derive(Debug, Deserialize)]
pub struct IntrospectionRequest {
    pub token: String,
}

#[derive(Debug, Default, Serialize)]
pub struct IntrospectionResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<AccessTokenType>,
    /// User claims, flattened into the top-level object
    #[serde(flatten)]
    pub claims: BTreeMap<String, String>,
}

impl IntrospectionResponse {
    fn inactive() -> Self {
        Self::default()
    }

    fn active(claims: Claims, issuer: &str) -> Self {
        let scope = claims.scope();
        Self {
            active: true,
            sub: Some(claims.subject_id),
            client_id: Some(claims.client_id),
            scope: Some(scope),
            iat: Some(claims.issued_at.timestamp()),
            exp: Some(claims.expires_at.timestamp()),
            iss: Some(issuer.to_string()),
            token_type: Some(claims.token_type),
            // Registered claims win over user claims with the same name
            claims: claims
                .user_claims
                .into_iter()
                .filter(|c| !RESERVED.contains(&c.claim_type.as_str()))
                .map(|c| (c.claim_type, c.value))
                .collect(),
        }
    }
}

const RESERVED: &[&str] = &[
    "active", "sub", "client_id", "scope", "iat", "exp", "iss", "token_type",
];

/// Handler for `POST /connect/introspect`
pub async fn handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<IntrospectionRequest>, FormRejection>,
) -> Response {
    let Some((name, secret)) = basic_credentials(&headers) else {
        tracing::debug!("Introspection request without Basic credentials");
        return unauthorized();
    };

    let request = match form {
        Ok(Form(request)) => request,
        Err(rejection) => return invalid_form(rejection),
    };

    let resource = match state.issuer.authenticate_api_resource(&name, &secret) {
        Ok(resource) => resource,
        Err(e) => {
            tracing::warn!("Introspection by {} rejected: {}", name, e);
            return unauthorized();
        }
    };

    let response = match state.issuer.introspect(resource, &request.token) {
        Some(claims) => {
            tracing::debug!(
                "Token for subject {} active for {}",
                claims.subject_id,
                resource.name
            );
            IntrospectionResponse::active(claims, state.issuer.issuer_url())
        }
        None => IntrospectionResponse::inactive(),
    };

    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, "no-store")],
        Json(response),
    )
        .into_response()
}

fn unauthorized() -> Response {
    let mut response = error_response(
        StatusCode::UNAUTHORIZED,
        "invalid_client",
        "API resource authentication failed",
    );
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        header::HeaderValue::from_static("Basic"),
    );
    response
}
