//! OpenID Connect Discovery metadata
//!
//! Provides the `/.well-known/openid-configuration` endpoint that clients
//! and API resources use to find the issuer's endpoints.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DiscoveryDocument {
    /// The issuer identifier (URL)
    pub issuer: String,

    /// URL of the token endpoint
    pub token_endpoint: String,

    /// URL of the introspection endpoint
    pub introspection_endpoint: String,

    /// URL of the revocation endpoint
    pub revocation_endpoint: String,

    /// Registered scope names
    pub scopes_supported: Vec<String>,

    /// JSON array of OAuth 2.0 grant_type values supported
    pub grant_types_supported: Vec<String>,

    /// Client authentication methods supported at the token endpoint
    pub token_endpoint_auth_methods_supported: Vec<String>,
}

/// Handler for `GET /.well-known/openid-configuration`
pub async fn handler(State(state): State<Arc<AppState>>) -> Json<DiscoveryDocument> {
    let base_url = state.public_url.trim_end_matches('/');

    let document = DiscoveryDocument {
        issuer: state.issuer.issuer_url().to_string(),
        token_endpoint: format!("{}/connect/token", base_url),
        introspection_endpoint: format!("{}/connect/introspect", base_url),
        revocation_endpoint: format!("{}/connect/revocation", base_url),
        scopes_supported: state.issuer.registry().scope_names(),
        grant_types_supported: vec!["password".to_string()],
        token_endpoint_auth_methods_supported: vec![
            "client_secret_post".to_string(),
            "client_secret_basic".to_string(),
        ],
    };

    tracing::debug!("Serving discovery document");
    Json(document)
}
