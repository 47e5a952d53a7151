//! identity-server library: the issuer core plus its HTTP surface.
//!
//! The binary in `main.rs` is a thin wrapper that loads configuration and
//! serves `router()`. Integration tests use the same entry points.

pub mod config;
pub mod error;
pub mod issuer;
pub mod oauth;
pub mod password;
pub mod registry;
pub mod signing;
pub mod storage;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use config::IssuerConfig;
pub use error::{ErrorCategory, IssuerError};
pub use issuer::{Claims, IssuedToken, Issuer, PasswordGrant};
pub use registry::{AccessTokenType, GrantType, Registry, RegistryError, UserClaim};

/// Shared application state
pub struct AppState {
    pub issuer: Issuer,
    pub public_url: String,
}

/// Build the issuer's HTTP router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/.well-known/openid-configuration",
            get(oauth::discovery::handler),
        )
        .route("/connect/token", post(oauth::token::handler))
        .route("/connect/introspect", post(oauth::introspect::handler))
        .route("/connect/revocation", post(oauth::revocation::handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
