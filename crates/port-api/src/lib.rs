//! port-api library: bearer authorization and the sample endpoints.
//!
//! Exposed as a library so the end-to-end tests can serve the same router
//! the binary does.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

pub use auth::{Claims, IntrospectionValidator, TokenValidator, authorize_request, require_scope};
pub use config::ApiConfig;
pub use error::AuthError;

/// Shared application state
pub struct AppState {
    pub validator: Arc<dyn TokenValidator>,
    pub required_scope: String,
}

impl AppState {
    /// State that validates tokens against the configured identity server
    pub fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        Ok(Self {
            validator: Arc::new(IntrospectionValidator::new(config)?),
            required_scope: config.required_scope.clone(),
        })
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/helloworld", get(routes::hello_world))
        .route("/whoami", get(routes::who_am_i))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
