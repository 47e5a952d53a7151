//! HTTP endpoints of the sample API

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
};

use crate::AppState;
use crate::auth::{Claims, authorize_request, require_scope};
use crate::error::AuthError;

/// Handler for `GET /health`, open to anyone
pub async fn health() -> &'static str {
    "OK"
}

/// Handler for `GET /helloworld`: needs a valid token with the required scope
pub async fn hello_world(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<&'static str, AuthError> {
    let claims = authorize_request(&headers, state.validator.as_ref()).await?;
    require_scope(&claims, &state.required_scope)?;
    Ok("Hello, sup homie.")
}

/// Handler for `GET /whoami`: any valid token, echoes its claims
pub async fn who_am_i(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Claims>, AuthError> {
    let claims = authorize_request(&headers, state.validator.as_ref()).await?;
    Ok(Json(claims))
}
