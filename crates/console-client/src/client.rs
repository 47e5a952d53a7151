//! HTTP clients for the identity server and the sample API

use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Successful token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Requests tokens from the identity server with the password grant
pub struct TokenClient {
    http: reqwest::Client,
    endpoint: Url,
    client_id: String,
    client_secret: String,
    scope: String,
}

impl TokenClient {
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: http_client(config.timeout)?,
            endpoint: config.token_endpoint(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
        })
    }

    /// Override the scopes requested by `login`
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AccessToken, ClientError> {
        tracing::debug!("Requesting token for {} from {}", username, self.endpoint);

        let mut params = vec![
            ("grant_type", "password"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("username", username),
            ("password", password),
        ];
        if !self.scope.is_empty() {
            params.push(("scope", self.scope.as_str()));
        }

        let response = self
            .http
            .post(self.endpoint.clone())
            .form(&params)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        // An error-shaped body wins over the status code
        if let Ok(err) = serde_json::from_str::<TokenErrorResponse>(&body) {
            tracing::debug!("Token request rejected: {}", err.error);
            return Err(ClientError::TokenRequest {
                error: err.error,
                error_description: err.error_description,
            });
        }

        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

/// Calls bearer-protected endpoints
pub struct ApiClient {
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
        })
    }

    pub async fn call_protected_resource(
        &self,
        access_token: &str,
        url: &Url,
    ) -> Result<String, ClientError> {
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(url.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
            StatusCode::FORBIDDEN => Err(ClientError::Forbidden),
            status if status.is_success() => Ok(response.text().await?),
            status => Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}
