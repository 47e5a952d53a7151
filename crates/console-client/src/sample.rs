//! The sample flow: prove the API is protected, log in, call it.

use url::Url;

use crate::client::{ApiClient, TokenClient};
use crate::error::ClientError;

/// Bearer value sent before logging in; the API must refuse it
pub const INVALID_TOKEN: &str = "invalid-token";

#[derive(Debug)]
pub enum SampleOutcome {
    /// The API accepted a bogus token
    NotProtected { body: String },
    /// The protection check failed for some reason other than a 401
    ProtectionCheckFailed(ClientError),
    LoginFailed(ClientError),
    CallFailed {
        access_token: String,
        error: ClientError,
    },
    Success { access_token: String, body: String },
}

impl SampleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SampleOutcome::Success { .. })
    }
}

pub async fn run_sample(
    tokens: &TokenClient,
    api: &ApiClient,
    resource: &Url,
    username: &str,
    password: &str,
) -> SampleOutcome {
    match api.call_protected_resource(INVALID_TOKEN, resource).await {
        Err(ClientError::Unauthorized) => {
            tracing::debug!("Unauthenticated call refused as expected");
        }
        Ok(body) => return SampleOutcome::NotProtected { body },
        Err(e) => return SampleOutcome::ProtectionCheckFailed(e),
    }

    let token = match tokens.login(username, password).await {
        Ok(token) => token,
        Err(e) => return SampleOutcome::LoginFailed(e),
    };

    match api
        .call_protected_resource(&token.access_token, resource)
        .await
    {
        Ok(body) => SampleOutcome::Success {
            access_token: token.access_token,
            body,
        },
        Err(error) => SampleOutcome::CallFailed {
            access_token: token.access_token,
            error,
        },
    }
}
