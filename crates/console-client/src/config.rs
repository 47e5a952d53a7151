//! Client configuration

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use url::Url;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the identity server
    pub authority: Url,
    /// Base URL of the sample API
    pub api_url: Url,
    pub client_id: String,
    pub client_secret: String,
    /// Space-separated scopes to request
    pub scope: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        authority: &str,
        api_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            authority: parse_base_url(authority)?,
            api_url: parse_base_url(api_url)?,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: scope.into(),
            timeout: Duration::from_secs(10),
        })
    }

    pub fn token_endpoint(&self) -> Url {
        join(&self.authority, "connect/token")
    }

    /// The scope-protected sample endpoint
    pub fn protected_resource(&self) -> Url {
        join(&self.api_url, "helloworld")
    }
}

/// Parse `raw` as a directory-style URL so endpoint paths join under it
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).with_context(|| format!("Invalid URL: {}", raw))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("{} cannot be used as a base URL", raw))?
        .pop_if_empty()
        .push("");
    Ok(url)
}

fn join(base: &Url, path: &str) -> Url {
    base.join(path).unwrap_or_else(|_| base.clone())
}
