//! Resource server configuration

use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

/// Static configuration, fixed at process start
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the identity server
    pub authority: Url,
    /// API resource name, used as the introspection username
    pub api_name: String,
    /// API resource secret
    pub api_secret: String,
    /// Scope a token needs to call `/helloworld`
    pub required_scope: String,
    /// Timeout for introspection calls
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(
        authority: &str,
        api_name: impl Into<String>,
        api_secret: impl Into<String>,
        required_scope: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            authority: parse_base_url(authority)?,
            api_name: api_name.into(),
            api_secret: api_secret.into(),
            required_scope: required_scope.into(),
            timeout: Duration::from_secs(10),
        })
    }

    pub fn introspection_endpoint(&self) -> Url {
        endpoint(&self.authority, "connect/introspect")
    }
}

/// Parse a base URL, making sure relative joins append to its path
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).with_context(|| format!("Invalid URL: {}", raw))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn endpoint(base: &Url, path: &str) -> Url {
    // `base` always ends in '/', so joining a relative path cannot fail
    base.join(path).unwrap_or_else(|_| base.clone())
}
