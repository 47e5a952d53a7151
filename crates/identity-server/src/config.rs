//! Configuration loading and management
//!
//! Everything the issuer knows about clients, scopes, API resources and users
//! comes from one `IssuerConfig` value loaded at startup. There is no runtime
//! reconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::registry::{AccessTokenType, GrantType, UserClaim};

/// Longest access token lifetime we accept (one year)
const MAX_ACCESS_TOKEN_LIFETIME_SECS: u64 = 365 * 24 * 3600;

/// Main configuration for the identity server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// Scopes that clients may request
    #[serde(default)]
    pub scopes: Vec<ScopeConfig>,

    /// Protected backends allowed to introspect tokens
    #[serde(default)]
    pub api_resources: Vec<ApiResourceConfig>,

    /// OAuth clients
    #[serde(default)]
    pub clients: Vec<ClientConfig>,

    /// Resource owners
    #[serde(default)]
    pub users: Vec<UserConfig>,

    /// Token configuration
    #[serde(default)]
    pub tokens: TokenConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResourceConfig {
    pub name: String,
    /// Shared secret used for HTTP Basic authentication at the introspection endpoint
    pub secret: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_grant_types")]
    pub allowed_grant_types: Vec<GrantType>,
    pub allowed_scopes: Vec<String>,
    /// Whether access tokens are opaque references or self-contained JWTs
    #[serde(default)]
    pub token_type: AccessTokenType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub subject_id: String,
    pub username: String,
    /// Cleartext password, hashed with Argon2id at registration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Pre-computed Argon2 PHC hash (takes precedence over `password`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub claims: Vec<UserClaim>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Access token lifetime in seconds (default: 1 hour)
    #[serde(default = "default_access_token_lifetime")]
    pub access_token_lifetime_secs: u64,

    /// How often expired reference tokens are swept (default: 5 minutes)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,

    /// JWT signing secret (32+ bytes, base64-encoded)
    /// If not set, a random key is generated at startup (JWTs won't survive restarts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<String>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime_secs: default_access_token_lifetime(),
            cleanup_interval_secs: default_cleanup_interval(),
            signing_key: None,
        }
    }
}

impl TokenConfig {
    /// Access token lifetime, clamped to one year
    pub fn access_token_lifetime(&self) -> chrono::Duration {
        let secs = self
            .access_token_lifetime_secs
            .min(MAX_ACCESS_TOKEN_LIFETIME_SECS);
        chrono::Duration::seconds(secs as i64)
    }
}

fn default_access_token_lifetime() -> u64 {
    3600 // 1 hour
}

fn default_cleanup_interval() -> u64 {
    300 // 5 minutes
}

fn default_grant_types() -> Vec<GrantType> {
    vec![GrantType::Password]
}

impl Default for IssuerConfig {
    /// The sample setup: one API with read/write scopes, one password-grant
    /// client allowed to read, and one test user.
    fn default() -> Self {
        Self {
            scopes: vec![
                ScopeConfig {
                    name: "api.read".to_string(),
                    display_name: "Read access to the port API".to_string(),
                },
                ScopeConfig {
                    name: "api.write".to_string(),
                    display_name: "Write access to the port API".to_string(),
                },
            ],
            api_resources: vec![ApiResourceConfig {
                name: "port-api".to_string(),
                secret: "port-api-secret".to_string(),
                scopes: vec!["api.read".to_string(), "api.write".to_string()],
            }],
            clients: vec![ClientConfig {
                client_id: "console-client".to_string(),
                client_secret: "console-client-secret".to_string(),
                allowed_grant_types: default_grant_types(),
                allowed_scopes: vec!["api.read".to_string()],
                token_type: AccessTokenType::Reference,
            }],
            users: vec![UserConfig {
                subject_id: "1".to_string(),
                username: "alice".to_string(),
                password: Some("pw123".to_string()),
                password_hash: None,
                claims: vec![
                    UserClaim::new("name", "Alice Smith"),
                    UserClaim::new("given_name", "Alice"),
                    UserClaim::new("family_name", "Smith"),
                    UserClaim::new("website", "https://alice.example.com/"),
                ],
            }],
            tokens: TokenConfig::default(),
        }
    }
}

impl IssuerConfig {
    /// Load configuration from the config directory
    pub fn load(config_path: &str) -> Result<Self> {
        let config_file = Path::new(config_path).join("config.json");

        if config_file.exists() {
            let content = std::fs::read_to_string(&config_file)
                .with_context(|| format!("Failed to read config file: {:?}", config_file))?;
            let config: IssuerConfig =
                serde_json::from_str(&content).with_context(|| "Failed to parse config.json")?;
            tracing::info!("Loaded configuration from {:?}", config_file);
            Ok(config)
        } else {
            tracing::info!(
                "No config file found at {:?}, using the sample configuration",
                config_file
            );
            let config = IssuerConfig::default();

            std::fs::create_dir_all(config_path)
                .with_context(|| format!("Failed to create config directory: {}", config_path))?;

            // Write default config for reference
            let content = serde_json::to_string_pretty(&config)?;
            std::fs::write(&config_file, content)
                .with_context(|| format!("Failed to write default config: {:?}", config_file))?;
            tracing::info!("Created default config at {:?}", config_file);

            Ok(config)
        }
    }
}
