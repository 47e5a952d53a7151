//! Static registry of clients, scopes, API resources and users
//!
//! Built once from `IssuerConfig` at startup and read-only afterwards.
//! Secrets are hashed on the way in; nothing in here holds a cleartext
//! credential.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::IssuerConfig;
use crate::password::{hash_password, is_valid_hash, verify_password};
use crate::storage::hash_token;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate {kind}: {key}")]
    DuplicateKey { kind: &'static str, key: String },

    #[error("{owner} references unknown scope: {scope}")]
    UnknownScope { owner: String, scope: String },

    #[error("User {0} has no password or password hash")]
    MissingPassword(String),

    #[error("Invalid password hash for user {0}")]
    InvalidPasswordHash(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

/// OAuth2 grant types a client can be allowed to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Resource owner password credentials
    Password,
    /// Client credentials (accepted in configuration, not issued by this server)
    ClientCredentials,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::Password => "password",
            GrantType::ClientCredentials => "client_credentials",
        }
    }
}

/// How access tokens for a client are represented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTokenType {
    /// Opaque random value looked up in the issuer's token table
    #[default]
    Reference,
    /// Signed JWT carrying its own claims
    Jwt,
}

/// A single `(type, value)` claim about a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaim {
    #[serde(rename = "type")]
    pub claim_type: String,
    pub value: String,
}

impl UserClaim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct Client {
    pub client_id: String,
    secret_hash: String,
    pub allowed_grant_types: BTreeSet<GrantType>,
    pub allowed_scopes: BTreeSet<String>,
    pub token_type: AccessTokenType,
}

impl Client {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: &str,
        allowed_grant_types: impl IntoIterator<Item = GrantType>,
        allowed_scopes: impl IntoIterator<Item = String>,
        token_type: AccessTokenType,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            secret_hash: hash_token(client_secret),
            allowed_grant_types: allowed_grant_types.into_iter().collect(),
            allowed_scopes: allowed_scopes.into_iter().collect(),
            token_type,
        }
    }

    pub fn verify_secret(&self, secret: &str) -> bool {
        hash_token(secret) == self.secret_hash
    }

    pub fn allows_grant(&self, grant: GrantType) -> bool {
        self.allowed_grant_types.contains(&grant)
    }
}

#[derive(Debug, Clone)]
pub struct ApiResource {
    pub name: String,
    secret_hash: String,
    pub scopes: BTreeSet<String>,
}

impl ApiResource {
    pub fn new(
        name: impl Into<String>,
        secret: &str,
        scopes: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            name: name.into(),
            secret_hash: hash_token(secret),
            scopes: scopes.into_iter().collect(),
        }
    }

    pub fn verify_secret(&self, secret: &str) -> bool {
        hash_token(secret) == self.secret_hash
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub subject_id: String,
    pub username: String,
    password_hash: String,
    pub claims: Vec<UserClaim>,
}

impl User {
    /// Create a user from a cleartext password, hashing it with Argon2id
    pub fn with_password(
        subject_id: impl Into<String>,
        username: impl Into<String>,
        password: &str,
        claims: Vec<UserClaim>,
    ) -> Result<Self, RegistryError> {
        let password_hash =
            hash_password(password).map_err(|e| RegistryError::PasswordHash(e.to_string()))?;
        Ok(Self {
            subject_id: subject_id.into(),
            username: username.into(),
            password_hash,
            claims,
        })
    }

    /// Create a user from an existing Argon2 PHC hash
    pub fn with_password_hash(
        subject_id: impl Into<String>,
        username: impl Into<String>,
        password_hash: impl Into<String>,
        claims: Vec<UserClaim>,
    ) -> Result<Self, RegistryError> {
        let username = username.into();
        let password_hash = password_hash.into();
        if !is_valid_hash(&password_hash) {
            return Err(RegistryError::InvalidPasswordHash(username));
        }
        Ok(Self {
            subject_id: subject_id.into(),
            username,
            password_hash,
            claims,
        })
    }

    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }
}

/// In-memory lookup tables for everything the issuer knows about
#[derive(Debug, Default)]
pub struct Registry {
    scopes: HashMap<String, Scope>,
    api_resources: HashMap<String, ApiResource>,
    clients: HashMap<String, Client>,
    /// Keyed by username
    users: HashMap<String, User>,
    /// subject_id -> username
    subjects: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configuration.
    ///
    /// Scopes are registered first so clients and resources can reference them.
    pub fn from_config(config: &IssuerConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::new();

        for scope in &config.scopes {
            registry.register_scope(Scope {
                name: scope.name.clone(),
                display_name: scope.display_name.clone(),
            })?;
        }

        for resource in &config.api_resources {
            registry.register_api_resource(ApiResource::new(
                resource.name.clone(),
                &resource.secret,
                resource.scopes.iter().cloned(),
            ))?;
        }

        for client in &config.clients {
            registry.register_client(Client::new(
                client.client_id.clone(),
                &client.client_secret,
                client.allowed_grant_types.iter().copied(),
                client.allowed_scopes.iter().cloned(),
                client.token_type,
            ))?;
        }

        for user in &config.users {
            let claims = user.claims.clone();
            let user = match (&user.password_hash, &user.password) {
                (Some(hash), _) => User::with_password_hash(
                    user.subject_id.clone(),
                    user.username.clone(),
                    hash.clone(),
                    claims,
                )?,
                (None, Some(password)) => User::with_password(
                    user.subject_id.clone(),
                    user.username.clone(),
                    password,
                    claims,
                )?,
                (None, None) => return Err(RegistryError::MissingPassword(user.username.clone())),
            };
            registry.register_user(user)?;
        }

        tracing::info!(
            "Registry loaded: {} scope(s), {} API resource(s), {} client(s), {} user(s)",
            registry.scopes.len(),
            registry.api_resources.len(),
            registry.clients.len(),
            registry.users.len()
        );

        Ok(registry)
    }

    pub fn register_scope(&mut self, scope: Scope) -> Result<(), RegistryError> {
        if self.scopes.contains_key(&scope.name) {
            return Err(RegistryError::DuplicateKey {
                kind: "scope",
                key: scope.name,
            });
        }
        self.scopes.insert(scope.name.clone(), scope);
        Ok(())
    }

    pub fn register_api_resource(&mut self, resource: ApiResource) -> Result<(), RegistryError> {
        if self.api_resources.contains_key(&resource.name) {
            return Err(RegistryError::DuplicateKey {
                kind: "API resource",
                key: resource.name,
            });
        }
        self.check_scopes(&resource.name, &resource.scopes)?;
        self.api_resources.insert(resource.name.clone(), resource);
        Ok(())
    }

    pub fn register_client(&mut self, client: Client) -> Result<(), RegistryError> {
        if self.clients.contains_key(&client.client_id) {
            return Err(RegistryError::DuplicateKey {
                kind: "client",
                key: client.client_id,
            });
        }
        self.check_scopes(&client.client_id, &client.allowed_scopes)?;
        self.clients.insert(client.client_id.clone(), client);
        Ok(())
    }

    pub fn register_user(&mut self, user: User) -> Result<(), RegistryError> {
        if self.users.contains_key(&user.username) {
            return Err(RegistryError::DuplicateKey {
                kind: "username",
                key: user.username,
            });
        }
        if self.subjects.contains_key(&user.subject_id) {
            return Err(RegistryError::DuplicateKey {
                kind: "subject id",
                key: user.subject_id,
            });
        }
        self.subjects
            .insert(user.subject_id.clone(), user.username.clone());
        self.users.insert(user.username.clone(), user);
        Ok(())
    }

    fn check_scopes(&self, owner: &str, scopes: &BTreeSet<String>) -> Result<(), RegistryError> {
        match scopes.iter().find(|s| !self.scopes.contains_key(*s)) {
            Some(scope) => Err(RegistryError::UnknownScope {
                owner: owner.to_string(),
                scope: scope.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn client(&self, client_id: &str) -> Option<&Client> {
        self.clients.get(client_id)
    }

    pub fn api_resource(&self, name: &str) -> Option<&ApiResource> {
        self.api_resources.get(name)
    }

    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    pub fn user_by_subject(&self, subject_id: &str) -> Option<&User> {
        self.subjects
            .get(subject_id)
            .and_then(|username| self.users.get(username))
    }

    pub fn has_scope(&self, name: &str) -> bool {
        self.scopes.contains_key(name)
    }

    /// Registered scope names, sorted
    pub fn scope_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scopes.keys().cloned().collect();
        names.sort();
        names
    }
}
