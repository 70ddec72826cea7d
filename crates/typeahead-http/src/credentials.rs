//! Credential lookup for bearer authentication
//!
//! The transport reads the token through this trait on every call; it
//! never caches what it gets back. Token rotation is therefore picked up
//! on the next request, and a revoked token surfaces as an HTTP 401 to
//! the caller rather than being retried.

/// Source of bearer tokens
pub trait CredentialStore: Send + Sync {
    /// Current bearer token, if any
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed token handed in at construction
///
/// `StaticCredentialStore::anonymous()` makes unauthenticated transports
/// for deployments that sit behind their own gateway.
#[derive(Debug, Clone)]
pub struct StaticCredentialStore {
    token: Option<String>,
}

impl StaticCredentialStore {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

impl CredentialStore for StaticCredentialStore {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Token read from an environment variable on each call
#[derive(Debug, Clone)]
pub struct EnvCredentialStore {
    env_var: String,
}

impl EnvCredentialStore {
    /// Read from `TYPEAHEAD_API_TOKEN`
    pub fn new() -> Self {
        Self::with_var("TYPEAHEAD_API_TOKEN")
    }

    /// Read from a custom environment variable
    pub fn with_var(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
        }
    }
}

impl Default for EnvCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for EnvCredentialStore {
    fn bearer_token(&self) -> Option<String> {
        std::env::var(&self.env_var).ok().filter(|t| !t.is_empty())
    }
}
