//! Engine configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use typeahead_cache::CacheConfig;
use typeahead_http::TransportConfig;

use crate::types::AppContext;

/// Push channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Whether the WebSocket side channel runs at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Explicit socket URL; when unset it is derived from the HTTP base
    /// URL (`http` → `ws`, `https` → `wss`) plus `path`
    #[serde(default)]
    pub url: Option<String>,

    /// Socket path used when deriving the URL
    #[serde(default = "default_path")]
    pub path: String,

    /// Fixed delay before a reconnect attempt
    #[serde(default = "default_backoff")]
    pub reconnect_backoff: Duration,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            url: None,
            path: default_path(),
            reconnect_backoff: default_backoff(),
        }
    }
}

impl PushConfig {
    /// Dashboard profile: 5 second reconnect backoff
    pub fn dashboard() -> Self {
        Self {
            reconnect_backoff: Duration::from_secs(5),
            ..Default::default()
        }
    }

    /// Storefront profile: 3 second reconnect backoff
    pub fn storefront() -> Self {
        Self {
            reconnect_backoff: Duration::from_secs(3),
            ..Default::default()
        }
    }

    /// Disable the channel entirely
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_path() -> String {
    "/ws".to_string()
}

fn default_backoff() -> Duration {
    Duration::from_secs(5)
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Which application this engine serves
    pub app_context: AppContext,
    /// Transport settings (base URL, timeouts, retries)
    pub transport: TransportConfig,
    /// Cache bounds
    pub cache: CacheConfig,
    /// Push channel settings
    pub push: PushConfig,
    /// Directory backing the persistence slots
    pub store_dir: PathBuf,
    /// Provider types used when a call does not name its own
    pub default_provider_types: Vec<String>,
    /// Result bound used when a call does not name its own
    pub default_max_results: usize,
    /// Per-call deadline used when a call does not name its own
    pub default_timeout: Duration,
    /// External user id, when the embedding application knows it
    pub user_id: Option<String>,
}

impl EngineConfig {
    /// Profile for dashboard deployments
    ///
    /// 3 transport retries, 100-entry cache with a 5 minute TTL, 5 second
    /// socket reconnect backoff.
    pub fn dashboard(base_url: impl Into<String>) -> Self {
        Self {
            app_context: AppContext::Dashboard,
            transport: TransportConfig::dashboard(base_url),
            cache: CacheConfig::dashboard(),
            push: PushConfig::dashboard(),
            store_dir: default_store_dir(),
            default_provider_types: vec!["general".to_string()],
            default_max_results: 8,
            default_timeout: Duration::from_secs(5),
            user_id: None,
        }
    }

    /// Profile for storefront deployments
    ///
    /// 2 transport retries, 50-entry cache with a 3 minute TTL, 3 second
    /// socket reconnect backoff.
    pub fn storefront(base_url: impl Into<String>) -> Self {
        Self {
            app_context: AppContext::Storefront,
            transport: TransportConfig::storefront(base_url),
            cache: CacheConfig::storefront(),
            push: PushConfig::storefront(),
            store_dir: default_store_dir(),
            default_provider_types: vec!["search".to_string()],
            default_max_results: 8,
            default_timeout: Duration::from_secs(5),
            user_id: None,
        }
    }

    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = dir.into();
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn without_push(mut self) -> Self {
        self.push = PushConfig::disabled();
        self
    }

    pub fn with_push_url(mut self, url: impl Into<String>) -> Self {
        self.push.url = Some(url.into());
        self
    }

    /// Resolve the socket URL: explicit override, or the HTTP origin with
    /// its scheme swapped to `ws`/`wss`
    pub fn websocket_url(&self) -> Result<String, url::ParseError> {
        if let Some(url) = &self.push.url {
            return Ok(url.clone());
        }

        let mut base = url::Url::parse(&self.transport.base_url)?;
        let scheme = match base.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        let _ = base.set_scheme(scheme);
        base.set_path(&self.push.path);
        Ok(base.to_string())
    }
}

fn default_store_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("typeahead")
}
