//! Transport configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Base URL of the completion service
    pub base_url: String,

    /// Default per-attempt deadline (per-call overrides allowed)
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Connection timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Maximum retry attempts after the initial try
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial retry delay (exponential backoff)
    #[serde(default = "default_retry_delay")]
    pub retry_delay: Duration,

    /// Cap on the backoff delay
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay: Duration,

    /// Custom user agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl TransportConfig {
    /// Create a config with defaults for `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            max_retry_delay: default_max_retry_delay(),
            user_agent: default_user_agent(),
        }
    }

    /// Profile for dashboard deployments (3 retries)
    pub fn dashboard(base_url: impl Into<String>) -> Self {
        Self {
            max_retries: 3,
            ..Self::new(base_url)
        }
    }

    /// Profile for storefront deployments (2 retries, tighter deadline)
    pub fn storefront(base_url: impl Into<String>) -> Self {
        Self {
            max_retries: 2,
            timeout: Duration::from_secs(5),
            ..Self::new(base_url)
        }
    }

    /// Set the per-attempt deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry count
    pub fn with_max_retries(mut self, count: u32) -> Self {
        self.max_retries = count;
        self
    }

    /// Set the initial retry delay
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

// Default value functions for serde
fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_retry_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("Typeahead/{}", env!("CARGO_PKG_VERSION"))
}
