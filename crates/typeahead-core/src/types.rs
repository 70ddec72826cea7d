//! Core data model: requests, responses, completion items, stats

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use typeahead_cache::CacheStats;

use crate::context::EngineContext;
use crate::push::ChannelState;

/// Which application this engine serves
///
/// The tag travels with every request and selects the deployment
/// profile (retry counts, cache bounds, reconnect backoff).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppContext {
    #[default]
    Dashboard,
    Storefront,
}

impl AppContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppContext::Dashboard => "dashboard",
            AppContext::Storefront => "storefront",
        }
    }
}

impl std::fmt::Display for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completion suggestion
///
/// Servers are inconsistent about the display field (`completion`,
/// `text`, or `name`); the aliases fold all three into `text`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionItem {
    /// Display string
    #[serde(alias = "completion", alias = "name")]
    pub text: String,

    /// Optional secondary line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Relevance score in [0, 1]
    #[serde(default)]
    pub score: f32,

    /// Provider that produced this item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Free-form metadata (product items carry id/image/price/stock here)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl CompletionItem {
    /// Create a bare item with a display string
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            description: None,
            score: 0.0,
            provider: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Builder-style score
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Builder-style provider tag
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Builder-style description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Interpret the metadata as product details
    pub fn product_details(&self) -> Option<ProductDetails> {
        if self.metadata.is_empty() {
            return None;
        }
        serde_json::from_value(serde_json::Value::Object(self.metadata.clone())).ok()
    }
}

/// Product fields carried in completion-item metadata
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProductDetails {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Wire request for `POST /completions`; also the fingerprint source
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletionRequest {
    pub query: String,
    pub context: EngineContext,
    pub provider_types: Vec<String>,
    pub max_results: usize,
    /// Per-call deadline in milliseconds, as the service expects it
    pub timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub session_id: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl CompletionRequest {
    /// Fingerprint keying the cache and the coalescer
    pub fn fingerprint(&self) -> String {
        typeahead_cache::fingerprint(
            &self.query,
            self.context.session.app_context.as_str(),
            &self.context.current_page,
            &self.provider_types,
            self.max_results,
            &serde_json::Value::Object(self.metadata.clone()),
        )
    }
}

/// Response from `POST /completions`
///
/// Unknown top-level fields are kept in `metadata` so a round trip
/// through the cache or push channel preserves them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CompletionResponse {
    #[serde(default)]
    pub completions: Vec<CompletionItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_used: Option<String>,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Per-call options for facade requests
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Allowed provider types; engine defaults apply when unset
    pub provider_types: Option<Vec<String>>,
    /// Result bound; engine default applies when unset
    pub max_results: Option<usize>,
    /// Per-call deadline; engine default applies when unset
    pub timeout: Option<Duration>,
    /// Free-form request metadata (participates in the fingerprint)
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl RequestOptions {
    pub fn with_provider_types(mut self, types: Vec<String>) -> Self {
        self.provider_types = Some(types);
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Response from `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.as_str(), "ok" | "healthy")
    }
}

/// Point-in-time engine statistics
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub session_id: String,
    pub app_context: AppContext,
    pub cache: CacheStats,
    pub in_flight_requests: usize,
    pub recent_query_count: usize,
    pub provider_usage: HashMap<String, u64>,
    /// Socket state; `None` when the push channel is disabled
    pub push_state: Option<ChannelState>,
}
