//! Push channel wire messages
//!
//! Inbound frames are JSON with a required `type` tag from a closed set;
//! anything else fails to parse and is dropped by the channel. Outbound
//! client frames carry the session so the server can scope pause/resume.

use serde::{Deserialize, Serialize};

use crate::context::ContextDelta;
use crate::types::{AppContext, CompletionItem};

/// Server-originated push frames
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    /// Unsolicited completion suggestion
    CompletionSuggestion {
        #[serde(default)]
        query: Option<String>,
        #[serde(default)]
        completions: Vec<CompletionItem>,
    },
    /// Server-driven context merge
    ContextUpdate {
        #[serde(default)]
        updates: ContextDelta,
    },
    /// Pre-warmed cache entry
    CacheUpdate {
        key: String,
        value: serde_json::Value,
    },
    /// Provider availability change
    ProviderStatus { provider: String, status: String },
    /// Product recommendation (storefront only)
    ProductRecommendation {
        #[serde(default)]
        products: Vec<CompletionItem>,
    },
    /// Search suggestion (storefront only)
    SearchSuggestion {
        #[serde(default)]
        suggestions: Vec<String>,
    },
}

/// Client-originated frames
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Page went hidden; the server may stop pushing
    Pause {
        session_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        app_context: Option<AppContext>,
    },
    /// Page is visible again
    Resume {
        session_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        app_context: Option<AppContext>,
    },
}
