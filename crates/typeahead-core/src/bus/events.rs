//! Event types for the engine bus
//!
//! One closed enum covers the whole surface: cache activity, request
//! lifecycle, context changes, socket lifecycle, push-delivered payloads,
//! and widget selections.

use std::time::Duration;

use crate::context::EngineContext;
use crate::error::EngineError;
use crate::types::CompletionItem;

/// Events published on the engine bus
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A request was answered from the cache
    CacheHit { fingerprint: String },

    /// A network request settled successfully
    RequestCompleted {
        fingerprint: String,
        provider: Option<String>,
        elapsed: Duration,
    },

    /// A network request failed
    RequestError {
        fingerprint: String,
        error: EngineError,
    },

    /// The context record changed (carries the new snapshot)
    ContextChanged { context: EngineContext },

    /// Push socket established
    SocketConnected,

    /// Push socket closed
    SocketDisconnected,

    /// Push socket error
    SocketError { message: String },

    /// Server-pushed completion suggestion. Published for observers;
    /// nothing inside the engine consumes it.
    Suggestion {
        query: Option<String>,
        items: Vec<CompletionItem>,
    },

    /// Server-pushed provider availability change
    ProviderStatus { provider: String, status: String },

    /// Server-pushed product recommendation (storefront)
    ProductRecommendation { items: Vec<CompletionItem> },

    /// Server-pushed search suggestion (storefront)
    SearchSuggestion { suggestions: Vec<String> },

    /// A widget committed a selection
    ItemSelected {
        widget: String,
        item: CompletionItem,
    },
}
