//! Typeahead core engine
//!
//! The engine mediates between input widgets and a remote completion
//! service. It owns five collaborators and composes them behind one
//! facade:
//!
//! 1. **Transport** (typeahead-http): HTTP with timeouts and retry.
//! 2. **Cache** (typeahead-cache): bounded FIFO + TTL response cache.
//! 3. **Coalescer**: one in-flight network request per fingerprint.
//! 4. **Context store**: session identity, recent queries, provider
//!    counters, storefront hints, all persisted locally.
//! 5. **Push channel**: WebSocket side channel feeding suggestions,
//!    context updates, and cache writes back into the engine.
//!
//! An event bus ties the pieces together: widgets subscribe to cache,
//! request, context, and socket events without the engine tracking any
//! widget.
//!
//! # Example
//!
//! ```ignore
//! use typeahead_core::{CompletionEngine, EngineConfig, RequestOptions};
//!
//! let config = EngineConfig::dashboard("https://api.example.com");
//! let engine = CompletionEngine::new(config)?;
//!
//! let response = engine
//!     .request_completions("agen", &RequestOptions::default())
//!     .await?;
//! for item in &response.completions {
//!     println!("{}", item.text);
//! }
//! ```

pub mod bus;
pub mod coalescer;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod push;
pub mod session;
pub mod types;

pub use bus::{EngineEvent, EventBus};
pub use coalescer::RequestCoalescer;
pub use config::{EngineConfig, PushConfig};
pub use context::{CartSnapshot, ContextDelta, ContextStore, EngineContext, ProductView};
pub use engine::CompletionEngine;
pub use error::{EngineError, Result};
pub use push::{ChannelState, PushChannel, PushMessage};
pub use session::Session;
pub use types::{
    AppContext, CompletionItem, CompletionRequest, CompletionResponse, EngineStats, HealthStatus,
    ProductDetails, RequestOptions,
};
