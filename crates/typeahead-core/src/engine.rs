//! The completion engine facade
//!
//! Owns transport, cache, coalescer, context store, event bus, and push
//! channel. Widgets talk to this type only; everything they observe
//! beyond return values arrives through the bus.

use std::sync::Arc;
use std::time::Instant;

use futures::future::{AbortRegistration, Abortable};
use tracing::{debug, warn};
use typeahead_cache::FifoCache;
use typeahead_common::JsonStore;
use typeahead_http::{shared_transport, EnvCredentialStore, Method, Transport};

use crate::bus::{EngineEvent, EventBus};
use crate::coalescer::RequestCoalescer;
use crate::config::EngineConfig;
use crate::context::{ContextDelta, ContextStore};
use crate::error::{EngineError, Result};
use crate::push::{ChannelState, PushChannel, PushDeps};
use crate::session::Session;
use crate::types::{
    CompletionRequest, CompletionResponse, EngineStats, HealthStatus, RequestOptions,
};

/// The facade over the whole completion pipeline
///
/// Constructed once per application context and shared (via `Arc`) by
/// every widget bound to the page. Must be created inside a tokio
/// runtime when the push channel is enabled.
pub struct CompletionEngine {
    config: EngineConfig,
    transport: Arc<dyn Transport>,
    cache: Arc<FifoCache<CompletionResponse>>,
    coalescer: RequestCoalescer,
    context: Arc<ContextStore>,
    bus: EventBus,
    push: Option<PushChannel>,
    store: JsonStore,
}

impl CompletionEngine {
    /// Create an engine with the production transport
    ///
    /// The bearer token comes from the environment credential store and
    /// is re-read on every request.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let transport = shared_transport(
            config.transport.clone(),
            Arc::new(EnvCredentialStore::new()),
        )
        .map_err(EngineError::from)?;
        Self::with_transport(config, transport)
    }

    /// Create an engine over a caller-supplied transport
    pub fn with_transport(config: EngineConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let bus = EventBus::new();
        let store = JsonStore::new(&config.store_dir);
        let context = Arc::new(ContextStore::load(
            config.app_context,
            config.user_id.clone(),
            store.clone(),
            bus.clone(),
        ));
        let cache = Arc::new(FifoCache::new(config.cache.clone()));

        let push = if config.push.enabled {
            let url = config
                .websocket_url()
                .map_err(|e| EngineError::Network(e.to_string()))?;
            Some(PushChannel::spawn(
                url,
                config.push.reconnect_backoff,
                context.session().session_id,
                PushDeps {
                    cache: Arc::clone(&cache),
                    context: Arc::clone(&context),
                    bus: bus.clone(),
                    app_context: config.app_context,
                },
            ))
        } else {
            None
        };

        Ok(Self {
            config,
            transport,
            cache,
            coalescer: RequestCoalescer::new(),
            context,
            bus,
            push,
            store,
        })
    }

    /// The engine's event bus
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The persistence store backing this engine's namespace
    ///
    /// Widgets keep their recent-selection and history slots here, next
    /// to the context slot.
    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    /// Which application this engine serves
    pub fn app_context(&self) -> crate::types::AppContext {
        self.config.app_context
    }

    /// The context store
    pub fn context(&self) -> &Arc<ContextStore> {
        &self.context
    }

    /// Current session identity
    pub fn session(&self) -> Session {
        self.context.session()
    }

    /// Fingerprint the given call would be keyed under
    ///
    /// Exposed so embedders can correlate push `cache_update` keys or
    /// invalidate specific entries.
    pub fn request_fingerprint(&self, query: &str, opts: &RequestOptions) -> String {
        self.descriptor(query, opts).fingerprint()
    }

    /// Request completions for `query`
    ///
    /// Cache hit → immediate result plus a `CacheHit` event. Otherwise
    /// the call joins (or starts) the in-flight request for its
    /// fingerprint; on success the response is cached, the query and
    /// provider counters are recorded, and `RequestCompleted` fires; on
    /// failure `RequestError` fires exactly once for all observers.
    pub async fn request_completions(
        &self,
        query: &str,
        opts: &RequestOptions,
    ) -> Result<CompletionResponse> {
        let descriptor = self.descriptor(query, opts);
        let fingerprint = descriptor.fingerprint();

        if let Some(hit) = self.cache.get(&fingerprint) {
            debug!("cache hit for {fingerprint}");
            self.bus.publish(EngineEvent::CacheHit {
                fingerprint: fingerprint.clone(),
            });
            return Ok(hit);
        }

        let shared = self.coalescer.run(&fingerprint, {
            let transport = Arc::clone(&self.transport);
            let cache = Arc::clone(&self.cache);
            let context = Arc::clone(&self.context);
            let bus = self.bus.clone();
            let fingerprint = fingerprint.clone();
            let timeout = opts.timeout.unwrap_or(self.config.default_timeout);

            move || async move {
                let started = Instant::now();
                let body = serde_json::to_value(&descriptor)
                    .map_err(|e| EngineError::Network(e.to_string()))?;

                let outcome = transport
                    .request(Method::POST, "/completions", Some(&body), Some(timeout))
                    .await;

                match outcome {
                    Ok(raw) => {
                        let response: CompletionResponse = serde_json::from_value(raw)
                            .map_err(|_| EngineError::Status {
                                status: 200,
                                parse: true,
                            })?;

                        cache.put(&fingerprint, response.clone());
                        context.record_query(&descriptor.query);
                        if let Some(provider) = &response.provider_used {
                            context.record_provider_use(provider);
                        }
                        bus.publish(EngineEvent::RequestCompleted {
                            fingerprint: fingerprint.clone(),
                            provider: response.provider_used.clone(),
                            elapsed: started.elapsed(),
                        });
                        Ok(response)
                    }
                    Err(e) => {
                        let error = EngineError::from(e);
                        bus.publish(EngineEvent::RequestError {
                            fingerprint: fingerprint.clone(),
                            error: error.clone(),
                        });
                        Err(error)
                    }
                }
            }
        });

        shared.await
    }

    /// Request completions with caller-side cancellation
    ///
    /// Aborting settles this observer with `Aborted`; the underlying
    /// network request keeps running so the result still lands in the
    /// cache for the next keystroke.
    pub async fn request_completions_with_abort(
        &self,
        query: &str,
        opts: &RequestOptions,
        registration: AbortRegistration,
    ) -> Result<CompletionResponse> {
        match Abortable::new(self.request_completions(query, opts), registration).await {
            Ok(result) => result,
            Err(_aborted) => Err(EngineError::Aborted),
        }
    }

    /// Storefront specialisation: product completions
    ///
    /// Pins the `product` provider type and attaches the cart snapshot
    /// and recent product views as request metadata.
    pub async fn request_product_completions(
        &self,
        query: &str,
        opts: &RequestOptions,
    ) -> Result<CompletionResponse> {
        let mut opts = opts.clone();
        opts.provider_types = Some(vec!["product".to_string()]);
        self.attach_storefront_metadata(&mut opts.metadata);
        self.request_completions(query, &opts).await
    }

    /// Storefront specialisation: category completions
    pub async fn request_category_completions(
        &self,
        query: &str,
        opts: &RequestOptions,
    ) -> Result<CompletionResponse> {
        let mut opts = opts.clone();
        opts.provider_types = Some(vec!["category".to_string()]);
        self.attach_storefront_metadata(&mut opts.metadata);
        self.request_completions(query, &opts).await
    }

    /// Local-only context update
    pub fn update_context(&self, delta: ContextDelta) {
        self.context.update(delta);
    }

    /// Push a context update to the server, then apply it locally
    ///
    /// The server call is best-effort: a failure is logged and the local
    /// update still proceeds so the UI stays responsive.
    pub async fn sync_context_to_server(&self, delta: ContextDelta) {
        let session = self.context.session();
        let body = serde_json::json!({
            "user_id": session.user_id,
            "session_id": session.session_id,
            "app_context": session.app_context,
            "updates": &delta,
        });

        if let Err(e) = self.transport.post_json("/context", &body).await {
            warn!("context sync failed, keeping local update: {e}");
        }

        self.context.update(delta);
    }

    /// Fetch the server-side context for `user_id` and merge it locally
    pub async fn load_server_context(&self, user_id: &str) -> Result<()> {
        let raw = self
            .transport
            .get_json(&format!("/context/{user_id}"))
            .await
            .map_err(EngineError::from)?;

        let delta: ContextDelta = serde_json::from_value(raw).map_err(|_| EngineError::Status {
            status: 200,
            parse: true,
        })?;
        self.context.update(delta);
        Ok(())
    }

    /// Query the service's health endpoint
    pub async fn health_check(&self) -> Result<HealthStatus> {
        let raw = self
            .transport
            .get_json("/health")
            .await
            .map_err(EngineError::from)?;
        serde_json::from_value(raw).map_err(|_| EngineError::Status {
            status: 200,
            parse: true,
        })
    }

    /// Point-in-time statistics (pure read)
    pub fn stats(&self) -> EngineStats {
        let snapshot = self.context.snapshot();
        EngineStats {
            session_id: snapshot.session.session_id,
            app_context: snapshot.session.app_context,
            cache: self.cache.stats(),
            in_flight_requests: self.coalescer.in_flight_count(),
            recent_query_count: snapshot.recent_queries.len(),
            provider_usage: snapshot.provider_usage,
            push_state: self.push.as_ref().map(PushChannel::state),
        }
    }

    /// Current push channel state, when the channel is enabled
    pub fn push_state(&self) -> Option<ChannelState> {
        self.push.as_ref().map(PushChannel::state)
    }

    /// Report a page-visibility change to the push channel
    pub fn set_visible(&self, visible: bool) {
        if let Some(push) = &self.push {
            push.set_visible(visible);
        }
    }

    /// Drop the persisted session and context, minting a fresh session
    pub fn clear_session(&self) {
        self.context.clear();
    }

    /// Close the push channel; HTTP requests keep working
    pub fn shutdown(&self) {
        if let Some(push) = &self.push {
            push.shutdown();
        }
    }

    fn descriptor(&self, query: &str, opts: &RequestOptions) -> CompletionRequest {
        let context = self.context.snapshot();
        let session = context.session.clone();
        CompletionRequest {
            query: query.to_string(),
            provider_types: opts
                .provider_types
                .clone()
                .unwrap_or_else(|| self.config.default_provider_types.clone()),
            max_results: opts.max_results.unwrap_or(self.config.default_max_results),
            timeout: opts
                .timeout
                .unwrap_or(self.config.default_timeout)
                .as_millis() as u64,
            user_id: session.user_id,
            session_id: session.session_id,
            metadata: opts.metadata.clone(),
            context,
        }
    }

    fn attach_storefront_metadata(&self, metadata: &mut serde_json::Map<String, serde_json::Value>) {
        let snapshot = self.context.snapshot();
        if let Some(cart) = &snapshot.cart {
            metadata.insert(
                "cart".to_string(),
                serde_json::to_value(cart).unwrap_or(serde_json::Value::Null),
            );
        }
        if !snapshot.recent_product_views.is_empty() {
            metadata.insert(
                "recent_product_views".to_string(),
                serde_json::to_value(snapshot.recent_product_views.items())
                    .unwrap_or(serde_json::Value::Null),
            );
        }
    }
}
