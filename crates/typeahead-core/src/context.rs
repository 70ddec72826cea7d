//! Context store: session identity, history, and app-specific hints
//!
//! The context record is persisted as one JSON slot under the app's
//! reserved key (`<app>_autocomplete_context`). Every mutation merges,
//! persists atomically, and emits exactly one `ContextChanged` before
//! returning; persistence failures are logged and the in-memory record
//! keeps operating.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use typeahead_common::{JsonStore, RecentList};

use crate::bus::{EngineEvent, EventBus};
use crate::session::Session;
use crate::types::AppContext;

/// Bound on recent queries and recent product views
const RECENT_LIMIT: usize = 10;

/// Cart snapshot carried by storefront contexts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartSnapshot {
    pub item_count: u32,
    pub total: f64,
    pub last_updated: DateTime<Utc>,
}

/// One recently viewed product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductView {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub viewed_at: DateTime<Utc>,
}

/// The persisted context record
///
/// Unknown fields land in `extensions` and survive a round trip, so a
/// newer writer's fields are not lost when an older build loads the slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineContext {
    pub session: Session,
    #[serde(default)]
    pub current_page: String,
    #[serde(default)]
    pub recent_queries: RecentList<String>,
    #[serde(default)]
    pub provider_usage: HashMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart: Option<CartSnapshot>,
    #[serde(default)]
    pub recent_product_views: RecentList<ProductView>,
    #[serde(flatten)]
    pub extensions: serde_json::Map<String, serde_json::Value>,
}

impl EngineContext {
    fn fresh(app_context: AppContext, user_id: Option<String>) -> Self {
        Self {
            session: Session::new(app_context, user_id),
            current_page: String::new(),
            recent_queries: RecentList::new(RECENT_LIMIT),
            provider_usage: HashMap::new(),
            cart: None,
            recent_product_views: RecentList::new(RECENT_LIMIT),
            extensions: serde_json::Map::new(),
        }
    }
}

/// Shallow partial update for [`EngineContext`]
///
/// Only fields that are present are applied; extension entries merge
/// key-by-key over the existing map.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContextDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart: Option<CartSnapshot>,
    #[serde(flatten)]
    pub extensions: serde_json::Map<String, serde_json::Value>,
}

impl ContextDelta {
    pub fn page(page: impl Into<String>) -> Self {
        Self {
            current_page: Some(page.into()),
            ..Default::default()
        }
    }
}

/// Owner of the mutable context record
pub struct ContextStore {
    state: Mutex<EngineContext>,
    store: JsonStore,
    slot_key: String,
    bus: EventBus,
}

impl ContextStore {
    /// Load the persisted context, or initialise a fresh one
    ///
    /// A readable slot keeps its session (ids are stable across
    /// restarts); a malformed slot is logged and replaced. The loaded
    /// record is persisted back immediately so the slot always reflects
    /// the session in use.
    pub fn load(
        app_context: AppContext,
        user_id: Option<String>,
        store: JsonStore,
        bus: EventBus,
    ) -> Self {
        let slot_key = format!("{}_autocomplete_context", app_context.as_str());

        let mut context = match store.get::<EngineContext>(&slot_key) {
            Ok(mut persisted) => {
                persisted.recent_queries.enforce_limit(RECENT_LIMIT);
                persisted.recent_product_views.enforce_limit(RECENT_LIMIT);
                debug!(
                    "restored session {} from {slot_key}",
                    persisted.session.session_id
                );
                persisted
            }
            Err(typeahead_common::JsonStoreError::NotFound { .. }) => {
                EngineContext::fresh(app_context, user_id.clone())
            }
            Err(e) => {
                warn!("re-initialising context slot {slot_key}: {e}");
                EngineContext::fresh(app_context, user_id.clone())
            }
        };

        if let Some(user_id) = user_id {
            context.session.user_id = Some(user_id);
        }

        let this = Self {
            state: Mutex::new(context),
            store,
            slot_key,
            bus,
        };
        this.persist_locked(&this.state.lock().expect("context lock poisoned"));
        this
    }

    /// Immutable copy of the current record
    pub fn snapshot(&self) -> EngineContext {
        self.state.lock().expect("context lock poisoned").clone()
    }

    /// Current session (identity subset of the snapshot)
    pub fn session(&self) -> Session {
        self.state
            .lock()
            .expect("context lock poisoned")
            .session
            .clone()
    }

    /// Apply a shallow partial update
    pub fn update(&self, delta: ContextDelta) {
        self.mutate(|context| {
            if let Some(page) = delta.current_page {
                context.current_page = page;
            }
            if let Some(user_id) = delta.user_id {
                context.session.user_id = Some(user_id);
            }
            if let Some(cart) = delta.cart {
                context.cart = Some(cart);
            }
            for (key, value) in delta.extensions {
                context.extensions.insert(key, value);
            }
        });
    }

    /// Prepend a query to the recent-queries list
    pub fn record_query(&self, query: &str) {
        let query = query.to_string();
        self.mutate(|context| context.recent_queries.record(query));
    }

    /// Bump the use counter for a provider
    pub fn record_provider_use(&self, provider: &str) {
        let provider = provider.to_string();
        self.mutate(|context| {
            *context.provider_usage.entry(provider).or_insert(0) += 1;
        });
    }

    /// Prepend a product view, deduplicating on product id
    pub fn record_product_view(&self, view: ProductView) {
        self.mutate(|context| {
            context
                .recent_product_views
                .record_by(view, |a, b| a.product_id == b.product_id);
        });
    }

    /// Replace the cart snapshot
    pub fn set_cart(&self, cart: CartSnapshot) {
        self.mutate(|context| context.cart = Some(cart));
    }

    /// Drop the persisted slot and mint a fresh session
    pub fn clear(&self) {
        let mut state = self.state.lock().expect("context lock poisoned");
        let app_context = state.session.app_context;
        if let Err(e) = self.store.remove(&self.slot_key) {
            warn!("failed to clear context slot {}: {e}", self.slot_key);
        }
        *state = EngineContext::fresh(app_context, None);
        self.persist_locked(&state);
        self.bus.publish(EngineEvent::ContextChanged {
            context: state.clone(),
        });
    }

    fn mutate<F: FnOnce(&mut EngineContext)>(&self, apply: F) {
        // One lock span per update: merge, persist, emit. Callers always
        // observe the persisted snapshot and exactly one event.
        let mut state = self.state.lock().expect("context lock poisoned");
        apply(&mut state);
        self.persist_locked(&state);
        self.bus.publish(EngineEvent::ContextChanged {
            context: state.clone(),
        });
    }

    fn persist_locked(&self, context: &EngineContext) {
        if let Err(e) = self.store.set(&self.slot_key, context) {
            warn!("failed to persist context slot {}: {e}", self.slot_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &std::path::Path) -> (ContextStore, JsonStore) {
        let json_store = JsonStore::new(dir);
        let store = ContextStore::load(
            AppContext::Dashboard,
            None,
            json_store.clone(),
            EventBus::new(),
        );
        (store, json_store)
    }

    #[test]
    fn test_fresh_context_is_persisted_immediately() {
        let dir = tempdir().unwrap();
        let (store, json_store) = store_in(dir.path());

        assert!(json_store.contains("dashboard_autocomplete_context"));
        assert!(!store.session().session_id.is_empty());
    }

    #[test]
    fn test_session_id_stable_across_reloads() {
        let dir = tempdir().unwrap();
        let (first, _) = store_in(dir.path());
        let original = first.session().session_id;
        drop(first);

        let (second, _) = store_in(dir.path());
        assert_eq!(second.session().session_id, original);
    }

    #[test]
    fn test_clear_mints_new_session() {
        let dir = tempdir().unwrap();
        let (store, _) = store_in(dir.path());
        let original = store.session().session_id;

        store.clear();
        assert_ne!(store.session().session_id, original);
    }

    #[test]
    fn test_update_round_trips_through_reload() {
        let dir = tempdir().unwrap();
        let (store, _) = store_in(dir.path());
        store.update(ContextDelta::page("/agents"));
        drop(store);

        let (reloaded, _) = store_in(dir.path());
        assert_eq!(reloaded.snapshot().current_page, "/agents");
    }

    #[test]
    fn test_recent_queries_bounded_and_newest_first() {
        let dir = tempdir().unwrap();
        let (store, _) = store_in(dir.path());

        for i in 0..15 {
            store.record_query(&format!("query-{i}"));
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.recent_queries.len(), 10);
        assert_eq!(snapshot.recent_queries.items()[0], "query-14");
    }

    #[test]
    fn test_provider_counters_monotonic() {
        let dir = tempdir().unwrap();
        let (store, _) = store_in(dir.path());

        store.record_provider_use("ai");
        store.record_provider_use("ai");
        store.record_provider_use("catalog");

        let usage = store.snapshot().provider_usage;
        assert_eq!(usage["ai"], 2);
        assert_eq!(usage["catalog"], 1);
    }

    #[test]
    fn test_product_views_dedup_on_id() {
        let dir = tempdir().unwrap();
        let (store, _) = store_in(dir.path());

        for _ in 0..3 {
            store.record_product_view(ProductView {
                product_id: "p1".to_string(),
                name: Some("Hoodie".to_string()),
                viewed_at: Utc::now(),
            });
        }

        assert_eq!(store.snapshot().recent_product_views.len(), 1);
    }

    #[test]
    fn test_each_update_emits_one_context_changed() {
        let dir = tempdir().unwrap();
        let json_store = JsonStore::new(dir.path());
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe();
        let store = ContextStore::load(AppContext::Dashboard, None, json_store, bus);

        store.update(ContextDelta::page("/a"));
        store.record_query("hello");

        let first = subscriber.try_recv().unwrap();
        assert!(matches!(first, EngineEvent::ContextChanged { ref context } if context.current_page == "/a"));
        let second = subscriber.try_recv().unwrap();
        assert!(matches!(second, EngineEvent::ContextChanged { ref context } if context.recent_queries.items()[0] == "hello"));
        assert!(subscriber.try_recv().is_err());
    }

    #[test]
    fn test_malformed_slot_reinitialised() {
        let dir = tempdir().unwrap();
        let json_store = JsonStore::new(dir.path());
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(
            json_store.slot_path("dashboard_autocomplete_context"),
            "{broken",
        )
        .unwrap();

        let store = ContextStore::load(
            AppContext::Dashboard,
            None,
            json_store.clone(),
            EventBus::new(),
        );
        assert!(!store.session().session_id.is_empty());

        // The slot is valid again after load
        assert!(json_store
            .get::<EngineContext>("dashboard_autocomplete_context")
            .is_ok());
    }

    #[test]
    fn test_extensions_merge_shallow() {
        let dir = tempdir().unwrap();
        let (store, _) = store_in(dir.path());

        let mut delta = ContextDelta::default();
        delta
            .extensions
            .insert("theme".to_string(), serde_json::json!("dark"));
        store.update(delta);

        let mut delta = ContextDelta::default();
        delta
            .extensions
            .insert("locale".to_string(), serde_json::json!("en"));
        store.update(delta);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.extensions["theme"], serde_json::json!("dark"));
        assert_eq!(snapshot.extensions["locale"], serde_json::json!("en"));
    }
}
