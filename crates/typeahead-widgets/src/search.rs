//! Search variant: site search with persisted history
//!
//! Matching history entries are injected ahead of server results, so a
//! returning user sees their own queries first even while the request is
//! on the wire, and still sees them when the network is down.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, warn};
use typeahead_common::{JsonStore, RecentList};
use typeahead_core::{AppContext, CompletionEngine, CompletionItem, RequestOptions, Result};

use crate::base::WidgetVariant;
use crate::options::WidgetOptions;

/// Bound on persisted search history entries
const HISTORY_LIMIT: usize = 10;

/// Persisted search history under the app's reserved slot
/// (`<app>-search-history`)
pub struct SearchHistory {
    store: JsonStore,
    slot_key: String,
    list: Mutex<RecentList<String>>,
}

impl SearchHistory {
    /// Load the history for an app context
    pub fn load(store: JsonStore, app_context: AppContext) -> Self {
        let slot_key = format!("{}-search-history", app_context.as_str());
        let mut list: RecentList<String> = store.get_or_default(&slot_key);
        list.enforce_limit(HISTORY_LIMIT);

        Self {
            store,
            slot_key,
            list: Mutex::new(list),
        }
    }

    /// Record a committed search
    pub fn record(&self, query: &str) {
        let mut list = self.list.lock().expect("history lock poisoned");
        list.record(query.to_string());
        if let Err(e) = self.store.set(&self.slot_key, &*list) {
            warn!("failed to persist search history {}: {e}", self.slot_key);
        }
    }

    /// History entries starting with `prefix` (ASCII case-insensitive),
    /// newest first
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        let list = self.list.lock().expect("history lock poisoned");
        list.items()
            .iter()
            .filter(|entry| {
                entry.len() >= prefix.len()
                    && entry.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
            })
            .cloned()
            .collect()
    }

    /// All entries, newest first
    pub fn items(&self) -> Vec<String> {
        self.list
            .lock()
            .expect("history lock poisoned")
            .items()
            .to_vec()
    }
}

/// Search-with-history variant
pub struct SearchVariant {
    history: SearchHistory,
}

impl SearchVariant {
    pub fn new(history: SearchHistory) -> Self {
        Self { history }
    }

    pub fn history(&self) -> &SearchHistory {
        &self.history
    }
}

#[async_trait]
impl WidgetVariant for SearchVariant {
    fn kind(&self) -> &'static str {
        "search"
    }

    fn provider_types(&self) -> Option<Vec<String>> {
        Some(vec!["search".to_string()])
    }

    fn commit_on_arrow_right(&self) -> bool {
        true
    }

    fn on_commit(&self, value: &str) {
        self.history.record(value);
    }

    async fn perform_search(
        &self,
        query: &str,
        engine: &CompletionEngine,
        options: &WidgetOptions,
    ) -> Result<Vec<CompletionItem>> {
        let mut items: Vec<CompletionItem> = self
            .history
            .matching(query)
            .into_iter()
            .map(|entry| {
                CompletionItem::new(entry)
                    .with_provider("history")
                    .with_score(1.0)
            })
            .collect();

        let request = RequestOptions::default()
            .with_max_results(options.max_results)
            .with_provider_types(vec!["search".to_string()]);

        match engine.request_completions(query, &request).await {
            Ok(response) => {
                for item in response.completions {
                    let duplicate = items
                        .iter()
                        .any(|existing| existing.text.eq_ignore_ascii_case(&item.text));
                    if !duplicate {
                        items.push(item);
                    }
                }
            }
            Err(e) if items.is_empty() => return Err(e),
            // History entries still render when the server is down
            Err(e) => debug!("search request failed, serving history only: {e}"),
        }

        Ok(items)
    }
}
