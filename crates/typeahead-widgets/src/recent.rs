//! Persisted per-widget recent selections
//!
//! Each widget keeps its committed values under its own slot
//! (`input-autocomplete-recent-<prefix>`), bounded and newest first.
//! Storage failures are logged and the in-memory list keeps working.

use std::sync::Mutex;

use tracing::warn;
use typeahead_common::{JsonStore, RecentList};

/// Bounded, persisted list of committed values
pub struct RecentSelections {
    store: JsonStore,
    slot_key: String,
    list: Mutex<RecentList<String>>,
}

impl RecentSelections {
    /// Load the list for a widget class prefix
    pub fn load(store: JsonStore, class_prefix: &str, limit: usize) -> Self {
        let slot_key = format!("input-autocomplete-recent-{class_prefix}");
        let mut list: RecentList<String> = store.get_or_default(&slot_key);
        list.enforce_limit(limit);

        Self {
            store,
            slot_key,
            list: Mutex::new(list),
        }
    }

    /// Record a committed value and persist the list
    pub fn record(&self, value: &str) {
        let mut list = self.list.lock().expect("recent list lock poisoned");
        list.record(value.to_string());
        if let Err(e) = self.store.set(&self.slot_key, &*list) {
            warn!("failed to persist recent selections {}: {e}", self.slot_key);
        }
    }

    /// Committed values, newest first
    pub fn items(&self) -> Vec<String> {
        self.list
            .lock()
            .expect("recent list lock poisoned")
            .items()
            .to_vec()
    }

    /// Drop the list and its slot
    pub fn clear(&self) {
        let mut list = self.list.lock().expect("recent list lock poisoned");
        list.clear();
        if let Err(e) = self.store.remove(&self.slot_key) {
            warn!("failed to clear recent selections {}: {e}", self.slot_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_record_and_reload() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        let recent = RecentSelections::load(store.clone(), "search", 5);
        recent.record("first");
        recent.record("second");
        drop(recent);

        let reloaded = RecentSelections::load(store, "search", 5);
        assert_eq!(reloaded.items(), vec!["second", "first"]);
    }

    #[test]
    fn test_bound_enforced_per_widget() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        let recent = RecentSelections::load(store, "tags", 3);
        for i in 0..10 {
            recent.record(&format!("value-{i}"));
        }
        assert_eq!(recent.items().len(), 3);
        assert_eq!(recent.items()[0], "value-9");
    }

    #[test]
    fn test_widgets_use_distinct_slots() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        let a = RecentSelections::load(store.clone(), "search", 5);
        let b = RecentSelections::load(store, "tags", 5);
        a.record("query");

        assert_eq!(a.items().len(), 1);
        assert!(b.items().is_empty());
    }

    #[test]
    fn test_clear_removes_slot() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        let recent = RecentSelections::load(store.clone(), "search", 5);
        recent.record("value");
        recent.clear();
        assert!(recent.items().is_empty());
        assert!(!store.contains("input-autocomplete-recent-search"));
    }
}
