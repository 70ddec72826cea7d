//! Widget options

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options recognised by every widget
///
/// A flat record; variants read the subset they care about. All fields
/// have defaults so embedders only name what they change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetOptions {
    /// Prefix for row css classes and the recent-selections slot
    #[serde(default = "default_class_prefix")]
    pub class_prefix: String,

    /// Queries shorter than this never reach the engine
    #[serde(default = "default_min_query_length")]
    pub min_query_length: usize,

    /// Rows rendered per result set
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Keystroke debounce window
    #[serde(default = "default_debounce")]
    pub debounce: Duration,

    /// Render item images (product rows)
    #[serde(default)]
    pub show_images: bool,

    /// Render item descriptions as secondary lines
    #[serde(default = "default_true")]
    pub show_descriptions: bool,

    /// Enter commits the typed text when nothing is selected
    #[serde(default)]
    pub allow_custom_values: bool,

    /// Input placeholder
    #[serde(default = "default_placeholder")]
    pub placeholder_text: String,

    /// Muted text shown while a request is pending
    #[serde(default = "default_loading")]
    pub loading_text: String,

    /// Text shown when a result set is empty
    #[serde(default = "default_no_results")]
    pub no_results_text: String,

    /// Mark query matches inside rendered rows
    #[serde(default = "default_true")]
    pub highlight_matches: bool,

    /// Characters that fire completion immediately (code editor)
    #[serde(default)]
    pub trigger_characters: Vec<char>,

    /// Bound on the persisted recent-selections list
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            class_prefix: default_class_prefix(),
            min_query_length: default_min_query_length(),
            max_results: default_max_results(),
            debounce: default_debounce(),
            show_images: false,
            show_descriptions: default_true(),
            allow_custom_values: false,
            placeholder_text: default_placeholder(),
            loading_text: default_loading(),
            no_results_text: default_no_results(),
            highlight_matches: default_true(),
            trigger_characters: Vec::new(),
            recent_limit: default_recent_limit(),
        }
    }
}

impl WidgetOptions {
    pub fn with_class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = prefix.into();
        self
    }

    pub fn with_min_query_length(mut self, length: usize) -> Self {
        self.min_query_length = length;
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_custom_values(mut self) -> Self {
        self.allow_custom_values = true;
        self
    }

    pub fn with_images(mut self) -> Self {
        self.show_images = true;
        self
    }

    pub fn with_trigger_characters(mut self, characters: Vec<char>) -> Self {
        self.trigger_characters = characters;
        self
    }
}

fn default_class_prefix() -> String {
    "autocomplete".to_string()
}

fn default_min_query_length() -> usize {
    2
}

fn default_max_results() -> usize {
    8
}

fn default_debounce() -> Duration {
    Duration::from_millis(300)
}

fn default_true() -> bool {
    true
}

fn default_placeholder() -> String {
    "Type to search".to_string()
}

fn default_loading() -> String {
    "Loading suggestions...".to_string()
}

fn default_no_results() -> String {
    "No results found".to_string()
}

fn default_recent_limit() -> usize {
    10
}
