//! Widget base: input binding, debounce, keyboard handling, commits
//!
//! `AutocompleteWidget` owns the per-instance state machine and talks to
//! the engine; a [`WidgetVariant`] supplies the seams that differ per
//! widget: context hints, row rendering, search injection, and commit
//! keys. A widget destroyed mid-flight never aborts its request (the
//! result still lands in the engine cache); its pending callbacks just
//! drop their arrivals.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;
use typeahead_core::{
    CompletionEngine, CompletionItem, EngineContext, EngineEvent, RequestOptions, Result,
};
use uuid::Uuid;

use crate::options::WidgetOptions;
use crate::recent::RecentSelections;
use crate::render::{default_row, ResultRow};
use crate::state::{Committed, Key, KeyOutcome, WidgetPhase};

/// Variant seams for the widget base
///
/// Implementations stay small: override the hooks that differ, keep the
/// base behavior for the rest.
#[async_trait]
pub trait WidgetVariant: Send + Sync {
    /// Variant tag, used in widget ids and selection events
    fn kind(&self) -> &'static str;

    /// Provider types this variant pins; `None` uses the engine default
    fn provider_types(&self) -> Option<Vec<String>> {
        None
    }

    /// Widget hints merged into the request metadata
    fn build_context(
        &self,
        _context: &EngineContext,
    ) -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::new()
    }

    /// Whether ArrowRight commits when the cursor sits at the end
    fn commit_on_arrow_right(&self) -> bool {
        false
    }

    /// Whether Tab commits while the popup is open
    fn commit_on_tab(&self) -> bool {
        false
    }

    /// Produce the row for one item
    fn render_row(&self, item: &CompletionItem, query: &str, options: &WidgetOptions) -> ResultRow {
        default_row(item, query, options)
    }

    /// Called after a commit with the committed value
    fn on_commit(&self, _value: &str) {}

    /// Produce the result set for a query
    ///
    /// The default delegates straight to the engine. Variants inject
    /// synthetic sets (history, popular fallbacks) around this call.
    async fn perform_search(
        &self,
        query: &str,
        engine: &CompletionEngine,
        options: &WidgetOptions,
    ) -> Result<Vec<CompletionItem>> {
        let mut request = RequestOptions::default().with_max_results(options.max_results);
        if let Some(types) = self.provider_types() {
            request.provider_types = Some(types);
        }
        request.metadata = self.build_context(&engine.context().snapshot());

        let response = engine.request_completions(query, &request).await?;
        Ok(response.completions)
    }
}

struct WidgetInner {
    query: String,
    value: String,
    phase: WidgetPhase,
    results: Vec<CompletionItem>,
    selected: Option<usize>,
    generation: u64,
    cursor_at_end: bool,
    destroyed: bool,
}

impl Default for WidgetInner {
    fn default() -> Self {
        Self {
            query: String::new(),
            value: String::new(),
            phase: WidgetPhase::Idle,
            results: Vec::new(),
            selected: None,
            generation: 0,
            cursor_at_end: true,
            destroyed: false,
        }
    }
}

/// One input bound to the engine
pub struct AutocompleteWidget {
    id: String,
    engine: Arc<CompletionEngine>,
    variant: Arc<dyn WidgetVariant>,
    options: WidgetOptions,
    inner: Mutex<WidgetInner>,
    recent: RecentSelections,
}

impl AutocompleteWidget {
    /// Bind a widget with an explicit variant
    pub fn new(
        engine: Arc<CompletionEngine>,
        variant: Arc<dyn WidgetVariant>,
        options: WidgetOptions,
    ) -> Arc<Self> {
        let recent = RecentSelections::load(
            engine.store().clone(),
            &options.class_prefix,
            options.recent_limit,
        );
        Arc::new(Self {
            id: format!("{}-{}", variant.kind(), Uuid::new_v4()),
            engine,
            variant,
            options,
            inner: Mutex::new(WidgetInner::default()),
            recent,
        })
    }

    /// Bind a generic autocomplete input
    pub fn generic(engine: Arc<CompletionEngine>, options: WidgetOptions) -> Arc<Self> {
        Self::new(engine, Arc::new(crate::input::InputVariant), options)
    }

    /// Bind a search input with persisted history
    pub fn search(engine: Arc<CompletionEngine>, options: WidgetOptions) -> Arc<Self> {
        let history =
            crate::search::SearchHistory::load(engine.store().clone(), engine.app_context());
        Self::new(
            engine,
            Arc::new(crate::search::SearchVariant::new(history)),
            options,
        )
    }

    /// Bind a storefront product search
    pub fn product_search(engine: Arc<CompletionEngine>, options: WidgetOptions) -> Arc<Self> {
        Self::new(
            engine,
            Arc::new(crate::product::ProductSearchVariant::new()),
            options,
        )
    }

    /// Bind a code editor completion source
    pub fn code_editor(engine: Arc<CompletionEngine>, options: WidgetOptions) -> Arc<Self> {
        Self::new(engine, Arc::new(crate::editor::CodeEditorVariant), options)
    }

    /// Widget instance id (variant kind plus a unique suffix)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The options this widget was bound with
    pub fn options(&self) -> &WidgetOptions {
        &self.options
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> WidgetPhase {
        self.lock().phase
    }

    /// Whether the popup is open
    pub fn is_open(&self) -> bool {
        self.lock().phase.is_open()
    }

    /// Current input value
    pub fn value(&self) -> String {
        self.lock().value.clone()
    }

    /// Current result set
    pub fn results(&self) -> Vec<CompletionItem> {
        self.lock().results.clone()
    }

    /// Selected row index, if any
    pub fn selected(&self) -> Option<usize> {
        self.lock().selected
    }

    /// Persisted recent selections, newest first
    pub fn recent_selections(&self) -> Vec<String> {
        self.recent.items()
    }

    /// Status line for the embedder to render, when one applies
    ///
    /// `loadingText` while a request is pending, `noResultsText` when an
    /// open popup has nothing to show.
    pub fn status_text(&self) -> Option<String> {
        let inner = self.lock();
        match inner.phase {
            WidgetPhase::Typing | WidgetPhase::Pending => {
                Some(self.options.loading_text.clone())
            }
            WidgetPhase::Open if inner.results.is_empty() => {
                Some(self.options.no_results_text.clone())
            }
            _ => None,
        }
    }

    /// Rendered rows for the current result set
    pub fn rows(&self) -> Vec<ResultRow> {
        let inner = self.lock();
        inner
            .results
            .iter()
            .map(|item| self.variant.render_row(item, &inner.query, &self.options))
            .collect()
    }

    /// Report whether the cursor sits at the end of the input
    pub fn set_cursor_at_end(&self, at_end: bool) {
        self.lock().cursor_at_end = at_end;
    }

    /// Handle an input event
    ///
    /// Trims, starts the debounce window, and dispatches when the window
    /// closes with this keystroke still the latest. Input below the
    /// minimum length closes the popup without touching the engine.
    pub fn handle_input(self: &Arc<Self>, text: &str) {
        let trimmed = text.trim().to_string();
        let generation = {
            let mut inner = self.lock();
            if inner.destroyed {
                return;
            }
            inner.value = text.to_string();
            inner.query = trimmed.clone();
            inner.cursor_at_end = true;
            inner.generation += 1;

            if trimmed.chars().count() < self.options.min_query_length {
                inner.phase = WidgetPhase::Idle;
                inner.results.clear();
                inner.selected = None;
                return;
            }

            inner.phase = WidgetPhase::Typing;
            inner.generation
        };

        let widget = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(widget.options.debounce).await;
            widget.dispatch(trimmed, generation).await;
        });
    }

    /// Dispatch a query immediately, skipping debounce and length checks
    ///
    /// Used by trigger characters in the code-editor variant.
    pub fn request_now(self: &Arc<Self>, query: &str) {
        let query = query.trim().to_string();
        let generation = {
            let mut inner = self.lock();
            if inner.destroyed {
                return;
            }
            inner.value = query.clone();
            inner.query = query.clone();
            inner.generation += 1;
            inner.phase = WidgetPhase::Typing;
            inner.generation
        };

        let widget = Arc::clone(self);
        tokio::spawn(async move {
            widget.dispatch(query, generation).await;
        });
    }

    /// Handle an editor buffer change (code-editor variant)
    ///
    /// Extracts the token prefix at the cursor; a trigger character
    /// dispatches immediately, anything else goes through the normal
    /// debounced path.
    pub fn handle_editor_input(self: &Arc<Self>, buffer: &str, cursor: usize) {
        let (prefix, triggered) =
            crate::editor::extract_prefix(buffer, cursor, &self.options.trigger_characters);
        if triggered {
            self.request_now(&prefix);
        } else {
            self.handle_input(&prefix);
        }
    }

    /// Handle a keypress
    pub fn handle_key(&self, key: Key) -> KeyOutcome {
        let mut inner = self.lock();
        if inner.destroyed {
            return KeyOutcome::Ignored;
        }

        match key {
            Key::ArrowDown if inner.phase.is_open() && !inner.results.is_empty() => {
                let next = match inner.selected {
                    None => 0,
                    Some(i) => (i + 1) % inner.results.len(),
                };
                inner.selected = Some(next);
                KeyOutcome::SelectionMoved(next)
            }
            Key::ArrowUp if inner.phase.is_open() && !inner.results.is_empty() => {
                let last = inner.results.len() - 1;
                let next = match inner.selected {
                    None | Some(0) => last,
                    Some(i) => i - 1,
                };
                inner.selected = Some(next);
                KeyOutcome::SelectionMoved(next)
            }
            Key::Enter => {
                if let Some(index) = inner.selected.filter(|_| inner.phase.is_open()) {
                    let item = inner.results[index].clone();
                    self.commit(&mut inner, Some(item))
                } else if self.options.allow_custom_values && !inner.query.is_empty() {
                    self.commit(&mut inner, None)
                } else {
                    KeyOutcome::Ignored
                }
            }
            Key::Tab if self.variant.commit_on_tab() && inner.phase.is_open() => {
                match self.current_or_first(&inner) {
                    Some(item) => self.commit(&mut inner, Some(item)),
                    None => KeyOutcome::Ignored,
                }
            }
            Key::ArrowRight
                if self.variant.commit_on_arrow_right()
                    && inner.phase.is_open()
                    && inner.cursor_at_end =>
            {
                match self.current_or_first(&inner) {
                    Some(item) => self.commit(&mut inner, Some(item)),
                    None => KeyOutcome::Ignored,
                }
            }
            Key::Escape if inner.phase.is_open() || inner.phase.is_busy() => {
                inner.phase = WidgetPhase::Cancelled;
                inner.results.clear();
                inner.selected = None;
                KeyOutcome::Closed
            }
            _ => KeyOutcome::Ignored,
        }
    }

    /// Mark the widget destroyed
    ///
    /// In-flight requests keep running (their results stay cached for
    /// the next widget); arrivals for this instance are dropped.
    pub fn destroy(&self) {
        let mut inner = self.lock();
        inner.destroyed = true;
        inner.phase = WidgetPhase::Idle;
        inner.results.clear();
        inner.selected = None;
    }

    async fn dispatch(&self, query: String, generation: u64) {
        {
            let mut inner = self.lock();
            if inner.destroyed || inner.generation != generation {
                return;
            }
            inner.phase = WidgetPhase::Pending;
        }

        let outcome = self
            .variant
            .perform_search(&query, &self.engine, &self.options)
            .await;

        let mut inner = self.lock();
        if inner.destroyed || inner.generation != generation {
            return;
        }

        match outcome {
            Ok(mut items) => {
                items.truncate(self.options.max_results);
                inner.results = items;
                inner.selected = None;
                inner.phase = WidgetPhase::Open;
            }
            Err(e) => {
                debug!("search for {:?} failed: {e}", query);
                inner.results.clear();
                inner.selected = None;
                inner.phase = WidgetPhase::Idle;
            }
        }
    }

    fn current_or_first(&self, inner: &WidgetInner) -> Option<CompletionItem> {
        match inner.selected {
            Some(index) => inner.results.get(index).cloned(),
            None => inner.results.first().cloned(),
        }
    }

    fn commit(&self, inner: &mut WidgetInner, item: Option<CompletionItem>) -> KeyOutcome {
        let value = item
            .as_ref()
            .map(|item| item.text.clone())
            .unwrap_or_else(|| inner.query.clone());

        inner.value = value.clone();
        inner.phase = WidgetPhase::Committed;
        inner.results.clear();
        inner.selected = None;

        self.recent.record(&value);
        self.variant.on_commit(&value);
        self.engine.bus().publish(EngineEvent::ItemSelected {
            widget: self.id.clone(),
            item: item
                .clone()
                .unwrap_or_else(|| CompletionItem::new(value.clone())),
        });

        KeyOutcome::Committed(Committed { value, item })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WidgetInner> {
        self.inner.lock().expect("widget lock poisoned")
    }
}
