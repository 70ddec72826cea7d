//! Input widgets for the typeahead engine
//!
//! A widget binds one input to the engine: it debounces keystrokes,
//! dispatches queries, tracks open/close and selection state, and
//! renders results through a row contract. Four variants cover the
//! product surface:
//!
//! - [`InputVariant`]: the generic autocomplete input
//! - [`SearchVariant`]: site search with persisted history injection
//! - [`ProductSearchVariant`]: storefront search with image, price, and
//!   stock rows plus a popular-products fallback
//! - [`CodeEditorVariant`]: trigger-character completion over an editor
//!   buffer
//!
//! Widgets hold an `Arc` to the engine and never reach into it beyond
//! its public operations; everything they observe arrives as return
//! values or bus events.

pub mod base;
pub mod editor;
pub mod input;
pub mod options;
pub mod product;
pub mod recent;
pub mod render;
pub mod search;
pub mod state;

pub use base::{AutocompleteWidget, WidgetVariant};
pub use editor::{extract_prefix, CodeEditorVariant};
pub use input::InputVariant;
pub use options::WidgetOptions;
pub use product::ProductSearchVariant;
pub use recent::RecentSelections;
pub use render::{default_row, highlight_ranges, ResultRow};
pub use search::{SearchHistory, SearchVariant};
pub use state::{Committed, Key, KeyOutcome, WidgetPhase};
