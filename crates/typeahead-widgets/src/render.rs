//! Row rendering contract
//!
//! Widgets do not touch the host UI directly; they produce [`ResultRow`]
//! values and the embedder turns those into DOM nodes, terminal cells,
//! or whatever the surface is. Variants override row construction to add
//! images, prices, and badges.

use typeahead_core::CompletionItem;

use crate::options::WidgetOptions;

/// One rendered result row
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultRow {
    /// Main line (the item's display text)
    pub primary: String,
    /// Secondary line (description, category)
    pub secondary: Option<String>,
    /// Image to show next to the row
    pub image_url: Option<String>,
    /// Formatted price, for product rows
    pub price_label: Option<String>,
    /// Short status badge ("in stock", provider tag)
    pub badge: Option<String>,
    /// Byte ranges of `primary` matching the query
    pub highlight: Vec<(usize, usize)>,
    /// CSS class for the row element
    pub css_class: String,
}

/// Byte ranges of every non-overlapping, ASCII-case-insensitive
/// occurrence of `query` in `text`
pub fn highlight_ranges(text: &str, query: &str) -> Vec<(usize, usize)> {
    if query.is_empty() || query.len() > text.len() {
        return Vec::new();
    }

    let text_bytes = text.as_bytes();
    let query_bytes = query.as_bytes();
    let mut ranges = Vec::new();
    let mut at = 0;

    while at + query_bytes.len() <= text_bytes.len() {
        let window = &text_bytes[at..at + query_bytes.len()];
        if window.eq_ignore_ascii_case(query_bytes) && text.is_char_boundary(at) {
            ranges.push((at, at + query_bytes.len()));
            at += query_bytes.len();
        } else {
            at += 1;
        }
    }

    ranges
}

/// Default row construction shared by the generic variants
pub fn default_row(item: &CompletionItem, query: &str, options: &WidgetOptions) -> ResultRow {
    ResultRow {
        primary: item.text.clone(),
        secondary: if options.show_descriptions {
            item.description.clone()
        } else {
            None
        },
        image_url: None,
        price_label: None,
        badge: item.provider.clone(),
        highlight: if options.highlight_matches {
            highlight_ranges(&item.text, query)
        } else {
            Vec::new()
        },
        css_class: format!("{}-item", options.class_prefix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_finds_case_insensitive_matches() {
        assert_eq!(highlight_ranges("Agent agency", "ag"), vec![(0, 2), (6, 8)]);
    }

    #[test]
    fn test_highlight_empty_query() {
        assert!(highlight_ranges("anything", "").is_empty());
    }

    #[test]
    fn test_highlight_no_match() {
        assert!(highlight_ranges("hoodie", "xyz").is_empty());
    }

    #[test]
    fn test_highlight_matches_do_not_overlap() {
        assert_eq!(highlight_ranges("aaaa", "aa"), vec![(0, 2), (2, 4)]);
    }

    #[test]
    fn test_default_row_respects_toggles() {
        let item = CompletionItem::new("Agent tools")
            .with_description("dev tooling")
            .with_provider("ai");
        let options = WidgetOptions::default();

        let row = default_row(&item, "agent", &options);
        assert_eq!(row.primary, "Agent tools");
        assert_eq!(row.secondary.as_deref(), Some("dev tooling"));
        assert_eq!(row.badge.as_deref(), Some("ai"));
        assert_eq!(row.highlight, vec![(0, 5)]);
        assert_eq!(row.css_class, "autocomplete-item");

        let mut plain = WidgetOptions::default();
        plain.show_descriptions = false;
        plain.highlight_matches = false;
        let row = default_row(&item, "agent", &plain);
        assert!(row.secondary.is_none());
        assert!(row.highlight.is_empty());
    }
}
