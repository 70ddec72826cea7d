//! Code editor variant
//!
//! Completion over an editor buffer rather than a form input. The query
//! is the identifier prefix at the cursor; configured trigger characters
//! (`.`, `:`, `(` and friends) fire a request immediately, bypassing the
//! debounce window and the minimum query length. Tab commits while the
//! popup is open.

use async_trait::async_trait;

use crate::base::WidgetVariant;

/// Extract the token prefix at `cursor` in `buffer`
///
/// Returns the prefix and whether the character immediately before it is
/// one of `trigger_characters`. The prefix is the run of identifier
/// characters (`[A-Za-z0-9_]`) ending at the cursor; a cursor right
/// after a trigger character yields an empty prefix with the trigger
/// flag set.
pub fn extract_prefix(buffer: &str, cursor: usize, trigger_characters: &[char]) -> (String, bool) {
    let cursor = cursor.min(buffer.len());
    let head = match buffer.get(..cursor) {
        Some(head) => head,
        // Cursor inside a multi-byte character; treat as no prefix
        None => return (String::new(), false),
    };

    let prefix_start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
        .last()
        .map(|(i, _)| i)
        .unwrap_or(cursor);

    let prefix = head[prefix_start..].to_string();
    let triggered = head[..prefix_start]
        .chars()
        .next_back()
        .is_some_and(|c| trigger_characters.contains(&c));

    (prefix, triggered)
}

/// Code editor variant
pub struct CodeEditorVariant;

#[async_trait]
impl WidgetVariant for CodeEditorVariant {
    fn kind(&self) -> &'static str {
        "code-editor"
    }

    fn provider_types(&self) -> Option<Vec<String>> {
        Some(vec!["code".to_string()])
    }

    fn commit_on_tab(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIGGERS: &[char] = &['.', ':', '('];

    #[test]
    fn test_prefix_at_end_of_identifier() {
        let (prefix, triggered) = extract_prefix("let visi", 8, TRIGGERS);
        assert_eq!(prefix, "visi");
        assert!(!triggered);
    }

    #[test]
    fn test_prefix_after_trigger_character() {
        let (prefix, triggered) = extract_prefix("client.", 7, TRIGGERS);
        assert_eq!(prefix, "");
        assert!(triggered);
    }

    #[test]
    fn test_partial_prefix_after_trigger() {
        let (prefix, triggered) = extract_prefix("client.fet", 10, TRIGGERS);
        assert_eq!(prefix, "fet");
        assert!(triggered);
    }

    #[test]
    fn test_whitespace_is_not_a_trigger() {
        let (prefix, triggered) = extract_prefix("foo bar", 7, TRIGGERS);
        assert_eq!(prefix, "bar");
        assert!(!triggered);
    }

    #[test]
    fn test_cursor_mid_buffer() {
        let (prefix, triggered) = extract_prefix("obj.fie trailing", 7, TRIGGERS);
        assert_eq!(prefix, "fie");
        assert!(triggered);
    }

    #[test]
    fn test_empty_buffer() {
        let (prefix, triggered) = extract_prefix("", 0, TRIGGERS);
        assert_eq!(prefix, "");
        assert!(!triggered);
    }

    #[test]
    fn test_cursor_past_end_is_clamped() {
        let (prefix, _) = extract_prefix("abc", 99, TRIGGERS);
        assert_eq!(prefix, "abc");
    }

    #[test]
    fn test_variant_flags() {
        assert_eq!(CodeEditorVariant.kind(), "code-editor");
        assert!(CodeEditorVariant.commit_on_tab());
        assert!(!CodeEditorVariant.commit_on_arrow_right());
        assert_eq!(
            CodeEditorVariant.provider_types(),
            Some(vec!["code".to_string()])
        );
    }
}
