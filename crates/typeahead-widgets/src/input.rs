//! Generic input variant

use crate::base::WidgetVariant;

/// The plain autocomplete input
///
/// No pinned providers, no synthetic results, default rendering: the
/// base behavior is the whole behavior.
pub struct InputVariant;

impl WidgetVariant for InputVariant {
    fn kind(&self) -> &'static str {
        "input"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        assert_eq!(InputVariant.kind(), "input");
    }

    #[test]
    fn test_no_pinned_providers() {
        assert!(InputVariant.provider_types().is_none());
    }
}
