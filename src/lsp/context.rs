//! UI enablement flags.

use super::ext::ContextKeys;
use crate::document::DocumentState;

/// Flags for the active document. `enabled` is the interactive-features switch.
pub fn context_keys(enabled: bool, document: Option<&DocumentState>) -> ContextKeys {
    let indexed = document.and_then(DocumentState::cells);
    ContextKeys {
        supports_code_cells: enabled && indexed.is_some(),
        has_code_cells: indexed.is_some_and(|cells| !cells.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(language: &str, text: &str) -> DocumentState {
        DocumentState::new(language.to_string(), text.to_string(), 1)
    }

    #[test]
    fn no_active_document() {
        assert_eq!(context_keys(true, None), ContextKeys::default());
    }

    #[test]
    fn stata_with_cells() {
        let keys = context_keys(true, Some(&doc("stata", "* %%\nx")));
        assert!(keys.supports_code_cells);
        assert!(keys.has_code_cells);
    }

    #[test]
    fn stata_without_cells() {
        let keys = context_keys(true, Some(&doc("stata", "display 1")));
        assert!(keys.supports_code_cells);
        assert!(!keys.has_code_cells);
    }

    #[test]
    fn disabled_features_do_not_support_cells() {
        let keys = context_keys(false, Some(&doc("stata", "* %%\nx")));
        assert!(!keys.supports_code_cells);
        assert!(keys.has_code_cells);
    }

    #[test]
    fn unsupported_language() {
        let keys = context_keys(true, Some(&doc("python", "# %%\nx")));
        assert_eq!(keys, ContextKeys::default());
    }
}
