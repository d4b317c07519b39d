// Copy sanitization for identifiers rendered with zero-width break markers

use crate::dom::Document;
use std::fmt;
use tracing::debug;

/// Underscore followed by a zero-width space, the break opportunity in long identifiers
const UNDERSCORE_BREAK: &str = "_\u{200B}";

const COPY_LISTENER: &str = "remove-zero-width-underscores";

#[derive(Debug, Clone, PartialEq)]
pub enum ClipboardError {
    /// The copy listener is already registered on this page
    AlreadyPatched,
}

impl fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipboardError::AlreadyPatched => {
                write!(f, "copy sanitizer is already installed on this page")
            }
        }
    }
}

impl std::error::Error for ClipboardError {}

/// Let long names wrap on underscores instead of arbitrary characters
pub fn break_on_underscores(text: &str) -> String {
    text.replace('_', UNDERSCORE_BREAK)
}

/// Undo [`break_on_underscores`]. A zero-width space not preceded by `_` is kept.
pub fn strip_underscore_breaks(text: &str) -> String {
    text.replace(UNDERSCORE_BREAK, "_")
}

/// Strip underscore break markers from every copy on `document`.
///
/// Must run once per page; a second call fails with `AlreadyPatched`.
pub fn patch_copy_to_remove_zero_width_underscores(
    document: &mut Document,
) -> Result<(), ClipboardError> {
    let installed = document.add_copy_listener(COPY_LISTENER, |event| {
        let text = strip_underscore_breaks(event.selection());
        event.prevent_default();
        event.set_clipboard_data(text);
    });

    if !installed {
        return Err(ClipboardError::AlreadyPatched);
    }

    debug!("Copy sanitizer installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_and_strip() {
        let broken = break_on_underscores("my_long_solid_name");
        assert_eq!(broken, "my_\u{200B}long_\u{200B}solid_\u{200B}name");
        assert_eq!(strip_underscore_breaks(&broken), "my_long_solid_name");
    }

    #[test]
    fn test_strip_preserves_other_characters() {
        let text = "ünïcødé\u{200B} tabs\t and\u{200C}joiners\u{200D} snake_\u{200B}case";
        assert_eq!(
            strip_underscore_breaks(text),
            "ünïcødé\u{200B} tabs\t and\u{200C}joiners\u{200D} snake_case"
        );
    }

    #[test]
    fn test_patched_copy_removes_markers_every_time() {
        let mut document = Document::new();
        patch_copy_to_remove_zero_width_underscores(&mut document).unwrap();

        let selection = break_on_underscores("compute_cereal_properties");
        for _ in 0..3 {
            assert_eq!(document.copy(&selection), Some("compute_cereal_properties"));
        }
        assert_eq!(document.copy("plain text"), Some("plain text"));
    }

    #[test]
    fn test_patched_copy_keeps_standalone_zero_width_space() {
        let mut document = Document::new();
        patch_copy_to_remove_zero_width_underscores(&mut document).unwrap();

        assert_eq!(document.copy("a\u{200B}b_\u{200B}c"), Some("a\u{200B}b_c"));
        assert_eq!(document.copy("\u{200B}_"), Some("\u{200B}_"));
    }

    #[test]
    fn test_patch_twice_fails() {
        let mut document = Document::new();
        patch_copy_to_remove_zero_width_underscores(&mut document).unwrap();
        assert_eq!(
            patch_copy_to_remove_zero_width_underscores(&mut document),
            Err(ClipboardError::AlreadyPatched)
        );

        // Still a single listener: markers stripped exactly once
        assert_eq!(document.copy("a_\u{200B}b"), Some("a_b"));
    }
}
