//! Domain types for describing the slides of a generated deck.

use serde::{Deserialize, Serialize};

/// Layout name used when a descriptor does not carry one.
pub const DEFAULT_LAYOUT: &str = "title";

/// One slide to append to the deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideDescriptor {
    /// Name looked up in the layout table.
    pub layout: String,

    /// Placeholder label and text pairs, in outline order.
    pub content: Vec<PlaceholderText>,
}

impl SlideDescriptor {
    /// Create a descriptor with the given layout and no content.
    pub fn new(layout: impl Into<String>) -> Self {
        Self {
            layout: layout.into(),
            content: Vec::new(),
        }
    }

    /// Add a placeholder entry, builder style.
    pub fn with_text(mut self, label: impl Into<String>, text: impl Into<String>) -> Self {
        self.content.push(PlaceholderText::new(label, text));
        self
    }
}

impl Default for SlideDescriptor {
    fn default() -> Self {
        Self::new(DEFAULT_LAYOUT)
    }
}

/// Text destined for one placeholder, addressed by a label like `"body 1"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderText {
    pub label: String,
    pub text: String,
}

impl PlaceholderText {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }

    /// The placeholder index encoded in the label.
    ///
    /// The label is split on whitespace and the second token must parse as a
    /// non-negative integer: `"placeholder 0"` and `"body 2"` resolve, while
    /// `"title"`, `"body two"` and `"body -1"` do not.
    pub fn placeholder_idx(&self) -> Option<u32> {
        parse_placeholder_label(&self.label)
    }
}

/// Parse the placeholder index out of a `"<word> <integer>"` label.
pub fn parse_placeholder_label(label: &str) -> Option<u32> {
    label.split_whitespace().nth(1)?.parse().ok()
}

/// Something the best-effort build skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildWarning {
    /// 1-based slide position in the outline, if the warning concerns a slide.
    pub slide: Option<usize>,

    pub message: String,
}

impl BuildWarning {
    /// A warning about the outline as a whole.
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            slide: None,
            message: message.into(),
        }
    }

    /// A warning about one slide.
    pub fn for_slide(slide: usize, message: impl Into<String>) -> Self {
        Self {
            slide: Some(slide),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.slide {
            Some(n) => write!(f, "slide {}: {}", n, self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_placeholder_label() {
        assert_eq!(parse_placeholder_label("placeholder 0"), Some(0));
        assert_eq!(parse_placeholder_label("body 12"), Some(12));
        assert_eq!(parse_placeholder_label("  body   3 "), Some(3));
        assert_eq!(parse_placeholder_label("body 2 extra"), Some(2));
    }

    #[test]
    fn test_parse_placeholder_label_rejects_malformed() {
        assert_eq!(parse_placeholder_label("title"), None);
        assert_eq!(parse_placeholder_label(""), None);
        assert_eq!(parse_placeholder_label("body two"), None);
        assert_eq!(parse_placeholder_label("body -1"), None);
        assert_eq!(parse_placeholder_label("body 1.5"), None);
    }

    #[test]
    fn test_descriptor_builder() {
        let slide = SlideDescriptor::default()
            .with_text("placeholder 0", "Hello")
            .with_text("placeholder 1", "World");

        assert_eq!(slide.layout, "title");
        assert_eq!(slide.content.len(), 2);
        assert_eq!(slide.content[1].placeholder_idx(), Some(1));
    }

    #[test]
    fn test_warning_display() {
        assert_eq!(BuildWarning::for_slide(2, "skipped").to_string(), "slide 2: skipped");
        assert_eq!(BuildWarning::general("no slides").to_string(), "no slides");
    }
}
