//! Core domain types, layout table, and outline parsing for turning an
//! inference outline into a slide deck.

pub mod error;
pub mod layout;
pub mod outline;
pub mod types;

pub use error::{Error, Result};
pub use layout::{LayoutMatch, LayoutTable, FALLBACK_LAYOUT_INDEX};
pub use outline::{parse_outline, strip_code_fence, Outline};
pub use types::{parse_placeholder_label, BuildWarning, PlaceholderText, SlideDescriptor, DEFAULT_LAYOUT};
