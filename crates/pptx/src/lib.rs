//! PPTX (Office Open XML) backend for slide deck generation.
//!
//! Reads a `.pptx` template, appends slides built from outline descriptors,
//! and writes the result as a new package. Decks can be read back with the
//! [`DeckInspector`].

pub mod builder;
pub mod inspect;
pub mod template;

mod slide;
mod xml;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixture;

pub use builder::{BuildReport, BuiltDeck, DeckBuilder, SlideSummary};
pub use inspect::{DeckInspector, DeckSummary, SlideInfo};
pub use template::{LayoutInfo, PlaceholderInfo, Template};
