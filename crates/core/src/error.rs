//! Error types for slide deck generation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing an outline or building a deck.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The template document is not present at the configured path.
    #[error("Template file '{}' does not exist.", .0.display())]
    TemplateNotFound(PathBuf),

    /// The template is a ZIP archive but not a usable presentation.
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// ZIP archive error.
    #[error("ZIP error: {0}")]
    Zip(String),

    /// XML parsing or writing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// The layout table points past the layouts the template provides.
    #[error("Layout index {index} ('{name}') is out of range: template has {available} layouts")]
    LayoutOutOfRange {
        name: String,
        index: usize,
        available: usize,
    },

    /// The outline text could not be understood.
    #[error("Error parsing API response: {0}")]
    OutlineParse(String),

    /// A layout table file could not be loaded.
    #[error("Invalid layout table: {0}")]
    InvalidLayoutTable(String),
}
