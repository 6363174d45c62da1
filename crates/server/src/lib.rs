//! Web service that turns free-form text into a slide deck.
//!
//! `POST /generate` sends the text to an inference endpoint, reads back a
//! slide outline and renders it against a `.pptx` template.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod handlers;
pub mod server;

pub use config::{AppConfig, ConfigOverrides};
pub use error::AppError;
pub use server::{app_config, run, AppState};
