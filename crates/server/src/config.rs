//! Configuration management for the deck service.
//!
//! Settings come from environment variables (a `.env` file is loaded first
//! by the binary) and can be overridden from the command line.
//!
//! Environment variables:
//! - `HOST`: listen address (default: 0.0.0.0)
//! - `PORT`: listen port (default: 5000)
//! - `DECK_API_URL`: inference endpoint (required)
//! - `DECK_API_TOKEN`: bearer token for the endpoint (required)
//! - `DECK_USER_ID`: user id sent with each request (default: 12345)
//! - `DECK_API_TIMEOUT_SECS`: request timeout in seconds (default: 120)
//! - `DECK_TEMPLATE_PATH`: template document (default: template.pptx)
//! - `DECK_OUTPUT_DIR`: where generated decks are written (default: ./output)
//! - `DECK_STATIC_DIR`: directory holding index.html (default: templates)
//! - `DECK_LAYOUT_TABLE`: JSON file replacing the built-in layout table

use deck_core::LayoutTable;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_USER_ID: &str = "12345";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_TEMPLATE_PATH: &str = "template.pptx";
pub const DEFAULT_OUTPUT_DIR: &str = "./output";
pub const DEFAULT_STATIC_DIR: &str = "templates";

/// Errors raised while assembling the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to load layout table: {0}")]
    Layouts(#[from] deck_core::Error),
}

/// Full service configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub api: ApiConfig,
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    pub static_dir: PathBuf,
    pub layouts: LayoutTable,
}

/// Settings for the inference endpoint.
#[derive(Clone)]
pub struct ApiConfig {
    pub url: String,
    pub token: String,
    pub user_id: String,
    pub timeout: Duration,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Values given on the command line; `None` keeps the environment's value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub api_url: Option<String>,
    pub user_id: Option<String>,
    pub api_timeout_secs: Option<u64>,
    pub template_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub layout_table: Option<PathBuf>,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::load(overrides, |key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn load<F>(overrides: &ConfigOverrides, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match overrides.port {
            Some(port) => port,
            None => parse_var(&var, "PORT")?.unwrap_or(DEFAULT_PORT),
        };
        let timeout_secs = match overrides.api_timeout_secs {
            Some(secs) => secs,
            None => parse_var(&var, "DECK_API_TIMEOUT_SECS")?.unwrap_or(DEFAULT_API_TIMEOUT_SECS),
        };

        let url = overrides
            .api_url
            .clone()
            .or_else(|| var("DECK_API_URL"))
            .ok_or(ConfigError::Missing("DECK_API_URL"))?;
        let token = var("DECK_API_TOKEN").ok_or(ConfigError::Missing("DECK_API_TOKEN"))?;

        let layouts = match overrides
            .layout_table
            .clone()
            .or_else(|| var("DECK_LAYOUT_TABLE").map(PathBuf::from))
        {
            Some(path) => LayoutTable::load(&path)?,
            None => LayoutTable::default(),
        };

        Ok(Self {
            host: overrides
                .host
                .clone()
                .or_else(|| var("HOST"))
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            api: ApiConfig {
                url,
                token,
                user_id: overrides
                    .user_id
                    .clone()
                    .or_else(|| var("DECK_USER_ID"))
                    .unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            template_path: path_setting(&overrides.template_path, &var, "DECK_TEMPLATE_PATH", DEFAULT_TEMPLATE_PATH),
            output_dir: path_setting(&overrides.output_dir, &var, "DECK_OUTPUT_DIR", DEFAULT_OUTPUT_DIR),
            static_dir: path_setting(&overrides.static_dir, &var, "DECK_STATIC_DIR", DEFAULT_STATIC_DIR),
            layouts,
        })
    }
}

fn parse_var<T, F>(var: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                var: key,
                value,
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

fn path_setting<F>(overridden: &Option<PathBuf>, var: &F, key: &str, default: &str) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    overridden
        .clone()
        .or_else(|| var(key).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(default))
}
