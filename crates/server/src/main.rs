//! Deck generation web service.

use anyhow::{Context, Result};
use clap::Parser;
use deck_server::{AppConfig, ConfigOverrides};
use std::path::PathBuf;

/// Serve the landing page and the /generate endpoint.
#[derive(Parser, Debug)]
#[command(name = "deck-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Listen address (default: $HOST or 0.0.0.0)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (default: $PORT or 5000)
    #[arg(short, long)]
    port: Option<u16>,

    /// Inference endpoint URL (default: $DECK_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// User id sent with each inference request
    #[arg(long)]
    user_id: Option<String>,

    /// Inference request timeout in seconds
    #[arg(long)]
    api_timeout: Option<u64>,

    /// Template .pptx file
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Directory for generated decks
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Directory holding index.html
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// JSON file mapping layout names to template layout indices
    #[arg(long)]
    layouts: Option<PathBuf>,
}

impl From<Args> for ConfigOverrides {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            api_url: args.api_url,
            user_id: args.user_id,
            api_timeout_secs: args.api_timeout,
            template_path: args.template,
            output_dir: args.output_dir,
            static_dir: args.static_dir,
            layout_table: args.layouts,
        }
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let overrides = ConfigOverrides::from(Args::parse());
    let config = AppConfig::from_env(&overrides).context("Invalid configuration")?;
    log::debug!("Configuration: {:?}", config);

    deck_server::run(config).await
}
