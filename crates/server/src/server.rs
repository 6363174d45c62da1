//! HTTP server assembly and startup.

use crate::config::AppConfig;
use crate::error::AppError;
use crate::fetcher::{FetchError, OutlineFetcher};
use crate::handlers;
use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use deck_pptx::Template;
use log::{info, warn};

/// Shared, read-only state handed to every worker.
pub struct AppState {
    pub config: AppConfig,
    pub fetcher: OutlineFetcher,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, FetchError> {
        let fetcher = OutlineFetcher::new(&config.api)?;
        Ok(Self { config, fetcher })
    }
}

pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(err.to_string()).into()
    }))
    .route("/", web::get().to(handlers::index))
    .route("/generate", web::post().to(handlers::generate));
}

/// Warn early about a template the layout table cannot be used with.
fn check_template(config: &AppConfig) {
    if !config.template_path.is_file() {
        warn!(
            "Template {} not found; /generate will fail until it exists",
            config.template_path.display()
        );
        return;
    }

    match Template::open(&config.template_path) {
        Ok(template) if template.layouts().len() <= config.layouts.max_index() => warn!(
            "Template {} has {} layouts but the layout table references index {}",
            config.template_path.display(),
            template.layouts().len(),
            config.layouts.max_index()
        ),
        Ok(template) => info!(
            "Template {} has {} layouts",
            config.template_path.display(),
            template.layouts().len()
        ),
        Err(e) => warn!("Template {} is unusable: {}", config.template_path.display(), e),
    }
}

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;
    check_template(&config);

    let bind = (config.host.clone(), config.port);
    info!("Layout table has {} entries", config.layouts.len());

    let state = web::Data::new(AppState::new(config).context("Failed to build HTTP client")?);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .configure(app_config)
    })
    .bind((bind.0.as_str(), bind.1))
    .with_context(|| format!("Failed to bind {}:{}", bind.0, bind.1))?
    .run();

    info!("Starting deck service on http://{}:{}", bind.0, bind.1);
    server.await.context("Server error")
}
