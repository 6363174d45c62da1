//! HTTP handlers.

use crate::error::{AppError, Result};
use crate::server::AppState;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use deck_core::BuildWarning;
use deck_pptx::{DeckBuilder, Template};
use serde::Deserialize;
use std::io;
use uuid::Uuid;

pub const DOWNLOAD_NAME: &str = "presentation.pptx";
pub const PPTX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const WARNING_COUNT_HEADER: &str = "x-deck-warning-count";
pub const WARNINGS_HEADER: &str = "x-deck-warnings";

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub text: Option<String>,
}

/// `GET /`: landing page.
pub async fn index(state: web::Data<AppState>) -> Result<HttpResponse> {
    let page = state.config.static_dir.join("index.html");
    let html = web::block(move || std::fs::read_to_string(page))
        .await
        .map_err(|e| AppError::Blocking(e.to_string()))?;

    match html {
        Ok(html) => Ok(HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(html)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(AppError::NotFound("index.html".to_string()))
        }
        Err(e) => Err(deck_core::Error::Io(e).into()),
    }
}

/// `POST /generate`: text in, `.pptx` out.
pub async fn generate(
    state: web::Data<AppState>,
    payload: web::Json<GenerateRequest>,
) -> Result<HttpResponse> {
    let text = payload.into_inner().text.ok_or(AppError::MissingText)?;
    let request_id = Uuid::new_v4().to_string();

    match generate_deck(&state, &text, &request_id).await {
        Ok(response) => Ok(response),
        Err(e) => {
            log::error!("[{}] Deck generation failed: {}", request_id, e);
            Err(e)
        }
    }
}

async fn generate_deck(state: &AppState, text: &str, request_id: &str) -> Result<HttpResponse> {
    let outline = state.fetcher.fetch_slides(text).await?;
    log::info!(
        "[{}] Outline has {} slide(s), {} warning(s)",
        request_id,
        outline.slides.len(),
        outline.warnings.len()
    );

    let output_dir = state.config.output_dir.clone();
    let template_path = state.config.template_path.clone();
    let layouts = state.config.layouts.clone();
    let slides = outline.slides;
    let file_prefix = format!("{}-", request_id);

    let deck = web::block(move || {
        let template = Template::open(&template_path)?;
        let deck = DeckBuilder::new(&template, &layouts).build(&slides)?;

        // Deleted when `output` drops; the response is served from memory.
        let output = tempfile::Builder::new()
            .prefix(&file_prefix)
            .suffix(".pptx")
            .tempfile_in(&output_dir)?;
        deck.save(output.path())?;
        Ok::<_, deck_core::Error>(deck)
    })
    .await
    .map_err(|e| AppError::Blocking(e.to_string()))??;

    let mut warnings = outline.warnings;
    warnings.extend(deck.report.warnings);
    log::info!(
        "[{}] Built deck with {} slide(s)",
        request_id,
        deck.report.slides.len()
    );

    let mut response = HttpResponse::Ok();
    response
        .content_type(PPTX_CONTENT_TYPE)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(DOWNLOAD_NAME.to_string())],
        })
        .insert_header((REQUEST_ID_HEADER, request_id.to_string()))
        .insert_header((WARNING_COUNT_HEADER, warnings.len().to_string()));
    if !warnings.is_empty() {
        response.insert_header((WARNINGS_HEADER, warnings_header(&warnings)?));
    }

    Ok(response.body(deck.bytes))
}

/// JSON array of warnings with every non-ASCII character `\u` escaped.
fn warnings_header(warnings: &[BuildWarning]) -> Result<String> {
    let json = serde_json::to_string(warnings).map_err(|e| AppError::Internal(e.into()))?;
    Ok(ascii_escape(&json))
}

fn ascii_escape(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}
