//! Client for the inference endpoint that turns free text into a slide outline.

use crate::config::ApiConfig;
use deck_core::{parse_outline, Outline};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Upstream failures. All of them surface as 500 to the caller.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("API request failed with status code {0}")]
    Status(u16),

    #[error("API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("'out-1' key not found in the API response.")]
    MissingOutput,

    #[error("Error parsing API response: {0}")]
    Parse(String),

    #[error(transparent)]
    Outline(#[from] deck_core::Error),
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    user_id: &'a str,
    #[serde(rename = "in-0")]
    input: &'a str,
}

/// Calls the inference endpoint and parses its answer into an [`Outline`].
#[derive(Clone)]
pub struct OutlineFetcher {
    client: Client,
    url: String,
    token: String,
    user_id: String,
}

impl OutlineFetcher {
    pub fn new(config: &ApiConfig) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            token: config.token.clone(),
            user_id: config.user_id.clone(),
        })
    }

    /// One POST per call, no retries.
    pub async fn fetch_slides(&self, text: &str) -> Result<Outline, FetchError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&GenerateRequest {
                user_id: &self.user_id,
                input: text,
            })
            .send()
            .await
            .map_err(|e| {
                log::warn!("Inference request failed: {}", e);
                FetchError::Transport(e)
            })?;

        let status = response.status();
        log::debug!("Inference API responded with {}", status);
        if status != StatusCode::OK {
            log::warn!("Inference API returned status {}", status.as_u16());
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let raw = extract_output(&body)?;
        Ok(parse_outline(&raw)?)
    }
}

/// Pull `outputs.out-1` out of a response body.
fn extract_output(body: &str) -> Result<String, FetchError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    match value.get("outputs").and_then(|outputs| outputs.get("out-1")) {
        None | Some(Value::Null) => Err(FetchError::MissingOutput),
        Some(Value::String(s)) if s.trim().is_empty() => Err(FetchError::MissingOutput),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(FetchError::Parse(format!(
            "'out-1' is not a string: {}",
            other
        ))),
    }
}
