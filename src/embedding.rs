//! OpenAI embedding client.
//!
//! Implements the core [`EmbeddingClient`] trait against the
//! `POST {base_url}/embeddings` endpoint. Requires the `OPENAI_API_KEY`
//! environment variable.
//!
//! # Error Mapping
//!
//! The client makes exactly one call per query and never retries:
//! - Network errors and timeouts → `UpstreamUnavailable`
//! - HTTP 400/404 whose body mentions the model → `InvalidModel`
//! - Any other non-success status → `UpstreamUnavailable`

use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use campus_search_core::embedding::{EmbeddingClient, EmbeddingVector};
use campus_search_core::{Error, Result};
use reqwest::StatusCode;
use tracing::debug;

use crate::config::EmbeddingConfig;

/// Environment variable holding the OpenAI credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Embedding client for the OpenAI API (or any compatible endpoint).
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OpenAIEmbedder {
    /// Create a client from configuration, reading the key from `OPENAI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not set or the HTTP client cannot be built.
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .with_context(|| format!("{} environment variable not set", API_KEY_ENV))?;
        Self::with_api_key(config, api_key)
    }

    /// Create a client with an explicit key.
    pub fn with_api_key(config: &EmbeddingConfig, api_key: String) -> anyhow::Result<Self> {
        if api_key.trim().is_empty() {
            bail!("missing OpenAI API key");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build embedding HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            api_key: api_key.trim().to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingClient for OpenAIEmbedder {
    async fn embed(&self, text: &str, model: &str) -> Result<EmbeddingVector> {
        let body = serde_json::json!({
            "model": model,
            "input": text,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::upstream(format!("embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body_text));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::upstream(format!("invalid embedding response: {}", e)))?;
        let vector = parse_openai_response(&json)?;
        debug!(model, dims = vector.len(), "embedding received");
        Ok(vector)
    }
}

/// Map a non-success embedding response to the error taxonomy.
fn classify_failure(status: StatusCode, body: &str) -> Error {
    let mentions_model = body.to_ascii_lowercase().contains("model");
    if matches!(status, StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND) && mentions_model {
        Error::invalid_model(format!("OpenAI API error {}: {}", status, body))
    } else {
        Error::upstream(format!("OpenAI API error {}: {}", status, body))
    }
}

/// Extract `data[0].embedding` from an OpenAI embeddings response.
fn parse_openai_response(json: &serde_json::Value) -> Result<EmbeddingVector> {
    let first = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .ok_or_else(|| Error::upstream("Invalid OpenAI response: missing data array"))?;

    let embedding = first
        .get("embedding")
        .and_then(|e| e.as_array())
        .ok_or_else(|| Error::upstream("Invalid OpenAI response: missing embedding"))?;

    embedding
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| Error::upstream("Invalid OpenAI response: non-numeric embedding"))
        })
        .collect()
}
