//! Pinecone vector index client.
//!
//! Each search domain has its own Pinecone index, so the namespace passed
//! by the pipeline selects an index host from `[vector_index.hosts]`.
//! Requires the `PINECONE_API_KEY` environment variable.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use campus_search_core::vector_index::VectorIndex;
use campus_search_core::{DomainTag, Error, Match, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::VectorIndexConfig;

/// Environment variable holding the Pinecone credential.
pub const API_KEY_ENV: &str = "PINECONE_API_KEY";

/// HTTP client for Pinecone's `POST /query` data-plane endpoint.
pub struct PineconeIndex {
    client: reqwest::Client,
    hosts: HashMap<String, String>,
    api_key: String,
}

impl PineconeIndex {
    /// Create a client from configuration, reading the key from `PINECONE_API_KEY`.
    pub fn new(config: &VectorIndexConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .with_context(|| format!("{} environment variable not set", API_KEY_ENV))?;
        Self::with_api_key(config, api_key)
    }

    /// Create a client with an explicit key.
    pub fn with_api_key(config: &VectorIndexConfig, api_key: String) -> anyhow::Result<Self> {
        if api_key.trim().is_empty() {
            bail!("missing Pinecone API key");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build vector index HTTP client")?;
        let hosts = DomainTag::ALL
            .into_iter()
            .filter_map(|tag| {
                config
                    .host_for(tag)
                    .map(|host| (tag.namespace().to_string(), host.trim_end_matches('/').to_string()))
            })
            .collect();
        Ok(Self {
            client,
            hosts,
            api_key: api_key.trim().to_string(),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_values: bool,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f64,
}

impl From<QueryResponse> for Vec<Match> {
    fn from(resp: QueryResponse) -> Self {
        resp.matches
            .into_iter()
            .map(|m| Match::new(m.id, m.score))
            .collect()
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<Match>> {
        let host = self.hosts.get(namespace).ok_or_else(|| {
            Error::upstream(format!("no vector index host configured for '{}'", namespace))
        })?;

        let request = QueryRequest {
            vector,
            top_k,
            include_values: false,
            include_metadata: false,
        };

        let response = self
            .client
            .post(format!("{}/query", host))
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::upstream(format!("vector index request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::upstream(format!(
                "vector index error {}: {}",
                status, body_text
            )));
        }

        let payload: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::upstream(format!("invalid vector index response: {}", e)))?;
        let mut matches: Vec<Match> = payload.into();
        matches.truncate(top_k);
        debug!(namespace, matches = matches.len(), "vector index answered");
        Ok(matches)
    }
}
