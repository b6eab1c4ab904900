//! HTTP events source.
//!
//! Fetches the campus events dashboard with a single `GET` (no
//! pagination) and hands the raw payload to the ingestion job.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use campus_search_core::ingest::{EventSource, EventsPayload};
use campus_search_core::{Error, Result};
use tracing::debug;

use crate::config::IngestConfig;

/// Events source backed by the presence dashboard API.
pub struct HttpEventSource {
    client: reqwest::Client,
    url: String,
}

impl HttpEventSource {
    pub fn new(config: &IngestConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build events HTTP client")?;
        Ok(Self {
            client,
            url: config.source_url.clone(),
        })
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn fetch(&self) -> Result<EventsPayload> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::upstream(format!("events fetch failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream(format!(
                "events source returned {} for {}",
                status, self.url
            )));
        }

        let payload: EventsPayload = response
            .json()
            .await
            .map_err(|e| Error::upstream(format!("invalid events payload: {}", e)))?;
        debug!(
            upcoming = payload.upcoming_events.len(),
            current = payload.current_events.len(),
            "events fetched"
        );
        Ok(payload)
    }
}
