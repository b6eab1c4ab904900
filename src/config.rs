use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use campus_search_core::pipeline::{PipelineSettings, DEFAULT_MODEL, DEFAULT_TOP_K, MAX_TOP_K};
use campus_search_core::DomainTag;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub vector_index: VectorIndexConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_embedding_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_embedding_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// Vector index hosts, one per domain namespace.
#[derive(Debug, Deserialize, Clone)]
pub struct VectorIndexConfig {
    #[serde(default)]
    pub hosts: HashMap<String, String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            hosts: HashMap::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl VectorIndexConfig {
    /// Host configured for `domain`. Keys may use any spelling that
    /// parses as a [`DomainTag`], so `classes` resolves for courses.
    pub fn host_for(&self, domain: DomainTag) -> Option<&str> {
        self.hosts
            .iter()
            .find(|(key, _)| key.parse::<DomainTag>().ok() == Some(domain))
            .map(|(_, host)| host.as_str())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_source_url")]
    pub source_url: String,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_url: default_source_url(),
            interval_secs: default_interval_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_source_url() -> String {
    "https://api.presence.io/virginia/v1/dashboard/events".to_string()
}
fn default_interval_secs() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Config {
    /// Settings handed to the retrieval pipeline.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            model: self.embedding.model.clone(),
            top_k: self.retrieval.top_k,
        }
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

fn validate(config: &Config) -> Result<()> {
    if config.retrieval.top_k < 1 || config.retrieval.top_k > MAX_TOP_K {
        anyhow::bail!("retrieval.top_k must be between 1 and {}", MAX_TOP_K);
    }

    if config.embedding.model.trim().is_empty() {
        anyhow::bail!("embedding.model must not be empty");
    }

    if config.ingest.interval_secs == 0 {
        anyhow::bail!("ingest.interval_secs must be > 0");
    }

    let mut seen = Vec::new();
    for name in config.vector_index.hosts.keys() {
        let tag = name
            .parse::<DomainTag>()
            .map_err(|_| anyhow::anyhow!("vector_index.hosts has unknown domain '{}'", name))?;
        if seen.contains(&tag) {
            anyhow::bail!("vector_index.hosts lists {} more than once", tag);
        }
        seen.push(tag);
    }

    for (label, url) in [
        ("embedding.base_url", &config.embedding.base_url),
        ("ingest.source_url", &config.ingest.source_url),
    ]
    .into_iter()
    .chain(
        config
            .vector_index
            .hosts
            .values()
            .map(|u| ("vector_index.hosts", u)),
    ) {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("{} must be an http(s) URL, got '{}'", label, url);
        }
    }

    Ok(())
}
