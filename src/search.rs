//! Application-level search entry points.
//!
//! The pipeline itself lives in `campus-search-core::pipeline` and only
//! knows the provider traits. This module wires the configured providers
//! (OpenAI, Pinecone, SQLite) into a [`Retriever`] and prints CLI output.

use std::sync::Arc;

use anyhow::Result;
use campus_search_core::store::DocumentStore;
use campus_search_core::{DomainTag, ProjectedRecord, Retriever, SearchRequest};

use crate::config::Config;
use crate::db;
use crate::embedding::OpenAIEmbedder;
use crate::migrate;
use crate::sqlite_store::SqliteStore;
use crate::vector_index::PineconeIndex;

/// Build a retriever from configuration over the given document store.
///
/// Fails if either provider credential is missing from the environment.
pub fn build_retriever(config: &Config, store: Arc<dyn DocumentStore>) -> Result<Retriever> {
    let embedder = OpenAIEmbedder::new(&config.embedding)?;
    let index = PineconeIndex::new(&config.vector_index)?;
    Ok(Retriever::new(
        Arc::new(embedder),
        Arc::new(index),
        store,
        config.pipeline_settings(),
    ))
}

/// Run one search against the configured providers and SQLite store.
pub async fn search_documents(
    config: &Config,
    domain: DomainTag,
    query: &str,
    top_k: Option<usize>,
) -> Result<Vec<ProjectedRecord>> {
    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;
    let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::new(pool.clone()));
    let retriever = build_retriever(config, store)?;

    let mut req = SearchRequest::new(domain, query);
    req.top_k = top_k;
    let results = retriever.search(req).await;

    pool.close().await;
    Ok(results?)
}

/// CLI entry point. Calls [`search_documents`] and prints results to stdout.
pub async fn run_search(
    config: &Config,
    domain: DomainTag,
    query: &str,
    top_k: Option<usize>,
) -> Result<()> {
    let results = search_documents(config, domain, query, top_k).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, record) in results.iter().enumerate() {
        let label = ["title", "name", "ref"]
            .iter()
            .find_map(|k| record.get(k).and_then(|v| v.as_str()))
            .unwrap_or("(untitled)");
        println!("{}. [{:.3}] {}", i + 1, record.score().unwrap_or(0.0), label);
        if let Some(url) = record.get("url").and_then(|v| v.as_str()) {
            println!("    url: {}", url);
        }
    }
    println!();
    println!("{}", serde_json::to_string_pretty(&results)?);

    Ok(())
}
