//! Upcoming events listing for the CLI.

use anyhow::Result;
use campus_search_core::events::upcoming_events;
use campus_search_core::ProjectedRecord;
use chrono::Utc;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// Next `limit` events (default `retrieval.top_k`) after the current time.
pub async fn list_upcoming(config: &Config, limit: Option<usize>) -> Result<Vec<ProjectedRecord>> {
    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;
    let store = SqliteStore::new(pool.clone());
    let limit = limit.unwrap_or(config.retrieval.top_k);

    let result = upcoming_events(&store, Utc::now(), limit).await;
    pool.close().await;
    Ok(result?)
}

/// CLI entry point for `campus events`.
pub async fn run_events(config: &Config, limit: Option<usize>) -> Result<()> {
    let events = list_upcoming(config, limit).await?;
    println!("{}", serde_json::to_string_pretty(&events)?);
    Ok(())
}
