//! Event ingestion wiring and the hourly scheduler.
//!
//! The job logic (merge, normalize, atomic upsert) lives in
//! `campus-search-core::ingest`. This module connects it to the HTTP events
//! source and SQLite, and runs it on a fixed interval while the server is up.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use campus_search_core::ingest::{IngestReport, IngestionJob};
use campus_search_core::store::DocumentStore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::config::Config;
use crate::db;
use crate::events_source::HttpEventSource;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// Build the ingestion job for the configured events source.
pub fn build_job(config: &Config, store: Arc<dyn DocumentStore>) -> Result<IngestionJob> {
    let source = HttpEventSource::new(&config.ingest)?;
    Ok(IngestionJob::new(Arc::new(source), store))
}

/// Run the ingestion job once against the SQLite store.
pub async fn run_ingest(config: &Config) -> Result<IngestReport> {
    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;
    let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::new(pool.clone()));
    let job = build_job(config, store)?;

    let report = job.run().await;
    pool.close().await;
    let report = report?;

    println!(
        "ingest events: fetched={} written={} skipped={}",
        report.fetched, report.written, report.skipped
    );
    Ok(report)
}

/// Run `job` every `interval`, starting immediately.
///
/// Failed runs are logged and the schedule continues; there is no retry
/// within a tick.
pub fn spawn_scheduler(job: Arc<IngestionJob>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = interval.as_secs(), "ingestion scheduler started");

        loop {
            ticker.tick().await;
            match job.run().await {
                Ok(report) => info!(
                    fetched = report.fetched,
                    written = report.written,
                    "scheduled ingestion finished"
                ),
                Err(e) => error!(error = %e, code = e.code(), "scheduled ingestion failed"),
            }
        }
    })
}
