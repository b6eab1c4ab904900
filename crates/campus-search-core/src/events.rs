//! Upcoming events listing.
//!
//! Reads the `events` collection written by the ingestion job and returns
//! the next events after a reference time, shaped by the events
//! projection. Start times are ISO-8601 UTC strings and are compared as
//! text.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::Result;
use crate::models::{ProjectedRecord, EVENTS_COLLECTION};
use crate::projection;
use crate::store::DocumentStore;

/// Field used to order and filter events.
pub const START_FIELD: &str = "startDateTimeUtc";

/// Render `now` the way event timestamps are compared (`2024-01-01T12:00:00.000Z`).
pub fn timestamp_key(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Events starting strictly after `now`, earliest first, at most `limit`.
pub async fn upcoming_events(
    store: &dyn DocumentStore,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<ProjectedRecord>> {
    let after = timestamp_key(now);
    let docs = store
        .find_after(EVENTS_COLLECTION, START_FIELD, &after, limit)
        .await?;
    let projection = projection::events();
    Ok(docs.iter().map(|doc| projection.apply(doc)).collect())
}
