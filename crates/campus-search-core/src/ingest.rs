//! Event ingestion: fetch → merge → normalize → atomic batch upsert.
//!
//! The job is idempotent. Each run replaces every fetched event document
//! in full, so repeating a run with the same upstream payload leaves the
//! store unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::error::{Error, Result};
use crate::models::{Document, EVENTS_COLLECTION};
use crate::store::DocumentStore;

/// Keys kept from each upstream event record. Everything else is dropped.
pub const EVENT_KEYS: [&str; 12] = [
    "eventNoSqlId",
    "campusName",
    "eventName",
    "organizationName",
    "organizationUri",
    "description",
    "location",
    "isVirtualEventLink",
    "hasVirtualEventIntegration",
    "photoUri",
    "startDateTimeUtc",
    "endDateTimeUtc",
];

/// Field holding each event's external identifier.
pub const EVENT_ID_KEY: &str = "eventNoSqlId";

/// Raw payload returned by the events source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsPayload {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub upcoming_events: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub current_events: Vec<Value>,
}

/// An explicit `null` list is treated like an absent one.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl EventsPayload {
    /// Merge both lists into one batch: upcoming first, then current.
    pub fn into_batch(self) -> Vec<Value> {
        let mut batch = self.upcoming_events;
        batch.extend(self.current_events);
        batch
    }
}

/// Source of raw event records.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch one payload. Failures are
    /// [`Error::UpstreamUnavailable`](crate::error::Error::UpstreamUnavailable).
    async fn fetch(&self) -> Result<EventsPayload>;
}

/// Reduce a raw record to [`EVENT_KEYS`] and key it by its external id.
///
/// Returns `None` when the record is not an object or has no usable id
/// (a non-empty string, or a number rendered as text).
pub fn normalize_event(raw: &Value) -> Option<Document> {
    let obj = raw.as_object()?;
    let id = match obj.get(EVENT_ID_KEY)? {
        Value::String(s) if !s.trim().is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    let fields: Map<String, Value> = EVENT_KEYS
        .iter()
        .filter_map(|key| obj.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect();

    Some(Document::new(id, fields))
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Records received from upstream across both lists.
    pub fetched: usize,
    /// Documents written in the batch.
    pub written: usize,
    /// Records skipped for lacking an id.
    pub skipped: usize,
}

/// The ingestion job: one events source feeding one document store.
pub struct IngestionJob {
    source: Arc<dyn EventSource>,
    store: Arc<dyn DocumentStore>,
}

impl IngestionJob {
    pub fn new(source: Arc<dyn EventSource>, store: Arc<dyn DocumentStore>) -> Self {
        Self { source, store }
    }

    /// Run once.
    ///
    /// # Errors
    ///
    /// - `UpstreamUnavailable` if the fetch fails; nothing is written.
    /// - `StoreWriteFailed` if the batch commit fails; nothing is written.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<IngestReport> {
        let payload = self.source.fetch().await?;
        let batch = payload.into_batch();
        let fetched = batch.len();

        let mut docs = Vec::with_capacity(fetched);
        let mut skipped = 0usize;
        for raw in &batch {
            match normalize_event(raw) {
                Some(doc) => docs.push(doc),
                None => {
                    skipped += 1;
                    warn!("event record without {} skipped", EVENT_ID_KEY);
                }
            }
        }

        self.store
            .batch_upsert(EVENTS_COLLECTION, &docs)
            .await
            .map_err(|e| match e {
                Error::StoreWriteFailed(_) => e,
                other => Error::store_write(other.to_string()),
            })?;

        let report = IngestReport {
            fetched,
            written: docs.len(),
            skipped,
        };
        info!(
            fetched = report.fetched,
            written = report.written,
            skipped = report.skipped,
            "events ingested"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use serde_json::json;
    use std::sync::Mutex;

    struct StaticSource(EventsPayload);

    #[async_trait]
    impl EventSource for StaticSource {
        async fn fetch(&self) -> Result<EventsPayload> {
            Ok(self.0.clone())
        }
    }

    struct DownSource;

    #[async_trait]
    impl EventSource for DownSource {
        async fn fetch(&self) -> Result<EventsPayload> {
            Err(Error::upstream("events api returned 503"))
        }
    }

    /// A source whose payload can be swapped between runs.
    struct MutableSource(Mutex<EventsPayload>);

    #[async_trait]
    impl EventSource for MutableSource {
        async fn fetch(&self) -> Result<EventsPayload> {
            Ok(self.0.lock().unwrap().clone())
        }
    }

    struct RejectingStore;

    #[async_trait]
    impl DocumentStore for RejectingStore {
        async fn get(&self, _: &str, _: &str) -> Result<Option<Document>> {
            Ok(None)
        }

        async fn batch_upsert(&self, _: &str, _: &[Document]) -> Result<()> {
            Err(Error::upstream("commit aborted"))
        }

        async fn find_after(&self, _: &str, _: &str, _: &str, _: usize) -> Result<Vec<Document>> {
            Ok(Vec::new())
        }
    }

    fn payload() -> EventsPayload {
        EventsPayload {
            upcoming_events: vec![
                json!({
                    "eventNoSqlId": "e1",
                    "eventName": "Career Fair",
                    "startDateTimeUtc": "2024-09-10T14:00:00Z",
                    "rsvpCount": 40,
                    "tags": ["jobs"]
                }),
                json!({"eventName": "no id"}),
            ],
            current_events: vec![json!({
                "eventNoSqlId": "e2",
                "eventName": "Open Mic",
                "location": "Newcomb Hall"
            })],
        }
    }

    #[test]
    fn test_normalize_drops_unknown_keys() {
        let doc = normalize_event(&json!({
            "eventNoSqlId": "abc",
            "eventName": "Hack Night",
            "secret": "x"
        }))
        .unwrap();
        assert_eq!(doc.id, "abc");
        assert_eq!(doc.get("eventName"), Some(&json!("Hack Night")));
        assert!(doc.get("secret").is_none());
        assert!(doc.get("location").is_none());
    }

    #[test]
    fn test_normalize_rejects_missing_or_blank_id() {
        assert!(normalize_event(&json!({"eventName": "x"})).is_none());
        assert!(normalize_event(&json!({"eventNoSqlId": " "})).is_none());
        assert!(normalize_event(&json!({"eventNoSqlId": null})).is_none());
        assert!(normalize_event(&json!("not an object")).is_none());
        assert_eq!(
            normalize_event(&json!({"eventNoSqlId": 42})).unwrap().id,
            "42"
        );
    }

    #[test]
    fn test_payload_missing_lists_default_empty() {
        let p: EventsPayload = serde_json::from_value(json!({"currentEvents": [1]})).unwrap();
        assert!(p.upcoming_events.is_empty());
        assert_eq!(p.into_batch(), vec![json!(1)]);

        let p: EventsPayload = serde_json::from_value(json!({
            "upcomingEvents": null,
            "currentEvents": [{"eventNoSqlId": "a"}]
        }))
        .unwrap();
        assert_eq!(p.into_batch(), vec![json!({"eventNoSqlId": "a"})]);

        let p: EventsPayload =
            serde_json::from_value(json!({"upcomingEvents": null, "currentEvents": null})).unwrap();
        assert!(p.into_batch().is_empty());
    }

    #[tokio::test]
    async fn test_run_writes_normalized_batch() {
        let store = Arc::new(InMemoryStore::new());
        let job = IngestionJob::new(Arc::new(StaticSource(payload())), store.clone());

        let report = job.run().await.unwrap();
        assert_eq!(
            report,
            IngestReport {
                fetched: 3,
                written: 2,
                skipped: 1
            }
        );

        let e1 = store.get(EVENTS_COLLECTION, "e1").await.unwrap().unwrap();
        assert!(e1.get("rsvpCount").is_none());
        assert_eq!(e1.get("eventNoSqlId"), Some(&json!("e1")));
        assert!(store.get(EVENTS_COLLECTION, "e2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_run_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let job = IngestionJob::new(Arc::new(StaticSource(payload())), store.clone());

        job.run().await.unwrap();
        let first = store.snapshot(EVENTS_COLLECTION);
        job.run().await.unwrap();
        let second = store.snapshot(EVENTS_COLLECTION);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rerun_fully_replaces_document() {
        let store = Arc::new(InMemoryStore::new());
        let source = Arc::new(MutableSource(Mutex::new(EventsPayload {
            upcoming_events: vec![json!({
                "eventNoSqlId": "e1",
                "eventName": "Old",
                "location": "Rotunda"
            })],
            current_events: vec![],
        })));
        let job = IngestionJob::new(source.clone(), store.clone());
        job.run().await.unwrap();

        *source.0.lock().unwrap() = EventsPayload {
            upcoming_events: vec![json!({"eventNoSqlId": "e1", "eventName": "New"})],
            current_events: vec![],
        };
        job.run().await.unwrap();

        let e1 = store.get(EVENTS_COLLECTION, "e1").await.unwrap().unwrap();
        assert_eq!(e1.get("eventName"), Some(&json!("New")));
        assert!(e1.get("location").is_none(), "upsert must replace, not merge");
    }

    #[tokio::test]
    async fn test_fetch_failure_writes_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let job = IngestionJob::new(Arc::new(DownSource), store.clone());
        let err = job.run().await.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable(_)));
        assert_eq!(store.len(EVENTS_COLLECTION), 0);
    }

    #[tokio::test]
    async fn test_commit_failure_is_store_write_failed() {
        let job = IngestionJob::new(Arc::new(StaticSource(payload())), Arc::new(RejectingStore));
        let err = job.run().await.unwrap_err();
        assert!(matches!(err, Error::StoreWriteFailed(_)));
    }
}
