//! Document store abstraction.
//!
//! The [`DocumentStore`] trait defines the operations search and ingestion
//! need from the shared key-value document collection, enabling pluggable
//! backends (SQLite, in-memory).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Document;

/// Abstract document store, one logical collection per domain.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get`](DocumentStore::get) | Hydrate one document by id |
/// | [`batch_upsert`](DocumentStore::batch_upsert) | Atomic insert-or-replace of many documents |
/// | [`find_after`](DocumentStore::find_after) | Documents whose field sorts after a value |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Retrieve a document by id.
    ///
    /// Returns `Ok(None)` when the document does not exist. Read failures
    /// are [`Error::UpstreamUnavailable`](crate::error::Error::UpstreamUnavailable);
    /// the two outcomes must stay distinct.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Insert or fully replace every document in `docs`, all or nothing.
    ///
    /// A replaced document keeps none of its previous fields. When `docs`
    /// holds the same id twice, the later entry wins. Failures are
    /// [`Error::StoreWriteFailed`](crate::error::Error::StoreWriteFailed) and
    /// leave the collection unchanged.
    async fn batch_upsert(&self, collection: &str, docs: &[Document]) -> Result<()>;

    /// Documents whose string `field` compares strictly greater than
    /// `after`, ascending by that field, at most `limit` of them.
    ///
    /// Documents without the field, or with a non-string value, are skipped.
    async fn find_after(
        &self,
        collection: &str,
        field: &str,
        after: &str,
        limit: usize,
    ) -> Result<Vec<Document>>;
}
