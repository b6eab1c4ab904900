//! Retrieval pipeline: embed → vector search → hydrate → project.
//!
//! One [`Retriever`] serves every search domain. Per-domain behavior comes
//! entirely from the [`DomainProjector`] registered for the domain, so the
//! three search endpoints share a single code path.
//!
//! # Stages
//!
//! 1. Validate the query (the only request-shape check in the core).
//! 2. Embed the query with the configured model.
//! 3. Query the domain's namespace for `top_k` matches.
//! 4. Hydrate every match concurrently from the document store.
//! 5. Drop matches whose document no longer exists.
//! 6. Project the survivors, preserving the index's relevance order.
//!
//! A failure in any stage aborts the request. A missing document is not a
//! failure.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, instrument};

use crate::embedding::EmbeddingClient;
use crate::error::{Error, Result};
use crate::models::{DomainTag, ProjectedRecord};
use crate::projection::{self, DomainProjector};
use crate::store::DocumentStore;
use crate::vector_index::VectorIndex;

/// Default embedding model.
pub const DEFAULT_MODEL: &str = "text-embedding-ada-002";

/// Default number of matches requested from the vector index.
pub const DEFAULT_TOP_K: usize = 3;

/// Largest `top_k` a search may request; it bounds the hydration fan-out.
pub const MAX_TOP_K: usize = 20;

/// Process-wide retrieval settings, fixed at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Embedding model name passed to the embedding client.
    pub model: String,
    /// Matches requested when the caller does not override it.
    pub top_k: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// One search invocation.
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    pub domain: DomainTag,
    /// Query text; `None` models a request without a query field.
    pub query: Option<&'a str>,
    /// Overrides [`PipelineSettings::top_k`] when set.
    pub top_k: Option<usize>,
}

impl<'a> SearchRequest<'a> {
    pub fn new(domain: DomainTag, query: &'a str) -> Self {
        Self {
            domain,
            query: Some(query),
            top_k: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

/// The retrieval pipeline, composed of its three collaborators and a
/// projector per domain.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn DocumentStore>,
    projectors: HashMap<DomainTag, Arc<dyn DomainProjector>>,
    settings: PipelineSettings,
}

impl Retriever {
    /// Build a retriever with the default projection for every domain.
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn DocumentStore>,
        settings: PipelineSettings,
    ) -> Self {
        let projectors = DomainTag::ALL
            .into_iter()
            .map(|tag| {
                let p: Arc<dyn DomainProjector> = Arc::new(projection::for_domain(tag));
                (tag, p)
            })
            .collect();
        Self {
            embedder,
            index,
            store,
            projectors,
            settings,
        }
    }

    /// Replace the projector used for `domain`.
    pub fn with_projector(mut self, domain: DomainTag, projector: Arc<dyn DomainProjector>) -> Self {
        self.projectors.insert(domain, projector);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Convenience wrapper for [`search`](Retriever::search) with the default `top_k`.
    pub async fn search_text(&self, domain: DomainTag, query: &str) -> Result<Vec<ProjectedRecord>> {
        self.search(SearchRequest::new(domain, query)).await
    }

    /// Run the full pipeline for one request.
    ///
    /// Returns at most `top_k` records in descending relevance.
    #[instrument(skip(self, req), fields(domain = %req.domain))]
    pub async fn search(&self, req: SearchRequest<'_>) -> Result<Vec<ProjectedRecord>> {
        let query = match req.query {
            None => return Err(Error::bad_request("No query provided")),
            Some(q) if q.trim().is_empty() => {
                return Err(Error::bad_request("query must not be empty"))
            }
            Some(q) => q,
        };
        let top_k = req.top_k.unwrap_or(self.settings.top_k);
        if top_k == 0 {
            return Err(Error::bad_request("top_k must be >= 1"));
        }
        if top_k > MAX_TOP_K {
            return Err(Error::bad_request(format!("top_k must be <= {}", MAX_TOP_K)));
        }
        let projector = self.projectors.get(&req.domain).ok_or_else(|| {
            Error::bad_request(format!("no projector registered for {}", req.domain))
        })?;

        let vector = self.embedder.embed(query, &self.settings.model).await?;
        debug!(dims = vector.len(), "query embedded");

        let mut matches = self
            .index
            .query(req.domain.namespace(), &vector, top_k)
            .await?;
        matches.truncate(top_k);
        debug!(matches = matches.len(), "vector index queried");

        let collection = req.domain.collection();
        let docs = try_join_all(
            matches
                .iter()
                .map(|m| self.store.get(collection, &m.id)),
        )
        .await?;

        let records: Vec<ProjectedRecord> = matches
            .iter()
            .zip(docs)
            .filter_map(|(m, doc)| match doc {
                Some(doc) => Some(projector.project(&doc, m.score)),
                None => {
                    debug!(id = %m.id, "match has no stored document; dropped");
                    None
                }
            })
            .collect();

        debug!(records = records.len(), "search complete");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, Match};
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedEmbedder {
        calls: AtomicUsize,
        seen_model: Mutex<Option<String>>,
        fail: Option<Error>,
    }

    impl FixedEmbedder {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                seen_model: Mutex::new(None),
                fail: None,
            })
        }

        fn failing(err: Error) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                seen_model: Mutex::new(None),
                fail: Some(err),
            })
        }
    }

    #[async_trait]
    impl EmbeddingClient for FixedEmbedder {
        async fn embed(&self, _text: &str, model: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_model.lock().unwrap() = Some(model.to_string());
            match &self.fail {
                Some(e) => Err(e.clone()),
                None => Ok(vec![0.1, 0.2, 0.3]),
            }
        }
    }

    /// Returns a canned match list for any namespace it was given.
    struct CannedIndex {
        namespace: &'static str,
        matches: Vec<Match>,
    }

    #[async_trait]
    impl VectorIndex for CannedIndex {
        async fn query(&self, namespace: &str, _vector: &[f32], top_k: usize) -> Result<Vec<Match>> {
            if namespace != self.namespace {
                return Ok(Vec::new());
            }
            Ok(self.matches.iter().take(top_k).cloned().collect())
        }
    }

    struct FailingIndex;

    #[async_trait]
    impl VectorIndex for FailingIndex {
        async fn query(&self, _: &str, _: &[f32], _: usize) -> Result<Vec<Match>> {
            Err(Error::upstream("index down"))
        }
    }

    /// Errors on one id, delegates everything else.
    struct FlakyStore {
        inner: InMemoryStore,
        broken_id: &'static str,
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
            if id == self.broken_id {
                return Err(Error::upstream("read timed out"));
            }
            self.inner.get(collection, id).await
        }

        async fn batch_upsert(&self, collection: &str, docs: &[Document]) -> Result<()> {
            self.inner.batch_upsert(collection, docs).await
        }

        async fn find_after(
            &self,
            collection: &str,
            field: &str,
            after: &str,
            limit: usize,
        ) -> Result<Vec<Document>> {
            self.inner.find_after(collection, field, after, limit).await
        }
    }

    fn course_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.insert(
            "courses",
            Document::from_value(
                "CS1110",
                json!({
                    "title": "Program and Data Representation",
                    "mnemonic": "CS",
                    "number": "1110",
                    "avg_rating": 4.2
                }),
            ),
        );
        for (id, title) in [("CS2100", "Data Structures"), ("CS3100", "Algorithms")] {
            let (mnemonic, number) = id.split_at(2);
            store.insert(
                "courses",
                Document::from_value(
                    id,
                    json!({"title": title, "mnemonic": mnemonic, "number": number}),
                ),
            );
        }
        store
    }

    fn retriever(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn DocumentStore>,
    ) -> Retriever {
        Retriever::new(embedder, index, store, PipelineSettings::default())
    }

    #[tokio::test]
    async fn test_course_scenario() {
        let index = Arc::new(CannedIndex {
            namespace: "courses",
            matches: vec![Match::new("CS1110", 0.92)],
        });
        let r = retriever(FixedEmbedder::ok(), index, Arc::new(course_store()));

        let results = r
            .search_text(DomainTag::Courses, "intro to programming")
            .await
            .unwrap();
        let out = serde_json::to_value(&results).unwrap();
        assert_eq!(
            out,
            json!([{
                "title": "Program and Data Representation",
                "score": 0.92,
                "avg_rating": 4.2,
                "url": "https://thecourseforum.com/course/CS/1110",
                "ref": "CS 1110"
            }])
        );
    }

    #[tokio::test]
    async fn test_empty_and_missing_query_skip_embedding() {
        let embedder = FixedEmbedder::ok();
        let index = Arc::new(CannedIndex {
            namespace: "courses",
            matches: vec![],
        });
        let r = retriever(embedder.clone(), index, Arc::new(InMemoryStore::new()));

        for query in [Some(""), Some("   "), None] {
            let req = SearchRequest {
                domain: DomainTag::Courses,
                query,
                top_k: None,
            };
            let err = r.search(req).await.unwrap_err();
            assert!(matches!(err, Error::BadRequest(_)), "got {:?}", err);
        }
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_configured_model_is_used() {
        let embedder = FixedEmbedder::ok();
        let index = Arc::new(CannedIndex {
            namespace: "clubs",
            matches: vec![],
        });
        let settings = PipelineSettings {
            model: "text-embedding-3-small".to_string(),
            top_k: 3,
        };
        let r = Retriever::new(embedder.clone(), index, Arc::new(InMemoryStore::new()), settings);
        r.search_text(DomainTag::Clubs, "chess").await.unwrap();
        assert_eq!(
            embedder.seen_model.lock().unwrap().as_deref(),
            Some("text-embedding-3-small")
        );
    }

    #[tokio::test]
    async fn test_missing_documents_are_dropped_in_order() {
        let index = Arc::new(CannedIndex {
            namespace: "courses",
            matches: vec![
                Match::new("CS3100", 0.9),
                Match::new("GONE", 0.8),
                Match::new("CS1110", 0.7),
            ],
        });
        let r = retriever(FixedEmbedder::ok(), index, Arc::new(course_store()));

        let results = r.search_text(DomainTag::Courses, "algorithms").await.unwrap();
        assert_eq!(results.len(), 2);
        let refs: Vec<&Value> = results.iter().filter_map(|r| r.get("ref")).collect();
        assert_eq!(refs, vec![&json!("CS 3100"), &json!("CS 1110")]);

        let scores: Vec<f64> = results.iter().filter_map(|r| r.score()).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn test_result_len_bounded_by_top_k() {
        let index = Arc::new(CannedIndex {
            namespace: "courses",
            matches: vec![
                Match::new("CS1110", 0.9),
                Match::new("CS2100", 0.8),
                Match::new("CS3100", 0.7),
            ],
        });
        let r = retriever(FixedEmbedder::ok(), index, Arc::new(course_store()));

        let results = r
            .search(SearchRequest::new(DomainTag::Courses, "cs").with_top_k(2))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);

        let err = r
            .search(SearchRequest::new(DomainTag::Courses, "cs").with_top_k(0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));

        let err = r
            .search(SearchRequest::new(DomainTag::Courses, "cs").with_top_k(MAX_TOP_K + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_zero_matches_is_empty_result() {
        let index = Arc::new(CannedIndex {
            namespace: "professors",
            matches: vec![],
        });
        let r = retriever(FixedEmbedder::ok(), index, Arc::new(InMemoryStore::new()));
        let results = r.search_text(DomainTag::Professors, "robotics").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let index = Arc::new(FailingIndex);
        let r = retriever(
            FixedEmbedder::failing(Error::invalid_model("no such model")),
            index,
            Arc::new(InMemoryStore::new()),
        );
        let err = r.search_text(DomainTag::Clubs, "chess").await.unwrap_err();
        assert_eq!(err, Error::invalid_model("no such model"));
    }

    #[tokio::test]
    async fn test_index_failure_propagates() {
        let r = retriever(
            FixedEmbedder::ok(),
            Arc::new(FailingIndex),
            Arc::new(InMemoryStore::new()),
        );
        let err = r.search_text(DomainTag::Clubs, "chess").await.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_hydration_error_aborts_request() {
        let index = Arc::new(CannedIndex {
            namespace: "courses",
            matches: vec![Match::new("CS1110", 0.9), Match::new("CS2100", 0.8)],
        });
        let store = Arc::new(FlakyStore {
            inner: course_store(),
            broken_id: "CS2100",
        });
        let r = retriever(FixedEmbedder::ok(), index, store);
        let err = r.search_text(DomainTag::Courses, "data").await.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_custom_projector_override() {
        struct IdOnly;
        impl DomainProjector for IdOnly {
            fn project(&self, doc: &Document, score: f64) -> ProjectedRecord {
                let mut rec = ProjectedRecord::new();
                rec.insert("id", json!(doc.id));
                rec.insert("score", json!(score));
                rec
            }
        }

        let index = Arc::new(CannedIndex {
            namespace: "courses",
            matches: vec![Match::new("CS1110", 0.5)],
        });
        let r = retriever(FixedEmbedder::ok(), index, Arc::new(course_store()))
            .with_projector(DomainTag::Courses, Arc::new(IdOnly));
        let results = r.search_text(DomainTag::Courses, "x").await.unwrap();
        assert_eq!(
            serde_json::to_value(&results).unwrap(),
            json!([{"id": "CS1110", "score": 0.5}])
        );
    }
}
