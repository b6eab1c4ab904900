//! In-memory [`DocumentStore`] implementation for testing and local runs.
//!
//! Uses a `HashMap` per collection behind a single `std::sync::RwLock`.
//! A batch upsert holds the write lock for the whole batch, so readers see
//! either none or all of it.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::Document;

use super::DocumentStore;

type Collection = HashMap<String, Map<String, Value>>;

/// In-memory document store.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a single document outside of the batch path.
    pub fn insert(&self, collection: &str, doc: Document) {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(doc.id, doc.fields);
    }

    /// Number of documents in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    /// Snapshot of `collection`, sorted by id.
    pub fn snapshot(&self, collection: &str) -> Vec<Document> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut docs: Vec<Document> = collections
            .get(collection)
            .map(|c| {
                c.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        docs
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| Error::upstream("document store lock poisoned"))?;
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn batch_upsert(&self, collection: &str, docs: &[Document]) -> Result<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| Error::store_write("document store lock poisoned"))?;
        let target = collections.entry(collection.to_string()).or_default();
        for doc in docs {
            target.insert(doc.id.clone(), doc.fields.clone());
        }
        Ok(())
    }

    async fn find_after(
        &self,
        collection: &str,
        field: &str,
        after: &str,
        limit: usize,
    ) -> Result<Vec<Document>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| Error::upstream("document store lock poisoned"))?;
        let Some(c) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<(&str, &String, &Map<String, Value>)> = c
            .iter()
            .filter_map(|(id, fields)| {
                let key = fields.get(field)?.as_str()?;
                (key > after).then_some((key, id, fields))
            })
            .collect();
        hits.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.cmp(b.1)));
        hits.truncate(limit);

        Ok(hits
            .into_iter()
            .map(|(_, id, fields)| Document::new(id.clone(), fields.clone()))
            .collect())
    }
}
