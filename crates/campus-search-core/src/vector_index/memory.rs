//! In-memory [`VectorIndex`] for tests and local runs.
//!
//! Brute-force cosine similarity over every vector in the namespace.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::{Error, Result};
use crate::models::Match;

use super::VectorIndex;

struct StoredVector {
    id: String,
    vector: Vec<f32>,
}

/// In-memory vector index keyed by namespace.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    namespaces: RwLock<HashMap<String, Vec<StoredVector>>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the vector stored under `id`.
    pub fn upsert(&self, namespace: &str, id: &str, vector: Vec<f32>) {
        let mut namespaces = self
            .namespaces
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entries = namespaces.entry(namespace.to_string()).or_default();
        entries.retain(|sv| sv.id != id);
        entries.push(StoredVector {
            id: id.to_string(),
            vector,
        });
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<Match>> {
        if top_k == 0 {
            return Err(Error::bad_request("top_k must be >= 1"));
        }
        let namespaces = self
            .namespaces
            .read()
            .map_err(|_| Error::upstream("vector index lock poisoned"))?;
        let Some(entries) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<Match> = entries
            .iter()
            .map(|sv| Match::new(sv.id.clone(), cosine_similarity(vector, &sv.vector) as f64))
            .collect();
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }
}
