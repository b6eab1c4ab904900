//! Nearest-neighbor index abstraction.
//!
//! The [`VectorIndex`] trait is the only view the pipeline has of the
//! external similarity service. Implementations return hits in the
//! provider's relevance order and the pipeline preserves that order.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Match;

/// Abstract nearest-neighbor search over per-domain namespaces.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return at most `top_k` matches for `vector` in `namespace`, in
    /// descending relevance.
    ///
    /// Zero matches is a valid outcome. Provider failures are
    /// [`Error::UpstreamUnavailable`](crate::error::Error::UpstreamUnavailable).
    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<Match>>;
}
