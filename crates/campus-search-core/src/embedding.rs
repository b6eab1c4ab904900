//! Embedding client trait and vector utilities.
//!
//! Defines the [`EmbeddingClient`] trait that the retrieval pipeline calls
//! to turn query text into a vector, plus [`cosine_similarity`] used by the
//! in-memory vector index.
//!
//! Concrete HTTP clients (OpenAI) live in the `campus-search` app crate.

use async_trait::async_trait;

use crate::error::Result;

/// A query embedding. Its length is fixed by the model that produced it.
pub type EmbeddingVector = Vec<f32>;

/// Trait for embedding providers.
///
/// Implementations perform exactly one provider call per [`embed`](EmbeddingClient::embed)
/// and do not retry.
///
/// # Errors
///
/// - [`Error::UpstreamUnavailable`](crate::error::Error::UpstreamUnavailable) when the
///   provider call fails or times out.
/// - [`Error::InvalidModel`](crate::error::Error::InvalidModel) when the provider
///   rejects `model`.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single non-empty text with the given model.
    async fn embed(&self, text: &str, model: &str) -> Result<EmbeddingVector>;
}

/// Cosine of the angle between `a` and `b`, in `[-1.0, 1.0]`.
///
/// Mismatched lengths, empty input, or a zero-norm vector score `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, aa, bb) = a
        .iter()
        .zip(b)
        .fold((0.0f64, 0.0f64, 0.0f64), |(dot, aa, bb), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (dot + x * y, aa + x * x, bb + y * y)
        });

    let norm = (aa * bb).sqrt();
    if norm == 0.0 {
        return 0.0;
    }
    (dot / norm).clamp(-1.0, 1.0) as f32
}
