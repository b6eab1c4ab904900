//! Error taxonomy shared by the retrieval pipeline and the ingestion job.
//!
//! Every collaborator failure is classified into one of four kinds. The
//! pipeline never translates between kinds and never retries: the first
//! failing stage decides what the caller sees.
//!
//! A missing document during hydration is not an error and never appears
//! here; stores report it as `Ok(None)`.

use thiserror::Error;

/// Errors surfaced by search and ingestion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed caller input (missing or empty query, unknown domain).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A collaborator (embedding provider, vector index, document store,
    /// events source) failed or timed out.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The embedding provider rejected the configured model.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// The ingestion batch commit failed; nothing was written.
    #[error("store write failed: {0}")]
    StoreWriteFailed(String),
}

impl Error {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(msg.into())
    }

    pub fn invalid_model(msg: impl Into<String>) -> Self {
        Self::InvalidModel(msg.into())
    }

    pub fn store_write(msg: impl Into<String>) -> Self {
        Self::StoreWriteFailed(msg.into())
    }

    /// Stable machine-readable code, used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::InvalidModel(_) => "invalid_model",
            Self::StoreWriteFailed(_) => "store_write_failed",
        }
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
