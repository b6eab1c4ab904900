//! # Campus Search Core
//!
//! Shared logic for Campus Search: data models, provider traits, the
//! retrieval pipeline, domain projections, and event ingestion.
//!
//! This crate contains no HTTP client, database driver, or runtime
//! dependencies. Concrete providers (OpenAI, Pinecone, SQLite, the events
//! API) live in the `campus-search` app crate and plug in through the
//! [`embedding::EmbeddingClient`], [`vector_index::VectorIndex`],
//! [`store::DocumentStore`], and [`ingest::EventSource`] traits.

pub mod embedding;
pub mod error;
pub mod events;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod projection;
pub mod store;
pub mod vector_index;

pub use error::{Error, Result};
pub use models::{Document, DomainTag, Match, ProjectedRecord};
pub use pipeline::{PipelineSettings, Retriever, SearchRequest};
