//! # Campus Search
//!
//! Natural-language search over a university's courses, clubs, and
//! professors, plus an hourly ingestion job that mirrors the campus events
//! feed into the local document store.
//!
//! ## Architecture
//!
//! ```text
//! query ──▶ OpenAI embeddings ──▶ Pinecone (namespace per domain)
//!                                      │ ids + scores
//!                                      ▼
//!                               SQLite documents ──▶ projection ──▶ JSON
//!
//! events API ──(hourly)──▶ normalize ──▶ SQLite `events` collection
//! ```
//!
//! The provider-neutral pipeline lives in `campus-search-core`; this crate
//! supplies the HTTP clients, the SQLite store, the CLI, and the server.
//!
//! ## Quick Start
//!
//! ```bash
//! campus init                              # create database
//! campus ingest                            # pull the events feed once
//! campus search courses "intro to databases"
//! campus events                            # next upcoming events
//! campus serve                             # HTTP server + hourly ingestion
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite document store |
//! | [`embedding`] | OpenAI embeddings client |
//! | [`vector_index`] | Pinecone query client |
//! | [`events_source`] | Campus events feed client |
//! | [`search`] | Retriever wiring and CLI search |
//! | [`events`] | Upcoming events listing |
//! | [`ingest`] | Ingestion job wiring and scheduler |
//! | [`server`] | HTTP server |

pub mod config;
pub mod db;
pub mod embedding;
pub mod events;
pub mod events_source;
pub mod ingest;
pub mod migrate;
pub mod search;
pub mod server;
pub mod sqlite_store;
pub mod vector_index;
