//! HTTP server exposing the search endpoints and the upcoming events feed.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/search_classes` | Search courses |
//! | `POST` | `/search_clubs` | Search clubs |
//! | `POST` | `/find_professors` | Search professors |
//! | any    | `/get_upcoming_events` | Next events by start time |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Search requests carry a JSON body `{"query": "...", "top_k": 5}` where
//! `top_k` is optional. Successful responses are JSON arrays (possibly
//! empty).
//!
//! # Error Contract
//!
//! Errors are plain text:
//!
//! | Status | Cause |
//! |--------|-------|
//! | 400 | wrong method, missing body or `query`, empty query, `top_k` not in `1..=20` |
//! | 502 | embedding provider, vector index, or document store failure |
//! | 500 | embedding model rejected, store write failure |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser clients can
//! call the endpoints directly.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, get, post, MethodRouter},
    Json, Router,
};
use campus_search_core::store::DocumentStore;
use campus_search_core::{DomainTag, Error, ProjectedRecord, Retriever, SearchRequest};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::db;
use crate::ingest;
use crate::migrate;
use crate::search::build_retriever;
use crate::sqlite_store::SqliteStore;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    retriever: Arc<Retriever>,
    store: Arc<dyn DocumentStore>,
    events_limit: usize,
}

impl AppState {
    /// State over a retriever; the events feed reads the retriever's store
    /// and is limited to its configured `top_k`.
    pub fn new(retriever: Arc<Retriever>) -> Self {
        let store = retriever.store().clone();
        let events_limit = retriever.settings().top_k;
        Self {
            retriever,
            store,
            events_limit,
        }
    }
}

/// Starts the HTTP server and, unless disabled, the ingestion scheduler.
///
/// Binds to `[server].bind`, runs migrations on the SQLite store, and
/// serves until the process is terminated.
pub async fn run_server(config: &Config, with_ingest: bool) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;
    let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::new(pool));

    let retriever = Arc::new(build_retriever(config, store.clone())?);

    if with_ingest {
        let job = Arc::new(ingest::build_job(config, store)?);
        ingest::spawn_scheduler(job, Duration::from_secs(config.ingest.interval_secs));
    }

    let listener = TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "campus search listening");
    serve(listener, AppState::new(retriever)).await
}

/// Serve the router on an already-bound listener.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Build the router with all endpoints and CORS.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/search_classes", search_route(DomainTag::Courses))
        .route("/search_clubs", search_route(DomainTag::Clubs))
        .route("/find_professors", search_route(DomainTag::Professors))
        .route("/get_upcoming_events", any(handle_upcoming_events))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

fn search_route(domain: DomainTag) -> MethodRouter<AppState> {
    post(move |State(state): State<AppState>, body: Bytes| async move {
        handle_search(state, domain, body).await
    })
    .fallback(handle_invalid_method)
}

// ============ Error response ============

/// Internal error type that converts into a plain-text HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            Error::InvalidModel(_) | Error::StoreWriteFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status != StatusCode::BAD_REQUEST {
            warn!(error = %err, code = err.code(), "request failed");
        }
        let message = match err {
            Error::BadRequest(msg) => msg,
            other => other.to_string(),
        };
        AppError { status, message }
    }
}

async fn handle_invalid_method() -> AppError {
    bad_request("Invalid method")
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /search_* ============

/// JSON request body for the search endpoints.
#[derive(Deserialize)]
struct SearchBody {
    #[serde(default)]
    query: Option<Value>,
    #[serde(default)]
    top_k: Option<Value>,
}

/// Parse a search body. Anything that is not a JSON object with a
/// `query` field counts as "no query". `top_k` is checked on its own so a
/// bad override is reported as such.
fn parse_search_body(body: &[u8]) -> Result<(String, Option<usize>), AppError> {
    let parsed: SearchBody =
        serde_json::from_slice(body).map_err(|_| bad_request("No query provided"))?;
    let query = match parsed.query {
        None | Some(Value::Null) => return Err(bad_request("No query provided")),
        Some(Value::String(q)) => q,
        Some(_) => return Err(bad_request("query must be a string")),
    };
    let top_k = match parsed.top_k {
        None | Some(Value::Null) => None,
        Some(v) => {
            let n = v
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| bad_request("top_k must be a non-negative integer"))?;
            Some(n)
        }
    };
    Ok((query, top_k))
}

async fn handle_search(
    state: AppState,
    domain: DomainTag,
    body: Bytes,
) -> Result<Json<Vec<ProjectedRecord>>, AppError> {
    let (query, top_k) = parse_search_body(&body)?;
    info!(%domain, query_len = query.len(), "search request");

    let req = SearchRequest {
        domain,
        query: Some(&query),
        top_k,
    };
    let results = state.retriever.search(req).await?;
    Ok(Json(results))
}

// ============ /get_upcoming_events ============

async fn handle_upcoming_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProjectedRecord>>, AppError> {
    let events = campus_search_core::events::upcoming_events(
        state.store.as_ref(),
        Utc::now(),
        state.events_limit,
    )
    .await?;
    Ok(Json(events))
}
