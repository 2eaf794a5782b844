use anyhow::{Context, Result};
use axum::{extract::{rejection::JsonRejection, State}, http::StatusCode, response::{IntoResponse, Response}, routing::{get, post}, Json, Router};
use ragcore::{build_index_from_chunks, generate_answer, CorpusLookup, DataPaths, DenseIndex, LexicalIndex, RetrievalResult, Retriever, TfidfConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const DEFAULT_K: usize = 3;
const MAX_K: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Strategy {
    /// TF-IDF cosine similarity
    Lexical,
    /// Sentence-embedding cosine similarity
    Dense,
}

/// Open the retriever for `strategy` from a data directory. With
/// `build_missing`, a missing TF-IDF snapshot is built from the chunk corpus.
pub fn load_retriever(strategy: Strategy, paths: &DataPaths, build_missing: bool) -> Result<Arc<dyn Retriever>> {
    match strategy {
        Strategy::Lexical => {
            let index_path = paths.lexical_index();
            if build_missing && !index_path.exists() {
                tracing::info!(path = %index_path.display(), "index not found, building tf-idf index");
                build_index_from_chunks(&paths.chunks(), &index_path, TfidfConfig::default())?;
            }
            let index = LexicalIndex::load(&index_path).context("run `indexer lexical` first")?;
            Ok(Arc::new(index))
        }
        Strategy::Dense => {
            let embedder = embed::default_embedder()?;
            let index = DenseIndex::load(paths, embedder, CorpusLookup::Cached).context("run `indexer dense` first")?;
            Ok(Arc::new(index))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub chunks: Vec<RetrievalResult>,
}

#[derive(Clone)]
pub struct AppState {
    pub retriever: Arc<dyn Retriever>,
    pub default_k: usize,
}

impl AppState {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self { retriever, default_k: DEFAULT_K }
    }
}

#[derive(Debug)]
pub enum ApiError {
    EmptyQuery,
    BadBody(JsonRejection),
    Retrieval(ragcore::Error),
    Internal(String),
}

impl From<ragcore::Error> for ApiError {
    fn from(e: ragcore::Error) -> Self { ApiError::Retrieval(e) }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self { ApiError::BadBody(e) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::EmptyQuery => (StatusCode::BAD_REQUEST, "Query cannot be empty".to_string()),
            ApiError::BadBody(rejection) => (rejection.status(), rejection.body_text()),
            ApiError::Retrieval(e) => {
                tracing::error!(error = %e, "retrieval failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub fn build_app(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/query", post(query_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn query_handler(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(req) = payload?;
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::EmptyQuery);
    }
    let k = req.k.unwrap_or(state.default_k).clamp(1, MAX_K);

    let start = std::time::Instant::now();
    let retriever = Arc::clone(&state.retriever);
    let q = query.clone();
    // embedding inference is CPU-bound; keep it off the async workers
    let chunks = tokio::task::spawn_blocking(move || retriever.retrieve(&q, k))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    let answer = generate_answer(&query, &chunks, k);
    tracing::debug!(retriever = state.retriever.name(), k, hits = chunks.len(), took_ms = start.elapsed().as_millis() as u64, "answered query");
    Ok(Json(QueryResponse { answer, chunks }))
}
