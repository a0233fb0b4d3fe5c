//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Service identity and version |
//! | `GET`  | `/health` | Liveness |
//! | `GET`  | `/api/news/` | Paginated article list (`limit`, `offset`, `sentiment`, `token`) |
//! | `GET`  | `/api/sentiment/` | Sentiment aggregate, optionally for one `token` |
//! | `POST` | `/api/process/s3/` | Run the archive importer |
//! | `POST` | `/api/fetch/live/` | Run the live feed fetcher |
//! | `POST` | `/api/analyze/sentiment/` | Score all unscored articles |
//! | `GET`  | `/api/stats/` | Store statistics |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "limit must be between 1 and 100, got 0" } }
//! ```
//!
//! Error codes: `bad_request` (400) for rejected parameters, `internal` (500)
//! for pipeline and store failures.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::archive::ArchiveImporter;
use crate::config::Config;
use crate::db;
use crate::enrich::SentimentEnricher;
use crate::ingest::run_source;
use crate::live_feed::LiveFeedFetcher;
use crate::llm::create_generator;
use crate::migrate;
use crate::query::{self, ListParams, ListResponse, SentimentSummary};
use crate::s3::S3ObjectStore;
use crate::stats::{store_stats, StatsResponse};
use crate::store::ArticleStore;
use crate::traits::ArticleSource;

/// Shared application state: the store plus the three pipeline entry points.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ArticleStore>,
    pub archive: Arc<dyn ArticleSource>,
    pub live: Arc<dyn ArticleSource>,
    pub enricher: Arc<SentimentEnricher>,
}

impl AppState {
    /// Wire the production components from configuration.
    pub fn from_config(config: &Config, store: Arc<ArticleStore>) -> anyhow::Result<Self> {
        let objects = Arc::new(S3ObjectStore::new(&config.archive));
        let archive = Arc::new(ArchiveImporter::new(&config.archive, objects));
        let live = Arc::new(LiveFeedFetcher::new(&config.live_feed)?);
        let generator = create_generator(&config.model)?;
        let enricher = Arc::new(SentimentEnricher::new(store.clone(), generator));

        Ok(Self {
            store,
            archive,
            live,
            enricher,
        })
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/news/", get(handle_news))
        .route("/api/sentiment/", get(handle_sentiment))
        .route("/api/process/s3/", post(handle_process_archive))
        .route("/api/fetch/live/", post(handle_fetch_live))
        .route("/api/analyze/sentiment/", post(handle_analyze))
        .route("/api/stats/", get(handle_stats))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on `[server].bind` and run until Ctrl-C.
///
/// The schema is created if missing. The store is closed on shutdown.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    let store = Arc::new(ArticleStore::new(pool));

    let state = AppState::from_config(config, store.clone())?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "server listening");
    println!("cryptosent listening on http://{}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    store.close().await;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let message = format!("{:#}", err);
        tracing::error!(error = %message, "request failed");
        internal(message)
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET / and /health ============

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
    version: &'static str,
    status: &'static str,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Crypto News & Sentiment Agent",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "crypto-sentiment-agent",
    })
}

// ============ Read views ============

async fn handle_news(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ListResponse>, AppError> {
    let Query(params) = params.map_err(|e| bad_request(e.body_text()))?;
    let query = params.validate().map_err(|e| bad_request(e.to_string()))?;
    Ok(Json(query::list_articles(&state.store, &query).await?))
}

#[derive(Debug, Default, Deserialize)]
struct SentimentParams {
    token: Option<String>,
}

async fn handle_sentiment(
    State(state): State<AppState>,
    params: Result<Query<SentimentParams>, QueryRejection>,
) -> Result<Json<SentimentSummary>, AppError> {
    let Query(params) = params.map_err(|e| bad_request(e.body_text()))?;
    Ok(Json(
        query::sentiment_summary(&state.store, params.token.as_deref()).await?,
    ))
}

async fn handle_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    Ok(Json(store_stats(&state.store).await?))
}

// ============ Pipeline triggers ============

#[derive(Serialize)]
struct SavedResponse {
    message: &'static str,
    saved_count: usize,
}

#[derive(Serialize)]
struct UpdatedResponse {
    message: &'static str,
    updated_count: usize,
}

async fn handle_process_archive(
    State(state): State<AppState>,
) -> Result<Json<SavedResponse>, AppError> {
    let summary = run_source(&state.store, state.archive.as_ref()).await?;
    Ok(Json(SavedResponse {
        message: "S3 PDFs processed successfully",
        saved_count: summary.saved,
    }))
}

async fn handle_fetch_live(State(state): State<AppState>) -> Result<Json<SavedResponse>, AppError> {
    let summary = run_source(&state.store, state.live.as_ref()).await?;
    Ok(Json(SavedResponse {
        message: "Live news fetched successfully",
        saved_count: summary.saved,
    }))
}

async fn handle_analyze(State(state): State<AppState>) -> Result<Json<UpdatedResponse>, AppError> {
    let updated = state.enricher.run().await?;
    Ok(Json(UpdatedResponse {
        message: "Sentiment analysis completed successfully",
        updated_count: updated,
    }))
}
