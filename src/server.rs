//! JSON HTTP server.
//!
//! Serves the aggregated activity view, insights, the daily digest, the
//! markdown renderer, and the draft cache to a browser front end.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/services` | Cached aggregate; refreshed when stale or with `?refresh=true` |
//! | `GET`  | `/insights` | Insight sentences over the cached aggregate |
//! | `GET`  | `/digest` | Daily digest over the cached aggregate |
//! | `POST` | `/markdown/render` | `{content}` → `{blocks}` |
//! | `POST` | `/markdown/toggle` | `{content, line}` → `{content, blocks}` |
//! | `POST` | `/notes/toggle` | `{note, line}` → `{note, blocks, todos}` |
//! | `GET`  | `/drafts` | All drafts, newest first |
//! | `GET` `PUT` `DELETE` | `/drafts/{id}` | Read, save, or discard one draft |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "line 3 is not a todo" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a front end served
//! from another origin can call the API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use taskflow_core::markdown::{render, toggle_todo, Block};
use taskflow_core::{AggregatedServicesData, DailyDigest, MarkdownDocument};

use crate::aggregator::ExternalServicesAggregator;
use crate::config::Config;
use crate::drafts::{Draft, DraftStore};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    aggregator: Arc<ExternalServicesAggregator>,
    /// Last aggregate; `None` until the first request.
    cache: Arc<RwLock<Option<AggregatedServicesData>>>,
    drafts: Arc<DraftStore>,
}

impl AppState {
    pub fn new(config: Config, aggregator: ExternalServicesAggregator, drafts: DraftStore) -> Self {
        Self {
            config: Arc::new(config),
            aggregator: Arc::new(aggregator),
            cache: Arc::new(RwLock::new(None)),
            drafts: Arc::new(drafts),
        }
    }

    /// State with the built-in providers and the configured draft file.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let aggregator = ExternalServicesAggregator::from_config(config)?;
        let drafts = match &config.drafts.path {
            Some(path) => DraftStore::open(path)?,
            None => DraftStore::new(),
        };
        Ok(Self::new(config.clone(), aggregator, drafts))
    }

    /// The cached aggregate, refreshed first when missing, stale, or forced.
    ///
    /// The write lock is held across the refresh, so concurrent requests
    /// wait for one fan-out instead of starting their own.
    async fn services(&self, force: bool) -> AggregatedServicesData {
        if !force {
            if let Some(data) = self.cache.read().await.as_ref() {
                if !self.aggregator.should_update_data(data.last_updated) {
                    return data.clone();
                }
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(data) = cache.as_ref() {
            if !force && !self.aggregator.should_update_data(data.last_updated) {
                return data.clone();
            }
        }
        let data = self
            .aggregator
            .fetch_all_user_data(&self.config.identities)
            .await;
        *cache = Some(data.clone());
        data
    }
}

/// Build the router with CORS applied.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/services", get(handle_services))
        .route("/insights", get(handle_insights))
        .route("/digest", get(handle_digest))
        .route("/markdown/render", post(handle_render))
        .route("/markdown/toggle", post(handle_toggle))
        .route("/notes/toggle", post(handle_note_toggle))
        .route("/drafts", get(handle_list_drafts))
        .route(
            "/drafts/{id}",
            get(handle_get_draft)
                .put(handle_put_draft)
                .delete(handle_delete_draft),
        )
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let app = build_router(state);

    let bind_addr = config.server.bind.clone();
    info!(bind = %bind_addr, "starting server");
    println!("TaskFlow server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
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

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
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

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Aggregated data ============

#[derive(Deserialize, Default)]
struct ServicesQuery {
    #[serde(default)]
    refresh: bool,
}

async fn handle_services(
    State(state): State<AppState>,
    Query(query): Query<ServicesQuery>,
) -> Json<AggregatedServicesData> {
    Json(state.services(query.refresh).await)
}

#[derive(Serialize)]
struct InsightsResponse {
    insights: Vec<String>,
}

async fn handle_insights(State(state): State<AppState>) -> Json<InsightsResponse> {
    let data = state.services(false).await;
    Json(InsightsResponse {
        insights: state.aggregator.generate_user_insights(&data),
    })
}

async fn handle_digest(State(state): State<AppState>) -> Json<DailyDigest> {
    let data = state.services(false).await;
    Json(state.aggregator.generate_daily_digest(&data))
}

// ============ Markdown ============

#[derive(Deserialize)]
struct RenderRequest {
    content: String,
}

#[derive(Serialize)]
struct RenderResponse {
    blocks: Vec<Block>,
}

async fn handle_render(Json(req): Json<RenderRequest>) -> Json<RenderResponse> {
    Json(RenderResponse {
        blocks: render(&req.content),
    })
}

#[derive(Deserialize)]
struct ToggleRequest {
    content: String,
    /// Zero-based source line, as reported in a rendered todo block.
    line: usize,
}

#[derive(Serialize)]
struct ToggleResponse {
    content: String,
    blocks: Vec<Block>,
}

async fn handle_toggle(Json(req): Json<ToggleRequest>) -> Result<Json<ToggleResponse>, AppError> {
    let content = toggle_todo(&req.content, req.line)
        .ok_or_else(|| bad_request(format!("line {} is not a todo", req.line)))?;
    let blocks = render(&content);
    Ok(Json(ToggleResponse { content, blocks }))
}

#[derive(Deserialize)]
struct NoteToggleRequest {
    note: MarkdownDocument,
    line: usize,
}

#[derive(Serialize)]
struct NoteToggleResponse {
    note: MarkdownDocument,
    blocks: Vec<Block>,
    /// `[done, total]`
    todos: (usize, usize),
}

async fn handle_note_toggle(
    Json(req): Json<NoteToggleRequest>,
) -> Result<Json<NoteToggleResponse>, AppError> {
    let mut note = req.note;
    if !note.toggle_todo(req.line, Utc::now()) {
        return Err(bad_request(format!("line {} is not a todo", req.line)));
    }
    Ok(Json(NoteToggleResponse {
        blocks: note.render(),
        todos: note.todo_progress(),
        note,
    }))
}

// ============ Drafts ============

#[derive(Serialize)]
struct DraftEntry {
    id: String,
    #[serde(flatten)]
    draft: Draft,
}

#[derive(Serialize)]
struct DraftListResponse {
    drafts: Vec<DraftEntry>,
}

async fn handle_list_drafts(State(state): State<AppState>) -> Json<DraftListResponse> {
    let drafts = state
        .drafts
        .list()
        .into_iter()
        .map(|(id, draft)| DraftEntry { id, draft })
        .collect();
    Json(DraftListResponse { drafts })
}

async fn handle_get_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DraftEntry>, AppError> {
    let draft = state
        .drafts
        .load(&id)
        .ok_or_else(|| not_found(format!("no draft for note: {}", id)))?;
    Ok(Json(DraftEntry { id, draft }))
}

#[derive(Deserialize)]
struct SaveDraftRequest {
    content: String,
}

async fn handle_put_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SaveDraftRequest>,
) -> Result<Json<DraftEntry>, AppError> {
    if id.trim().is_empty() {
        return Err(bad_request("note id must not be empty"));
    }
    let draft = state.drafts.save(&id, &req.content);
    flush_drafts(&state).await?;
    Ok(Json(DraftEntry { id, draft }))
}

async fn handle_delete_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.drafts.discard(&id) {
        return Err(not_found(format!("no draft for note: {}", id)));
    }
    flush_drafts(&state).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn flush_drafts(state: &AppState) -> Result<(), AppError> {
    let drafts = Arc::clone(&state.drafts);
    tokio::task::spawn_blocking(move || drafts.flush())
        .await
        .map_err(anyhow::Error::from)
        .and_then(|flushed| flushed)
        .map_err(|e| {
            warn!(error = %e, "failed to persist drafts");
            internal(format!("failed to persist drafts: {}", e))
        })
}
