//! HTTP server: the upload page and the prediction API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Upload page |
//! | `POST` | `/upload` | Classify data-URI encoded files, returns an HTML fragment |
//! | `POST` | `/predict` | Classify the file named by `filepath`, returns JSON |
//! | `GET`  | `/health` | Health check (version, model state) |
//!
//! # `/predict` contract
//!
//! `filepath` may be given in the query string, a JSON body or a
//! form-encoded body.
//!
//! - `201` — `{"predicted_class_raw", "logit_score", "predicted_class_final"}`
//! - `400` — `{"Error": "File cannot be reached or has no parsable content. ..."}`
//!   for a missing argument, an unreachable file, a document larger than
//!   `[upload].max_bytes` or a document without text
//! - `503` — `{"Error": ...}` when the classification model is unavailable
//! - `500` — `{"Error": ...}` for anything else

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::classifier::{shared_classifier, GenreClassifier, LazyClassifier};
use crate::config::Config;
use crate::models::{DocumentPayload, PredictResponse};
use crate::pipeline::{classify_document, PipelineError};
use crate::upload::{accepts, process_file, render_outcomes, UploadOutcome, UploadRequest};

/// Body of every `400` from `/predict`.
pub const UNREACHABLE_FILE_ERROR: &str =
    "File cannot be reached or has no parsable content. Please try again with another file";

const INDEX_HTML: &str = include_str!("static/index.html");

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    /// The classification capability. Loaded once, shared read-only.
    classifier: Arc<dyn GenreClassifier>,
    /// Client for remote `filepath` references.
    http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config, classifier: Arc<dyn GenreClassifier>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.predict.timeout_secs))
            .build()?;
        Ok(Self {
            config: Arc::new(config),
            classifier,
            http,
        })
    }
}

/// Starts the HTTP server.
///
/// Binds to `[server].bind` and serves until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = &config.server.bind;
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("genre server listening on http://{}", bind_addr);

    let classifier = Arc::new(shared_classifier(&config.model));
    serve_until(config, listener, classifier, shutdown_signal()).await
}

/// Serve on `listener` until `shutdown` resolves.
///
/// With `[model].preload` the model is loaded before the first request is
/// accepted. The model is released once the server has stopped.
pub async fn serve_until<C, F>(
    config: &Config,
    listener: tokio::net::TcpListener,
    classifier: Arc<LazyClassifier<C>>,
    shutdown: F,
) -> anyhow::Result<()>
where
    C: GenreClassifier + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    if config.model.preload {
        let handle = classifier.clone();
        tokio::task::spawn_blocking(move || handle.acquire().map(|_| ()))
            .await?
            .context("Failed to preload classification model")?;
    }

    let state = AppState::new(config.clone(), classifier.clone())?;
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    classifier.release();
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

/// Build the router with all routes and layers.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_index))
        .route("/upload", post(handle_upload))
        .route("/predict", post(handle_predict))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(state.config.upload.max_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============ Error response ============

/// JSON error body: `{"Error": "..."}`.
#[derive(Serialize)]
struct ErrorBody {
    #[serde(rename = "Error")]
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

fn unreachable_file() -> Response {
    error_response(StatusCode::BAD_REQUEST, UNREACHABLE_FILE_ERROR)
}

// ============ GET / ============

async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// ============ POST /upload ============

/// Classify every accepted file of an upload, concurrently, and render the
/// results in submission order.
async fn handle_upload(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> Html<String> {
    let handles: Vec<_> = request
        .files
        .into_iter()
        .filter(|file| accepts(&file.filename))
        .map(|file| {
            let classifier = state.classifier.clone();
            tokio::task::spawn_blocking(move || process_file(&file, &*classifier))
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        let outcome = handle.await.unwrap_or_else(|e| {
            error!("upload worker failed: {e}");
            UploadOutcome::Failed
        });
        outcomes.push(outcome);
    }

    Html(render_outcomes(&outcomes))
}

// ============ POST /predict ============

#[derive(Debug, Default, Deserialize)]
struct PredictParams {
    filepath: Option<String>,
}

async fn handle_predict(
    State(state): State<AppState>,
    Query(query): Query<PredictParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let filepath = query
        .filepath
        .or_else(|| filepath_from_body(&headers, &body))
        .filter(|p| !p.trim().is_empty());
    let Some(filepath) = filepath else {
        warn!("predict called without filepath");
        return unreachable_file();
    };

    let bytes = match fetch_document(&state, &filepath).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(%filepath, error = %format!("{:#}", e), "file cannot be reached");
            return unreachable_file();
        }
    };

    let payload = DocumentPayload::new(filepath, chrono::Utc::now().timestamp() as f64, bytes);
    let classifier = state.classifier.clone();
    let outcome =
        tokio::task::spawn_blocking(move || classify_document(&payload, &*classifier)).await;

    match outcome {
        Ok(Ok(result)) => {
            (StatusCode::CREATED, Json(PredictResponse::from(&result))).into_response()
        }
        Ok(Err(PipelineError::ExtractionFailed(_))) => unreachable_file(),
        Ok(Err(e @ PipelineError::ModelUnavailable(_))) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        Ok(Err(e @ PipelineError::InvariantViolation(_))) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            error!("predict worker failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

/// Read `filepath` from a JSON or form-encoded body.
fn filepath_from_body(headers: &HeaderMap, body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("application/x-www-form-urlencoded") {
        url::form_urlencoded::parse(body)
            .find(|(key, _)| key == "filepath")
            .map(|(_, value)| value.into_owned())
    } else {
        serde_json::from_slice::<PredictParams>(body)
            .ok()
            .and_then(|p| p.filepath)
    }
}

/// Load the referenced document: a local path, or an http(s) URL when allowed.
/// Documents larger than `[upload].max_bytes` are refused.
async fn fetch_document(state: &AppState, filepath: &str) -> anyhow::Result<Vec<u8>> {
    let limit = state.config.upload.max_bytes;

    if filepath.starts_with("http://") || filepath.starts_with("https://") {
        if !state.config.predict.allow_remote {
            anyhow::bail!("remote references are disabled (predict.allow_remote = false)");
        }
        let response = state.http.get(filepath).send().await?.error_for_status()?;
        if let Some(len) = response.content_length() {
            anyhow::ensure!(len <= limit as u64, "document is {len} bytes, limit is {limit}");
        }
        let bytes = response.bytes().await?;
        anyhow::ensure!(
            bytes.len() <= limit,
            "document is {} bytes, limit is {limit}",
            bytes.len()
        );
        return Ok(bytes.to_vec());
    }

    let len = tokio::fs::metadata(filepath).await?.len();
    anyhow::ensure!(len <= limit as u64, "document is {len} bytes, limit is {limit}");
    Ok(tokio::fs::read(filepath).await?)
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    model_loaded: bool,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_loaded: state.classifier.is_loaded(),
    })
}
