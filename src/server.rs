//! HTTP server exposing model builds and realtime inference.
//!
//! - `GET /health`
//! - `POST /build` builds (or rebuilds) one user's daily model
//! - `POST /inference` classifies a live reading against a stored model
//!
//! # Architecture
//!
//! ```text
//! scheduler ──→ POST /build ─────→ [raw day: inline | upstream | spool] ──→ builder ──→ store
//! app ───────→ POST /inference ──→ store (cached) ──→ classifier ──→ InferenceResult
//! ```

use crate::collector::spool::{parse_day_value, SpoolSource};
use crate::collector::types::LiveReading;
use crate::config::Config;
use crate::core::classifier::InferenceResult;
use crate::engine::{BuildOutcome, MoodEngine};
use crate::error::MoodError;
use crate::upstream::UpstreamClient;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Engine configuration
    pub config: Config,
}

impl ServerConfig {
    pub fn new(port: u16, config: Config) -> Self {
        Self { port, config }
    }
}

/// Shared server state
pub struct ServerState {
    engine: Arc<MoodEngine>,
    /// Upstream raw-data client, when configured
    upstream: Option<UpstreamClient>,
    /// Fallback raw-day spool
    spool: SpoolSource,
}

impl ServerState {
    pub fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let upstream = match &config.config.upstream {
            Some(settings) => Some(UpstreamClient::new(settings.clone())?),
            None => None,
        };

        Ok(Self {
            engine: Arc::new(MoodEngine::from_config(config.config.clone())),
            upstream,
            spool: SpoolSource::new(config.config.raw_path()),
        })
    }
}

/// Body of `POST /build`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    /// `YYYY-MM-DD`; defaults to yesterday in the configured timezone
    #[serde(default)]
    pub date: Option<String>,
    /// Inline raw records (array or `{"rows": [...]}`)
    #[serde(default)]
    pub readings: Option<serde_json::Value>,
}

/// Response from the build endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResponse {
    pub user_id: String,
    pub target_date: String,
    pub status: String,
    pub model_id: String,
    pub model_path: String,
    pub windows: usize,
    pub degenerate_states: Vec<usize>,
    pub rejected_readings: usize,
}

impl From<BuildOutcome> for BuildResponse {
    fn from(outcome: BuildOutcome) -> Self {
        Self {
            user_id: outcome.user_id,
            target_date: outcome.target_date.format("%Y-%m-%d").to_string(),
            status: "success".to_string(),
            model_id: outcome.model_id,
            model_path: outcome.model_path,
            windows: outcome.windows,
            degenerate_states: outcome.degenerate_states,
            rejected_readings: outcome.rejected,
        }
    }
}

/// Body of `POST /inference`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub forecast_minutes: Option<u32>,
    #[serde(default)]
    pub model_date: Option<String>,
    #[serde(flatten)]
    pub reading: LiveReading,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn status_for(err: &MoodError) -> StatusCode {
    match err {
        MoodError::Input(_) | MoodError::Json(_) => StatusCode::BAD_REQUEST,
        MoodError::ModelNotFound { .. } => StatusCode::NOT_FOUND,
        MoodError::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        MoodError::Upstream(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: MoodError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: err.code().to_string(),
        }),
    )
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| api_error(MoodError::Json(e)))
}

fn require_user_id(user_id: Option<String>) -> Result<String, ApiError> {
    match user_id {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(api_error(MoodError::Input(
            "missing required field: user_id".to_string(),
        ))),
    }
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    value
        .map(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|e| {
                api_error(MoodError::Input(format!(
                    "invalid date '{d}' (expected YYYY-MM-DD): {e}"
                )))
            })
        })
        .transpose()
}

/// Run blocking engine work off the async executor.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, MoodError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| api_error(MoodError::Internal(format!("worker task failed: {e}"))))?
        .map_err(api_error)
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /build
///
/// Raw records come from the request body when present, otherwise from the
/// upstream service if one is configured, otherwise from the local spool.
async fn build(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<Json<BuildResponse>, ApiError> {
    let request: BuildRequest = parse_body(&body)?;
    let user_id = require_user_id(request.user_id)?;
    let date = parse_date(request.date.as_deref())?
        .unwrap_or_else(|| state.engine.day_before(Utc::now()));

    let engine = Arc::clone(&state.engine);
    let outcome = if let Some(readings) = request.readings {
        let batch = parse_day_value(readings).map_err(api_error)?;
        blocking(move || engine.build_batch(&user_id, date, batch)).await?
    } else if let Some(upstream) = &state.upstream {
        let batch = match upstream.fetch_day(&user_id, date).await {
            Ok(batch) => batch,
            Err(e) => {
                engine.transparency().record_build_failed();
                return Err(api_error(e));
            }
        };
        blocking(move || engine.build_batch(&user_id, date, batch)).await?
    } else {
        let spool = state.spool.clone();
        blocking(move || engine.build_day(&user_id, date, &spool)).await?
    };

    state.engine.save_stats();
    Ok(Json(outcome.into()))
}

/// POST /inference
async fn inference(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<Json<InferenceResult>, ApiError> {
    let request: InferenceRequest = parse_body(&body)?;
    let user_id = require_user_id(request.user_id)?;
    let model_date = parse_date(request.model_date.as_deref())?;

    let now = Utc::now();
    let reading = request.reading.into_reading(now).map_err(api_error)?;
    let minutes = request.forecast_minutes;

    let engine = Arc::clone(&state.engine);
    let result =
        blocking(move || engine.infer(&user_id, &reading, minutes, model_date, now)).await?;
    Ok(Json(result))
}

/// Build the router; exposed for in-process testing.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/build", post(build))
        .route("/inference", post(inference))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ServerState::new(&config)?);
    let engine = Arc::clone(&state.engine);
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Mood engine server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
        engine.save_stats();
    });

    Ok((actual_addr, shutdown_tx))
}
