//! HTTP adapter.
//!
//! A thin JSON layer over the [`Ledger`] and the [`CaptureCoordinator`].
//! It holds no state of its own.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/api/capture` | Submit one raw image; 202 when accepted |
//! | `GET`  | `/api/inventory` | Current full inventory |
//! | `POST` | `/api/inventory` | Add one item by hand |
//! | `PUT`  | `/api/inventory` | Replace the full inventory by hand |
//! | `DELETE` | `/api/inventory/{id}` | Remove one item |
//! | `GET`  | `/api/inventory/names` | Item names for recipe suggestions |
//! | `GET`  | `/api/snapshot` | Whole record: inventory, last deltas, registry |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "item not found: ..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `queue_full` (503),
//! `analyzer_error` (502), `internal` (500).

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use pantry_core::models::{PantryItem, PantryRecord};
use pantry_core::PantryError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::ingest::{CaptureCoordinator, Submitted};
use crate::ledger::{Ledger, ManualItem};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub capture: Arc<CaptureCoordinator>,
}

/// Build the router with permissive CORS and the capture body limit.
pub fn router(state: AppState, max_capture_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/capture", post(handle_capture))
        .route(
            "/api/inventory",
            get(handle_inventory)
                .post(handle_add_item)
                .put(handle_replace_inventory),
        )
        .route("/api/inventory/names", get(handle_names))
        .route("/api/inventory/{id}", delete(handle_delete_item))
        .route("/api/snapshot", get(handle_snapshot))
        .layer(DefaultBodyLimit::max(max_capture_bytes))
        .layer(cors)
        .with_state(state)
}

/// Bind to `[server].bind` and serve until `shutdown` resolves.
///
/// In-flight requests finish before this returns, and `state` (with its
/// coordinator handle) is dropped on return.
pub async fn run_server<F>(config: &Config, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state, config.server.max_capture_bytes);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %listener.local_addr()?, "pantry server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("pantry server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown requested");
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
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Map an error to a status by the [`PantryError`] it carries, if any.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let (status, code) = match err.downcast_ref::<PantryError>() {
            Some(PantryError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            Some(PantryError::EmptyName) | Some(PantryError::MalformedJudgment(_)) => {
                (StatusCode::BAD_REQUEST, "bad_request")
            }
            Some(PantryError::QueueFull) => (StatusCode::SERVICE_UNAVAILABLE, "queue_full"),
            Some(PantryError::Analyzer(_)) | Some(PantryError::Disabled) => {
                (StatusCode::BAD_GATEWAY, "analyzer_error")
            }
            None => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        AppError {
            status,
            code,
            message: format!("{:#}", err),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/capture ============

#[derive(Serialize)]
struct CaptureResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    seq: Option<u64>,
}

/// Accept one raw image body. Returns as soon as the capture is slotted;
/// analysis runs on the worker pool.
async fn handle_capture(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<CaptureResponse>), AppError> {
    if body.is_empty() {
        return Err(AppError {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: "capture body must not be empty".to_string(),
        });
    }

    let response = match state.capture.submit(body.to_vec())? {
        Submitted::Armed => CaptureResponse {
            status: "armed",
            seq: None,
        },
        Submitted::Dispatched { seq } => CaptureResponse {
            status: "dispatched",
            seq: Some(seq),
        },
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

// ============ /api/inventory ============

async fn handle_inventory(
    State(state): State<AppState>,
) -> Result<Json<Vec<PantryItem>>, AppError> {
    Ok(Json(state.ledger.inventory().await?))
}

#[derive(Deserialize)]
struct AddItemRequest {
    name: String,
    #[serde(default)]
    expiry_date: Option<NaiveDate>,
}

async fn handle_add_item(
    State(state): State<AppState>,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<PantryItem>), AppError> {
    let item = state.ledger.add_item(&req.name, req.expiry_date).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn handle_replace_inventory(
    State(state): State<AppState>,
    Json(items): Json<Vec<ManualItem>>,
) -> Result<Json<Vec<PantryItem>>, AppError> {
    Ok(Json(state.ledger.replace_inventory(&items).await?))
}

async fn handle_delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PantryItem>, AppError> {
    Ok(Json(state.ledger.delete_item(id).await?))
}

async fn handle_names(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.ledger.ingredient_names().await?))
}

async fn handle_snapshot(State(state): State<AppState>) -> Result<Json<PantryRecord>, AppError> {
    Ok(Json(state.ledger.snapshot().await?))
}
