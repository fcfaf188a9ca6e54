use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::sync::Arc;

use crate::error::EngineError;
use crate::metrics;
use crate::services::{screen_service::ScreenError, AppState};

pub mod screens;
pub mod sse;

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let screens = state.screens.read().await.len();

    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "attempt-engine",
            "version": env!("CARGO_PKG_VERSION"),
            "screens_mounted": screens,
            "grading_api": state.config.grading_api.base_url,
        })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// Protects /metrics with HTTP Basic auth (`METRICS_AUTH=user:password`).
pub async fn metrics_auth_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let encoded = auth_header
        .strip_prefix("Basic ")
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let decoded = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    let expected = std::env::var("METRICS_AUTH").unwrap_or_else(|_| "admin:changeme".to_string());
    if credentials != expected {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

/// Maps screen and engine failures onto HTTP status codes.
pub(crate) fn error_response(err: ScreenError) -> (StatusCode, String) {
    let status = match &err {
        ScreenError::NotFound => StatusCode::NOT_FOUND,
        ScreenError::Conflict(_) => StatusCode::CONFLICT,
        ScreenError::Engine(engine) => match engine {
            EngineError::NoQuestionsAvailable(_) => StatusCode::NOT_FOUND,
            EngineError::UnknownQuestion(_) | EngineError::InvalidOption { .. } => {
                StatusCode::BAD_REQUEST
            }
            EngineError::QuestionsFetchFailed(_)
            | EngineError::StatusCheckFailed(_)
            | EngineError::AttemptStartFailed(_) => StatusCode::BAD_GATEWAY,
            EngineError::NoAttemptIdentity | EngineError::SubmissionRejected { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            EngineError::SessionClosed => StatusCode::GONE,
        },
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::warn!("Request rejected: {}", err);
    }
    (status, err.to_string())
}
