use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::error_response;
use crate::{
    engine::ManualSubmitOutcome,
    models::request::{SelectOptionRequest, SubmitRequest},
    services::{screen_service::ScreenService, AppState},
};

/// POST /api/v1/quizzes/{quiz_id}/screens
pub async fn mount_screen(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!("Mounting screen for quiz_id={}", quiz_id);

    let service = ScreenService::new(state);
    let view = service.mount(&quiz_id).await.map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/screens/{id}
pub async fn get_screen(
    State(state): State<Arc<AppState>>,
    Path(screen_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = ScreenService::new(state);
    let view = service.view(screen_id).await.map_err(error_response)?;

    Ok(Json(view))
}

/// POST /api/v1/screens/{id}/attempts
pub async fn start_attempt(
    State(state): State<Arc<AppState>>,
    Path(screen_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!("Starting attempt on screen {}", screen_id);

    let service = ScreenService::new(state);
    let view = service
        .start_attempt(screen_id)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /api/v1/screens/{id}/answers
pub async fn select_option(
    State(state): State<Arc<AppState>>,
    Path(screen_id): Path<Uuid>,
    Json(req): Json<SelectOptionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let service = ScreenService::new(state);
    let view = service
        .select_option(screen_id, &req.question_id, req.option_index)
        .await
        .map_err(error_response)?;

    Ok(Json(view))
}

/// POST /api/v1/screens/{id}/flags/{question_id}
pub async fn toggle_flag(
    State(state): State<Arc<AppState>>,
    Path((screen_id, question_id)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = ScreenService::new(state);
    let view = service
        .toggle_flag(screen_id, &question_id)
        .await
        .map_err(error_response)?;

    Ok(Json(view))
}

/// POST /api/v1/screens/{id}/submit
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Path(screen_id): Path<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // An empty body is a plain submit without confirmation.
    let req: SubmitRequest = if body.is_empty() {
        SubmitRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    };
    tracing::info!(
        "Manual submit on screen {} (confirm_empty={})",
        screen_id,
        req.confirm_empty
    );

    let service = ScreenService::new(state);
    let (outcome, view) = service
        .submit(screen_id, req.confirm_empty)
        .await
        .map_err(error_response)?;

    let (status, outcome, error) = match outcome {
        ManualSubmitOutcome::Started => (StatusCode::ACCEPTED, "started", None),
        ManualSubmitOutcome::ConfirmationRequired => {
            (StatusCode::OK, "confirmation_required", None)
        }
        ManualSubmitOutcome::Ignored => (StatusCode::OK, "ignored", None),
        ManualSubmitOutcome::Rejected(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "rejected",
            Some(e.to_string()),
        ),
    };

    Ok((
        status,
        Json(json!({
            "outcome": outcome,
            "error": error,
            "screen": view,
        })),
    ))
}

/// POST /api/v1/screens/{id}/submit/decline
pub async fn decline_submit(
    State(state): State<Arc<AppState>>,
    Path(screen_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = ScreenService::new(state);
    let view = service
        .decline_submit(screen_id)
        .await
        .map_err(error_response)?;

    Ok(Json(view))
}

/// DELETE /api/v1/screens/{id}
pub async fn unmount_screen(
    State(state): State<Arc<AppState>>,
    Path(screen_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = ScreenService::new(state);
    service.unmount(screen_id).await.map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}
