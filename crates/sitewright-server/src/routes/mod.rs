//! API route handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sitewright_core::{TaskRequest, TaskResponse};
use thiserror::Error;

use crate::state::AppState;

/// Failures surfaced to API callers as `{"detail": ...}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid secret")]
    Unauthorized,

    #[error("{0}")]
    Unprocessable(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (self.status(), body).into_response()
    }
}

// ========== Service Routes ==========

/// Service metadata
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "sitewright",
        "version": sitewright_core::version(),
        "status": "running",
        "endpoints": {
            "submit": "POST /api-endpoint",
            "health": "GET /health",
            "providers": "GET /health/providers"
        }
    }))
}

/// Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Reachability of each generation provider
pub async fn provider_health(State(state): State<AppState>) -> impl IntoResponse {
    let providers = state.pipeline.providers().health().await;
    let all_healthy = !providers.is_empty() && providers.values().all(|ok| *ok);
    Json(serde_json::json!({
        "status": if all_healthy { "healthy" } else { "degraded" },
        "providers": providers
    }))
}

// ========== Task Routes ==========

/// Accept a task and run it in the background
pub async fn submit_task(
    State(state): State<AppState>,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Json<TaskResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "rejected malformed task request");
        ApiError::Unprocessable(rejection.body_text())
    })?;

    if !state.secret.verify(&request.secret) {
        tracing::warn!(task = %request.task, email = %request.email, "invalid secret");
        return Err(ApiError::Unauthorized);
    }

    request
        .validate(state.max_repo_name_length)
        .map_err(|e| ApiError::Unprocessable(e.to_string()))?;

    tracing::info!(
        task = %request.task,
        round = request.round,
        attachments = request.attachments.len(),
        "task accepted"
    );

    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        pipeline.run(request).await;
    });

    Ok(Json(TaskResponse::accepted()))
}
