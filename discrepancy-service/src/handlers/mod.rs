//! HTTP handlers for discrepancy-service.

pub mod reconcile;
pub mod results;

use crate::engine::EngineError;
use crate::services::{get_metrics, record_error};
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        record_error(err.kind());
        match err {
            EngineError::MalformedRecord { .. } => AppError::BadRequest(anyhow::Error::new(err)),
            EngineError::ReportNotFound(_) => AppError::NotFound(anyhow::Error::new(err)),
            EngineError::ReportAlreadyFinalized(_) => AppError::Conflict(anyhow::Error::new(err)),
            EngineError::Validation(errors) => AppError::ValidationError(errors),
            EngineError::Store(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            EngineError::BatchWriteFailed(_) | EngineError::Task(_) => {
                AppError::InternalError(anyhow::Error::new(err))
            }
        }
    }
}

/// Extractor rejections share the JSON error body of every other failure.
pub(crate) fn rejected(error_type: &str, message: String) -> AppError {
    record_error(error_type);
    AppError::BadRequest(anyhow::anyhow!(message))
}

/// Liveness probe; reports the store's health.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(()) => {
            tracing::debug!("Health check passed");
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ok",
                    "service": state.config.service_name,
                    "version": state.config.service_version,
                })),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed - store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": state.config.service_name,
                    "error": e.to_string(),
                })),
            )
        }
    }
}

pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Prometheus scrape endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
