//! Reconciliation runs.

use crate::dtos::ReconcileRequest;
use crate::handlers::rejected;
use crate::models::Report;
use crate::services::record_error;
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

/// Reconcile the two posted datasets and return the finalized report.
pub async fn reconcile(
    State(state): State<AppState>,
    payload: Result<Json<ReconcileRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Report>), AppError> {
    let Json(payload) =
        payload.map_err(|rejection| rejected("malformed_body", rejection.body_text()))?;

    tracing::info!(
        system_a = payload.system_a.len(),
        system_b = payload.system_b.len(),
        "Starting reconciliation"
    );

    let limit = state.config.engine.run_timeout;
    let run = state
        .reconciler
        .reconcile(payload.system_a, payload.system_b);

    match tokio::time::timeout(limit, run).await {
        Ok(result) => {
            let report = result?;
            tracing::info!(
                report_id = report.report_id,
                processing_time = report.processing_time,
                "Reconciliation finished"
            );
            Ok((StatusCode::CREATED, Json(report)))
        }
        Err(_) => {
            record_error("timeout");
            tracing::warn!(timeout_secs = limit.as_secs_f64(), "Reconciliation timed out");
            Err(AppError::GatewayTimeout(format!(
                "reconciliation exceeded {:?}; any report created stays unfinalized",
                limit
            )))
        }
    }
}

/// All reports, newest first.
pub async fn list_reports(State(state): State<AppState>) -> Result<Json<Vec<Report>>, AppError> {
    let reports = state.reader.list_reports().await?;
    Ok(Json(reports))
}
