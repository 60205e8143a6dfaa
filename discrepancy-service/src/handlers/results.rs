//! Read side: paginated discrepancies and report detail.

use crate::dtos::{PaginatedResponse, ReportDetailResponse, ResultsQuery};
use crate::handlers::rejected;
use crate::startup::AppState;
use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

fn report_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id)
        .map_err(|rejection| rejected("malformed_path", rejection.body_text()))
}

pub async fn get_results(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<ResultsQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse>, AppError> {
    let report_id = report_id(path)?;
    let Query(query) =
        query.map_err(|rejection| rejected("malformed_query", rejection.body_text()))?;
    let request = query.to_page_request(state.config.results.default_page_size)?;

    tracing::debug!(
        report_id,
        page = request.page,
        page_size = request.page_size,
        discrepancy_type = ?request.discrepancy_type,
        "Fetching results"
    );

    let page = state.reader.page(report_id, &request).await?;
    if !page.report_finalized {
        tracing::warn!(report_id, "Serving results of an unfinalized report");
    }

    Ok(Json(PaginatedResponse::from_page(
        page,
        request.discrepancy_type,
    )))
}

pub async fn get_report(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<ReportDetailResponse>, AppError> {
    let summary = state.reader.report_summary(report_id(path)?).await?;
    Ok(Json(summary.into()))
}

/// Delete a report and all its discrepancies.
pub async fn delete_report(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    state.reconciler.recorder().delete(report_id(path)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
