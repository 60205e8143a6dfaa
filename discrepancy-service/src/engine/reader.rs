//! Paginated read path over persisted reports.

use crate::engine::error::EngineError;
use crate::models::{Discrepancy, DiscrepancyType, Report, TypeCounts};
use crate::services::store::DiscrepancyStore;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::instrument;
use validator::{Validate, ValidationError, ValidationErrors};

pub const DEFAULT_PAGE_SIZE: u32 = 100;
/// Hard ceiling; larger page sizes are rejected, never clamped.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// One page of a report's discrepancies. Pages are 1-based.
#[derive(Debug, Clone, Validate)]
pub struct PageRequest {
    #[validate(range(min = 1))]
    pub page: u32,
    #[validate(range(min = 1, max = 1000))]
    pub page_size: u32,
    pub discrepancy_type: Option<DiscrepancyType>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            discrepancy_type: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscrepancyPage {
    pub report_id: i64,
    /// `false` while the report is still `created`: the list may be incomplete.
    pub report_finalized: bool,
    pub count: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
    pub results: Vec<Discrepancy>,
}

#[derive(Clone)]
pub struct ResultReader {
    store: Arc<dyn DiscrepancyStore>,
}

impl ResultReader {
    pub fn new(store: Arc<dyn DiscrepancyStore>) -> Self {
        Self { store }
    }

    /// All reports, newest first.
    #[instrument(skip(self))]
    pub async fn list_reports(&self) -> Result<Vec<Report>, EngineError> {
        Ok(self.store.list_reports().await?)
    }

    #[instrument(skip(self))]
    pub async fn get_report(&self, report_id: i64) -> Result<Report, EngineError> {
        self.store
            .get_report(report_id)
            .await?
            .ok_or(EngineError::ReportNotFound(report_id))
    }

    /// Report plus its per-type discrepancy totals.
    #[instrument(skip(self))]
    pub async fn report_summary(&self, report_id: i64) -> Result<(Report, TypeCounts), EngineError> {
        let report = self.get_report(report_id).await?;
        let counts = self.store.count_by_type(report_id).await?;
        Ok((report, counts))
    }

    /// Fetch one page in `seq` order, optionally filtered by type.
    ///
    /// An unknown report is `ReportNotFound`; an existing report with no
    /// discrepancies yields an empty first page.
    #[instrument(skip(self), fields(page = request.page, page_size = request.page_size))]
    pub async fn page(
        &self,
        report_id: i64,
        request: &PageRequest,
    ) -> Result<DiscrepancyPage, EngineError> {
        request.validate()?;

        let report = self.get_report(report_id).await?;
        let count = self
            .store
            .count_discrepancies(report_id, request.discrepancy_type)
            .await?;

        let page_size = i64::from(request.page_size);
        let total_pages = ((count + page_size - 1) / page_size) as u32;
        if request.page > total_pages.max(1) {
            return Err(invalid_page(request.page, total_pages).into());
        }

        let offset = i64::from(request.page - 1) * page_size;
        let results = self
            .store
            .list_discrepancies(report_id, request.discrepancy_type, offset, page_size)
            .await?;

        Ok(DiscrepancyPage {
            report_id,
            report_finalized: report.is_finalized(),
            count,
            page: request.page,
            page_size: request.page_size,
            total_pages,
            has_next: request.page < total_pages,
            has_previous: request.page > 1,
            results,
        })
    }
}

fn invalid_page(page: u32, total_pages: u32) -> ValidationErrors {
    let mut error = ValidationError::new("invalid_page");
    error.message = Some(Cow::Owned(format!(
        "page {} is out of range (last page is {})",
        page,
        total_pages.max(1)
    )));
    let mut errors = ValidationErrors::new();
    errors.add("page", error);
    errors
}
