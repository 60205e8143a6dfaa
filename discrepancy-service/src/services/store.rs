//! Storage seam for reports and their discrepancies.

use crate::models::{Discrepancy, DiscrepancyType, NewDiscrepancy, Report, TypeCounts};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("report {0} does not exist")]
    MissingReport(i64),

    #[error("discrepancy seq {seq} already stored for report {report_id}")]
    DuplicateSeq { report_id: i64, seq: i64 },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Transactional store handle shared by the batch workers and the read path.
///
/// `insert_batch` must be all-or-nothing: after it returns an error none of
/// the batch's rows may be visible.
#[async_trait]
pub trait DiscrepancyStore: Send + Sync {
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Insert a provisional report (`status = created`, `processing_time = 0`).
    async fn create_report(
        &self,
        system_a_count: i64,
        system_b_count: i64,
    ) -> Result<Report, StoreError>;

    /// Atomically persist one batch. Returns the number of rows written.
    async fn insert_batch(
        &self,
        report_id: i64,
        batch: &[NewDiscrepancy],
    ) -> Result<u64, StoreError>;

    /// Move a `created` report to `finalized`. Returns `None` when no report
    /// with that id is still in `created`.
    async fn finalize_report(
        &self,
        report_id: i64,
        processing_time: f64,
    ) -> Result<Option<Report>, StoreError>;

    async fn get_report(&self, report_id: i64) -> Result<Option<Report>, StoreError>;

    /// All reports, newest first.
    async fn list_reports(&self) -> Result<Vec<Report>, StoreError>;

    /// Delete a report and every discrepancy it owns.
    async fn delete_report(&self, report_id: i64) -> Result<bool, StoreError>;

    async fn count_discrepancies(
        &self,
        report_id: i64,
        filter: Option<DiscrepancyType>,
    ) -> Result<i64, StoreError>;

    /// Discrepancies ordered by `seq`.
    async fn list_discrepancies(
        &self,
        report_id: i64,
        filter: Option<DiscrepancyType>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Discrepancy>, StoreError>;

    async fn count_by_type(&self, report_id: i64) -> Result<TypeCounts, StoreError>;
}
