//! Engine error taxonomy.

use crate::engine::batch_writer::BatchFailure;
use crate::models::{NewDiscrepancy, Side};
use crate::services::StoreError;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Input rejected before any state was persisted.
    #[error("malformed record in {side} at index {index}: {reason}")]
    MalformedRecord {
        side: Side,
        index: usize,
        reason: &'static str,
    },

    /// Some batches did not commit; the report stays `created`.
    #[error("{0}")]
    BatchWriteFailed(Box<PartialFailure>),

    #[error("report {0} not found")]
    ReportNotFound(i64),

    #[error("report {0} is already finalized")]
    ReportAlreadyFinalized(i64),

    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("classification task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::MalformedRecord { .. } => "malformed_record",
            EngineError::BatchWriteFailed(_) => "batch_write_failed",
            EngineError::ReportNotFound(_) => "report_not_found",
            EngineError::ReportAlreadyFinalized(_) => "report_already_finalized",
            EngineError::Validation(_) => "validation_error",
            EngineError::Store(_) => "store_error",
            EngineError::Task(_) => "task_error",
        }
    }
}

/// Outcome of a run whose persistence only partly succeeded.
///
/// Holds the classified stream so the caller can re-dispatch exactly the
/// failed ranges with `Reconciler::retry_failed`, or finalize anyway with
/// `Reconciler::accept_partial`.
pub struct PartialFailure {
    pub report_id: i64,
    pub total_batches: usize,
    pub failures: Vec<BatchFailure>,
    pub(crate) records: Arc<[NewDiscrepancy]>,
    pub(crate) started: Instant,
}

impl PartialFailure {
    /// Number of discrepancies not persisted.
    pub fn missing_rows(&self) -> usize {
        self.failures.iter().map(|f| f.range.len()).sum()
    }
}

impl fmt::Debug for PartialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialFailure")
            .field("report_id", &self.report_id)
            .field("total_batches", &self.total_batches)
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for PartialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} batches failed for report {}:",
            self.failures.len(),
            self.total_batches,
            self.report_id
        )?;
        for failure in &self.failures {
            write!(
                f,
                " [batch {} records {}..{}: {}]",
                failure.batch_index, failure.range.start, failure.range.end, failure.message
            )?;
        }
        Ok(())
    }
}
