//! One reconciliation run, end to end.

use crate::engine::batch_writer::{
    plan_batches, BatchOutcome, BatchWriter, DEFAULT_BATCH_SIZE, DEFAULT_WRITE_WORKERS,
};
use crate::engine::classifier::classify;
use crate::engine::differ::diff;
use crate::engine::error::{EngineError, PartialFailure};
use crate::engine::recorder::ReportRecorder;
use crate::engine::transaction_set::TransactionSet;
use crate::models::{DiscrepancyType, NewDiscrepancy, Report, Side, TransactionRecord};
use crate::services::metrics::{record_discrepancies, record_reconciliation_run};
use crate::services::store::DiscrepancyStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub batch_size: usize,
    pub write_workers: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            write_workers: DEFAULT_WRITE_WORKERS,
        }
    }
}

/// Classified output of the pure phase of a run.
struct Classified {
    system_a_count: usize,
    system_b_count: usize,
    records: Arc<[NewDiscrepancy]>,
}

#[derive(Clone)]
pub struct Reconciler {
    writer: BatchWriter,
    recorder: ReportRecorder,
}

impl Reconciler {
    pub fn new(store: Arc<dyn DiscrepancyStore>, settings: EngineSettings) -> Self {
        Self {
            writer: BatchWriter::new(store.clone(), settings.batch_size, settings.write_workers),
            recorder: ReportRecorder::new(store),
        }
    }

    pub fn recorder(&self) -> &ReportRecorder {
        &self.recorder
    }

    /// Reconcile System A against System B and persist the result.
    ///
    /// Malformed input fails before anything is written. On success the
    /// returned report is finalized. If some batches fail the report stays
    /// `created` and `EngineError::BatchWriteFailed` carries what is needed
    /// to retry or accept.
    #[instrument(skip_all, fields(system_a = system_a.len(), system_b = system_b.len()))]
    pub async fn reconcile(
        &self,
        system_a: Vec<TransactionRecord>,
        system_b: Vec<TransactionRecord>,
    ) -> Result<Report, EngineError> {
        let started = Instant::now();

        // Set construction and classification are CPU bound.
        let classified =
            match tokio::task::spawn_blocking(move || classify_inputs(system_a, system_b)).await? {
                Ok(classified) => classified,
                Err(e) => {
                    record_reconciliation_run("rejected");
                    return Err(e);
                }
            };

        let report = self
            .recorder
            .create(classified.system_a_count, classified.system_b_count)
            .await?;

        info!(
            report_id = report.report_id,
            system_a_count = classified.system_a_count,
            system_b_count = classified.system_b_count,
            discrepancies = classified.records.len(),
            "Classification complete"
        );

        let batches = plan_batches(classified.records.len(), self.writer.batch_size());
        let total_batches = batches.len();
        let outcome = self
            .writer
            .write_batches(report.report_id, classified.records.clone(), batches)
            .await;

        self.conclude(
            report.report_id,
            total_batches,
            classified.records,
            started,
            outcome,
        )
        .await
    }

    /// Re-dispatch only the failed ranges of an earlier run.
    #[instrument(skip_all, fields(report_id = failure.report_id, failed = failure.failures.len()))]
    pub async fn retry_failed(&self, failure: PartialFailure) -> Result<Report, EngineError> {
        let PartialFailure {
            report_id,
            total_batches,
            failures,
            records,
            started,
        } = failure;

        let batches = failures
            .into_iter()
            .map(|f| (f.batch_index, f.range))
            .collect();
        let outcome = self
            .writer
            .write_batches(report_id, records.clone(), batches)
            .await;

        self.conclude(report_id, total_batches, records, started, outcome)
            .await
    }

    /// Finalize despite failed batches. The caller takes responsibility for
    /// the missing rows.
    #[instrument(skip_all, fields(report_id = failure.report_id))]
    pub async fn accept_partial(&self, failure: PartialFailure) -> Result<Report, EngineError> {
        warn!(
            report_id = failure.report_id,
            failed_batches = failure.failures.len(),
            missing_rows = failure.missing_rows(),
            "Finalizing report with failed batches"
        );
        let report = self
            .recorder
            .finalize(failure.report_id, failure.started)
            .await?;
        record_reconciliation_run("accepted_partial");
        Ok(report)
    }

    async fn conclude(
        &self,
        report_id: i64,
        total_batches: usize,
        records: Arc<[NewDiscrepancy]>,
        started: Instant,
        outcome: BatchOutcome,
    ) -> Result<Report, EngineError> {
        if outcome.is_complete() {
            let report = self.recorder.finalize(report_id, started).await?;
            record_reconciliation_run("success");
            return Ok(report);
        }

        record_reconciliation_run("partial_failure");
        warn!(
            report_id,
            failed_batches = outcome.failures.len(),
            total_batches,
            "Report left provisional after batch failures"
        );
        Err(EngineError::BatchWriteFailed(Box::new(PartialFailure {
            report_id,
            total_batches,
            failures: outcome.failures,
            records,
            started,
        })))
    }
}

fn classify_inputs(
    system_a: Vec<TransactionRecord>,
    system_b: Vec<TransactionRecord>,
) -> Result<Classified, EngineError> {
    let a = TransactionSet::from_records(Side::SystemA, system_a)?;
    let b = TransactionSet::from_records(Side::SystemB, system_b)?;
    let partition = diff(&a, &b);
    let records = classify(&a, &b, &partition);

    let mut per_type: HashMap<DiscrepancyType, usize> = HashMap::new();
    for d in &records {
        *per_type.entry(d.discrepancy_type).or_default() += 1;
    }
    for (discrepancy_type, count) in per_type {
        record_discrepancies(discrepancy_type.as_str(), count);
    }

    Ok(Classified {
        system_a_count: a.len(),
        system_b_count: b.len(),
        records: records.into(),
    })
}
