//! Report lifecycle: `created` (provisional) -> `finalized`.

use crate::engine::error::EngineError;
use crate::models::Report;
use crate::services::store::DiscrepancyStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct ReportRecorder {
    store: Arc<dyn DiscrepancyStore>,
}

impl ReportRecorder {
    pub fn new(store: Arc<dyn DiscrepancyStore>) -> Self {
        Self { store }
    }

    /// Insert the provisional report once both set sizes are known.
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        system_a_count: usize,
        system_b_count: usize,
    ) -> Result<Report, EngineError> {
        let report = self
            .store
            .create_report(system_a_count as i64, system_b_count as i64)
            .await?;
        info!(report_id = report.report_id, "Provisional report recorded");
        Ok(report)
    }

    /// Write the elapsed time since `started` and finalize. Succeeds at most
    /// once per report.
    #[instrument(skip(self, started))]
    pub async fn finalize(&self, report_id: i64, started: Instant) -> Result<Report, EngineError> {
        let processing_time = started.elapsed().as_secs_f64();
        match self
            .store
            .finalize_report(report_id, processing_time)
            .await?
        {
            Some(report) => {
                info!(report_id, processing_time, "Report finalized");
                Ok(report)
            }
            None => match self.store.get_report(report_id).await? {
                Some(_) => Err(EngineError::ReportAlreadyFinalized(report_id)),
                None => Err(EngineError::ReportNotFound(report_id)),
            },
        }
    }

    /// Remove a report and, by cascade, its discrepancies.
    #[instrument(skip(self))]
    pub async fn delete(&self, report_id: i64) -> Result<(), EngineError> {
        if self.store.delete_report(report_id).await? {
            info!(report_id, "Report deleted");
            Ok(())
        } else {
            Err(EngineError::ReportNotFound(report_id))
        }
    }
}
