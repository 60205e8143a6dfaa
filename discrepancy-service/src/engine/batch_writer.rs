//! Parallel, batch-atomic persistence of a classified discrepancy stream.

use crate::models::NewDiscrepancy;
use crate::services::metrics::record_batch_commit;
use crate::services::store::DiscrepancyStore;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_BATCH_SIZE: usize = 50_000;
pub const DEFAULT_WRITE_WORKERS: usize = 4;

/// One batch that did not commit. `range` indexes the classified stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub batch_index: usize,
    pub range: Range<usize>,
    pub message: String,
}

/// Result of dispatching a set of batches; every dispatched batch is
/// accounted for either in `committed_rows` or in `failures`.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub dispatched: usize,
    pub committed_batches: usize,
    pub committed_rows: u64,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Split `len` records into `ceil(len / batch_size)` contiguous ranges.
pub fn plan_batches(len: usize, batch_size: usize) -> Vec<(usize, Range<usize>)> {
    let batch_size = batch_size.max(1);
    (0..len)
        .step_by(batch_size)
        .enumerate()
        .map(|(index, start)| (index, start..(start + batch_size).min(len)))
        .collect()
}

/// Writes batches through a bounded pool of store workers.
#[derive(Clone)]
pub struct BatchWriter {
    store: Arc<dyn DiscrepancyStore>,
    batch_size: usize,
    workers: usize,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn DiscrepancyStore>, batch_size: usize, workers: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            workers: workers.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Persist the whole stream for `report_id`.
    pub async fn write(&self, report_id: i64, records: Arc<[NewDiscrepancy]>) -> BatchOutcome {
        let batches = plan_batches(records.len(), self.batch_size);
        self.write_batches(report_id, records, batches).await
    }

    /// Persist the given ranges of `records`, at most `workers` at a time.
    ///
    /// Returns only after every dispatched batch has committed or failed.
    /// Dropping the returned future aborts batches still in flight; those
    /// roll back in the store and already committed batches stay.
    #[instrument(skip(self, records, batches), fields(report_id = report_id, batches = batches.len(), workers = self.workers))]
    pub async fn write_batches(
        &self,
        report_id: i64,
        records: Arc<[NewDiscrepancy]>,
        batches: Vec<(usize, Range<usize>)>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            dispatched: batches.len(),
            ..Default::default()
        };
        if batches.is_empty() {
            return outcome;
        }

        let permits = Arc::new(Semaphore::new(self.workers));
        let mut pending: BTreeMap<usize, Range<usize>> = BTreeMap::new();
        let mut tasks = JoinSet::new();

        for (batch_index, range) in batches {
            pending.insert(batch_index, range.clone());
            let permits = permits.clone();
            let store = self.store.clone();
            let records = records.clone();

            tasks.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return (batch_index, Err(e.to_string())),
                };
                let started = Instant::now();
                let result = store
                    .insert_batch(report_id, &records[range.clone()])
                    .await
                    .map_err(|e| e.to_string());
                let elapsed = started.elapsed().as_secs_f64();
                match &result {
                    Ok(rows) => {
                        record_batch_commit("success", elapsed);
                        debug!(batch_index, rows, elapsed, "Batch committed");
                    }
                    Err(e) => {
                        record_batch_commit("failure", elapsed);
                        warn!(batch_index, start = range.start, end = range.end, error = %e, "Batch commit failed");
                    }
                }
                (batch_index, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let Ok((batch_index, result)) = joined else {
                // Panicked task; its batch stays in `pending` and is reported below.
                continue;
            };
            let Some(range) = pending.remove(&batch_index) else {
                continue;
            };
            match result {
                Ok(rows) => {
                    outcome.committed_batches += 1;
                    outcome.committed_rows += rows;
                }
                Err(message) => outcome.failures.push(BatchFailure {
                    batch_index,
                    range,
                    message,
                }),
            }
        }

        for (batch_index, range) in pending {
            outcome.failures.push(BatchFailure {
                batch_index,
                range,
                message: "batch worker terminated unexpectedly".to_string(),
            });
        }
        outcome.failures.sort_by_key(|f| f.batch_index);

        info!(
            committed_batches = outcome.committed_batches,
            committed_rows = outcome.committed_rows,
            failed_batches = outcome.failures.len(),
            "Batch dispatch finished"
        );

        outcome
    }
}
