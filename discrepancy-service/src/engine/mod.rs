//! Reconciliation engine: keyed transaction sets, diff and classification,
//! and the batched persistence pipeline that records the result.
//!
//! A run flows `TransactionSet` (A, B) -> [`diff`] -> [`classify`] ->
//! [`BatchWriter`], bracketed by [`ReportRecorder`]. [`Reconciler`] wires the
//! steps together; [`ResultReader`] is the independent read path.

pub mod batch_writer;
pub mod classifier;
pub mod differ;
pub mod error;
pub mod reader;
pub mod reconciler;
pub mod recorder;
pub mod transaction_set;

pub use batch_writer::{plan_batches, BatchFailure, BatchOutcome, BatchWriter};
pub use classifier::classify;
pub use differ::{diff, KeyPartition};
pub use error::{EngineError, PartialFailure};
pub use reader::{DiscrepancyPage, PageRequest, ResultReader, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use reconciler::{EngineSettings, Reconciler};
pub use recorder::ReportRecorder;
pub use transaction_set::TransactionSet;

#[cfg(test)]
pub(crate) mod test_support;
