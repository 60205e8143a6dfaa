//! Services module for discrepancy-service.

pub mod database;
pub mod memory;
pub mod metrics;
pub mod store;

pub use database::Database;
pub use memory::MemoryStore;
pub use metrics::{
    get_metrics, init_metrics, record_batch_commit, record_discrepancies, record_error,
    record_reconciliation_run,
};
pub use store::{DiscrepancyStore, StoreError};
