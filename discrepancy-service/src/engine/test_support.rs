//! Shared fixtures for engine unit tests.

use crate::models::{
    Discrepancy, DiscrepancyType, NewDiscrepancy, Report, TransactionRecord, TypeCounts,
};
use crate::services::store::{DiscrepancyStore, StoreError};
use crate::services::MemoryStore;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Mutex;

pub fn record(id: &str, amount: Decimal, status: &str) -> TransactionRecord {
    TransactionRecord {
        transaction_id: Some(id.to_string()),
        amount: Some(amount),
        currency: Some("USD".to_string()),
        status: Some(status.to_string()),
    }
}

pub fn discrepancies(n: usize) -> Vec<NewDiscrepancy> {
    (0..n)
        .map(|i| NewDiscrepancy {
            seq: i as i64,
            transaction_id: format!("T{i}"),
            discrepancy_type: DiscrepancyType::MissingInB,
            amount_a: Some(Decimal::from(i as i64)),
            amount_b: None,
            status_a: Some("done".to_string()),
            status_b: None,
            currency: Some("USD".to_string()),
        })
        .collect()
}

/// Memory store that rejects any batch whose first `seq` is poisoned, and
/// panics inside `insert_batch` for batches starting at a crashing `seq`.
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    poisoned: Mutex<HashSet<i64>>,
    crashing: HashSet<i64>,
}

impl FailingStore {
    pub fn failing_at(seqs: &[i64]) -> Self {
        Self {
            inner: MemoryStore::new(),
            poisoned: Mutex::new(seqs.iter().copied().collect()),
            crashing: HashSet::new(),
        }
    }

    pub fn panicking_at(seqs: &[i64]) -> Self {
        Self {
            crashing: seqs.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn heal(&self) {
        self.poisoned.lock().unwrap().clear();
    }
}

#[async_trait]
impl DiscrepancyStore for FailingStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        self.inner.health_check().await
    }

    async fn create_report(&self, a: i64, b: i64) -> Result<Report, StoreError> {
        self.inner.create_report(a, b).await
    }

    async fn insert_batch(
        &self,
        report_id: i64,
        batch: &[NewDiscrepancy],
    ) -> Result<u64, StoreError> {
        let first = batch.first().map(|d| d.seq);
        if first.is_some_and(|seq| self.crashing.contains(&seq)) {
            panic!("store worker crashed");
        }
        if first.is_some_and(|seq| self.poisoned.lock().unwrap().contains(&seq)) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        self.inner.insert_batch(report_id, batch).await
    }

    async fn finalize_report(&self, id: i64, t: f64) -> Result<Option<Report>, StoreError> {
        self.inner.finalize_report(id, t).await
    }

    async fn get_report(&self, id: i64) -> Result<Option<Report>, StoreError> {
        self.inner.get_report(id).await
    }

    async fn list_reports(&self) -> Result<Vec<Report>, StoreError> {
        self.inner.list_reports().await
    }

    async fn delete_report(&self, id: i64) -> Result<bool, StoreError> {
        self.inner.delete_report(id).await
    }

    async fn count_discrepancies(
        &self,
        id: i64,
        filter: Option<DiscrepancyType>,
    ) -> Result<i64, StoreError> {
        self.inner.count_discrepancies(id, filter).await
    }

    async fn list_discrepancies(
        &self,
        id: i64,
        filter: Option<DiscrepancyType>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Discrepancy>, StoreError> {
        self.inner.list_discrepancies(id, filter, offset, limit).await
    }

    async fn count_by_type(&self, id: i64) -> Result<TypeCounts, StoreError> {
        self.inner.count_by_type(id).await
    }
}
