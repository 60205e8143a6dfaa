//! In-process store with the same transactional contract as [`Database`].
//!
//! Used by tests and for running the service without PostgreSQL. A single
//! write lock per batch gives the all-or-nothing visibility the engine relies
//! on.
//!
//! [`Database`]: crate::services::Database

use crate::models::{
    Discrepancy, DiscrepancyType, NewDiscrepancy, Report, ReportStatus, TypeCounts,
};
use crate::services::store::{DiscrepancyStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    next_report_id: i64,
    next_discrepancy_id: i64,
    reports: BTreeMap<i64, Report>,
    // report_id -> seq -> row
    discrepancies: HashMap<i64, BTreeMap<i64, Discrepancy>>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn passes_filter(row: &Discrepancy, filter: Option<DiscrepancyType>) -> bool {
    filter.map_or(true, |t| row.discrepancy_type == t.as_str())
}

#[async_trait]
impl DiscrepancyStore for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_report(
        &self,
        system_a_count: i64,
        system_b_count: i64,
    ) -> Result<Report, StoreError> {
        let mut state = self.state.write().await;
        state.next_report_id += 1;
        let report = Report {
            report_id: state.next_report_id,
            created_at: Utc::now(),
            status: ReportStatus::Created.as_str().to_string(),
            system_a_count,
            system_b_count,
            processing_time: 0.0,
            finalized_at: None,
        };
        state.reports.insert(report.report_id, report.clone());
        state.discrepancies.entry(report.report_id).or_default();
        Ok(report)
    }

    async fn insert_batch(
        &self,
        report_id: i64,
        batch: &[NewDiscrepancy],
    ) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        if !state.reports.contains_key(&report_id) {
            return Err(StoreError::MissingReport(report_id));
        }

        // Validate the whole batch before touching anything.
        let existing = state.discrepancies.get(&report_id);
        let mut seen = std::collections::HashSet::with_capacity(batch.len());
        for d in batch {
            let stored = existing.is_some_and(|rows| rows.contains_key(&d.seq));
            if stored || !seen.insert(d.seq) {
                return Err(StoreError::DuplicateSeq {
                    report_id,
                    seq: d.seq,
                });
            }
        }

        let first_id = state.next_discrepancy_id + 1;
        state.next_discrepancy_id += batch.len() as i64;
        let rows = state.discrepancies.entry(report_id).or_default();
        for (offset, d) in batch.iter().enumerate() {
            rows.insert(
                d.seq,
                Discrepancy {
                    discrepancy_id: first_id + offset as i64,
                    report_id,
                    seq: d.seq,
                    transaction_id: d.transaction_id.clone(),
                    discrepancy_type: d.discrepancy_type.as_str().to_string(),
                    amount_a: d.amount_a,
                    amount_b: d.amount_b,
                    status_a: d.status_a.clone(),
                    status_b: d.status_b.clone(),
                    currency: d.currency.clone(),
                },
            );
        }

        Ok(batch.len() as u64)
    }

    async fn finalize_report(
        &self,
        report_id: i64,
        processing_time: f64,
    ) -> Result<Option<Report>, StoreError> {
        let mut state = self.state.write().await;
        let Some(report) = state.reports.get_mut(&report_id) else {
            return Ok(None);
        };
        if report.is_finalized() {
            return Ok(None);
        }
        report.status = ReportStatus::Finalized.as_str().to_string();
        report.processing_time = processing_time;
        report.finalized_at = Some(Utc::now());
        Ok(Some(report.clone()))
    }

    async fn get_report(&self, report_id: i64) -> Result<Option<Report>, StoreError> {
        Ok(self.state.read().await.reports.get(&report_id).cloned())
    }

    async fn list_reports(&self) -> Result<Vec<Report>, StoreError> {
        let state = self.state.read().await;
        let mut reports: Vec<Report> = state.reports.values().cloned().collect();
        reports.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.report_id.cmp(&a.report_id))
        });
        Ok(reports)
    }

    async fn delete_report(&self, report_id: i64) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        state.discrepancies.remove(&report_id);
        Ok(state.reports.remove(&report_id).is_some())
    }

    async fn count_discrepancies(
        &self,
        report_id: i64,
        filter: Option<DiscrepancyType>,
    ) -> Result<i64, StoreError> {
        let state = self.state.read().await;
        let count = state
            .discrepancies
            .get(&report_id)
            .map_or(0, |rows| rows.values().filter(|r| passes_filter(r, filter)).count());
        Ok(count as i64)
    }

    async fn list_discrepancies(
        &self,
        report_id: i64,
        filter: Option<DiscrepancyType>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Discrepancy>, StoreError> {
        let state = self.state.read().await;
        let Some(rows) = state.discrepancies.get(&report_id) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .values()
            .filter(|r| passes_filter(r, filter))
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_by_type(&self, report_id: i64) -> Result<TypeCounts, StoreError> {
        let state = self.state.read().await;
        let mut counts = TypeCounts::default();
        if let Some(rows) = state.discrepancies.get(&report_id) {
            for row in rows.values() {
                if let Some(t) = DiscrepancyType::parse(&row.discrepancy_type) {
                    counts.add(t, 1);
                }
            }
        }
        Ok(counts)
    }
}
