//! Common test utilities for discrepancy-service integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use discrepancy_service::config::{
    DatabaseConfig, DiscrepancyConfig, EngineConfig, ResultsConfig,
};
use discrepancy_service::models::{
    Discrepancy, DiscrepancyType, NewDiscrepancy, Report, TypeCounts,
};
use discrepancy_service::services::{DiscrepancyStore, MemoryStore, StoreError};
use discrepancy_service::startup::Application;
use serde_json::{json, Value};
use service_core::config::Config as CommonConfig;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,discrepancy_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Test configuration; the database URL is unused with an injected store.
pub fn test_config() -> DiscrepancyConfig {
    DiscrepancyConfig {
        common: CommonConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        service_name: "discrepancy-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 2,
            min_connections: 1,
        },
        engine: EngineConfig {
            batch_size: 3,
            write_workers: 2,
            ..EngineConfig::default()
        },
        results: ResultsConfig::default(),
    }
}

/// Test application wrapper.
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn post_reconcile(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/reconcile", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Spawn the application over a fresh in-memory store.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config(), Arc::new(MemoryStore::new())).await
}

pub async fn spawn_app_with(config: DiscrepancyConfig, store: Arc<dyn DiscrepancyStore>) -> TestApp {
    init_tracing();

    let app = Application::build_with_store(config, store)
        .await
        .expect("Failed to build application");
    let port = app.port();

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        port,
        client: reqwest::Client::new(),
    }
}

pub fn txn(id: &str, amount: &str, status: &str) -> Value {
    json!({
        "transaction_id": id,
        "amount": amount,
        "currency": "USD",
        "status": status,
    })
}

/// Store whose batches fail while their first `seq` is poisoned, or that
/// stalls every batch insert for a fixed delay.
pub struct FlakyStore {
    inner: MemoryStore,
    poisoned: Mutex<HashSet<i64>>,
    delay: Option<Duration>,
}

impl FlakyStore {
    pub fn failing_at(first_seqs: &[i64]) -> Self {
        Self {
            inner: MemoryStore::new(),
            poisoned: Mutex::new(first_seqs.iter().copied().collect()),
            delay: None,
        }
    }

    pub fn stalling(delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            poisoned: Mutex::new(HashSet::new()),
            delay: Some(delay),
        }
    }
}

#[async_trait]
impl DiscrepancyStore for FlakyStore {
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
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let poisoned = batch
            .first()
            .is_some_and(|d| self.poisoned.lock().unwrap().contains(&d.seq));
        if poisoned {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.insert_batch(report_id, batch).await
    }

    async fn finalize_report(
        &self,
        report_id: i64,
        processing_time: f64,
    ) -> Result<Option<Report>, StoreError> {
        self.inner.finalize_report(report_id, processing_time).await
    }

    async fn get_report(&self, report_id: i64) -> Result<Option<Report>, StoreError> {
        self.inner.get_report(report_id).await
    }

    async fn list_reports(&self) -> Result<Vec<Report>, StoreError> {
        self.inner.list_reports().await
    }

    async fn delete_report(&self, report_id: i64) -> Result<bool, StoreError> {
        self.inner.delete_report(report_id).await
    }

    async fn count_discrepancies(
        &self,
        report_id: i64,
        filter: Option<DiscrepancyType>,
    ) -> Result<i64, StoreError> {
        self.inner.count_discrepancies(report_id, filter).await
    }

    async fn list_discrepancies(
        &self,
        report_id: i64,
        filter: Option<DiscrepancyType>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Discrepancy>, StoreError> {
        self.inner
            .list_discrepancies(report_id, filter, offset, limit)
            .await
    }

    async fn count_by_type(&self, report_id: i64) -> Result<TypeCounts, StoreError> {
        self.inner.count_by_type(report_id).await
    }
}
