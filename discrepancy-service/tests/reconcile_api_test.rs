//! Integration tests for running reconciliations over HTTP.

mod common;

use common::{spawn_app, spawn_app_with, test_config, txn, FlakyStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn reconcile_returns_finalized_report() {
    let app = spawn_app().await;

    let response = app
        .post_reconcile(&json!({
            "system_a": [txn("T1", "100.00", "done"), txn("T2", "50.00", "ok")],
            "system_b": [txn("T2", "75.00", "ok"), txn("T4", "5.00", "done")],
        }))
        .await;

    assert_eq!(response.status(), 201);
    let report: Value = response.json().await.unwrap();
    assert_eq!(report["status"], "finalized");
    assert_eq!(report["system_a_count"], 2);
    assert_eq!(report["system_b_count"], 2);
    assert!(report["processing_time"].as_f64().unwrap() >= 0.0);
    assert!(report["finalized_at"].is_string());
}

#[tokio::test]
async fn empty_inputs_produce_empty_report() {
    let app = spawn_app().await;

    let response = app.post_reconcile(&json!({})).await;
    assert_eq!(response.status(), 201);
    let report: Value = response.json().await.unwrap();
    assert_eq!(report["system_a_count"], 0);
    assert_eq!(report["system_b_count"], 0);

    let detail: Value = app
        .get(&format!("/reports/{}", report["report_id"]))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(detail["total_discrepancies"], 0);
}

#[tokio::test]
async fn record_without_transaction_id_is_rejected_and_nothing_is_stored() {
    let app = spawn_app().await;

    let response = app
        .post_reconcile(&json!({
            "system_a": [txn("T1", "1.00", "done"), {"amount": "2.00", "status": "done"}],
            "system_b": [],
        }))
        .await;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "bad_request");
    assert!(body["error"].as_str().unwrap().contains("system_a at index 1"));

    let reports: Vec<Value> = app.get("/reconcile").await.json().await.unwrap();
    assert!(reports.is_empty());
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(format!("{}/reconcile", app.address))
        .header("content-type", "application/json")
        .body("{\"system_a\": [")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn reports_are_listed_newest_first() {
    let app = spawn_app().await;

    let first: Value = app
        .post_reconcile(&json!({"system_a": [txn("T1", "1", "a")]}))
        .await
        .json()
        .await
        .unwrap();
    let second: Value = app
        .post_reconcile(&json!({"system_b": [txn("T1", "1", "a")]}))
        .await
        .json()
        .await
        .unwrap();

    let reports: Vec<Value> = app.get("/reconcile").await.json().await.unwrap();
    let ids: Vec<&Value> = reports.iter().map(|r| &r["report_id"]).collect();
    assert_eq!(ids, vec![&second["report_id"], &first["report_id"]]);
}

#[tokio::test]
async fn failed_batch_leaves_report_unfinalized() {
    // Batch size 3: the second batch starts at seq 3.
    let store = Arc::new(FlakyStore::failing_at(&[3]));
    let app = spawn_app_with(test_config(), store).await;

    let system_a: Vec<Value> = (0..7).map(|i| txn(&format!("T{i}"), "1.00", "done")).collect();
    let response = app.post_reconcile(&json!({ "system_a": system_a })).await;

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "internal_error");
    assert!(body["details"].as_str().unwrap().contains("3..6"));

    let reports: Vec<Value> = app.get("/reconcile").await.json().await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["status"], "created");

    let page: Value = app
        .get(&format!("/results/{}", reports[0]["report_id"]))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(page["report_finalized"], false);
    assert_eq!(page["count"], 4);
}

#[tokio::test]
async fn run_exceeding_timeout_returns_gateway_timeout() {
    let mut config = test_config();
    config.engine.run_timeout = Duration::from_millis(100);
    let store = Arc::new(FlakyStore::stalling(Duration::from_secs(5)));
    let app = spawn_app_with(config, store).await;

    let response = app
        .post_reconcile(&json!({"system_a": [txn("T1", "1.00", "done")]}))
        .await;

    assert_eq!(response.status(), 504);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "timeout");

    let reports: Vec<Value> = app.get("/reconcile").await.json().await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["status"], "created");
}

#[tokio::test]
async fn health_and_metrics_endpoints() {
    let app = spawn_app().await;

    let health = app.get("/health").await;
    assert_eq!(health.status(), 200);
    let body: Value = health.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    assert_eq!(app.get("/ready").await.status(), 200);

    app.post_reconcile(&json!({"system_a": [txn("T1", "1", "a")]}))
        .await;
    let metrics = app.get("/metrics").await.text().await.unwrap();
    assert!(metrics.contains("discrepancy_reconciliation_runs_total"));
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-42")
    );
}
