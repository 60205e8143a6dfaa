//! PostgreSQL store tests. Skipped unless `TEST_DATABASE_URL` is set.

use discrepancy_service::models::{DiscrepancyType, NewDiscrepancy};
use discrepancy_service::services::{Database, DiscrepancyStore, StoreError};
use rust_decimal_macros::dec;

async fn database() -> Option<Database> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let db = Database::new(&url, 2, 1)
        .await
        .expect("Failed to connect to test database");
    db.run_migrations().await.expect("Failed to run migrations");
    Some(db)
}

fn row(seq: i64, id: &str, t: DiscrepancyType) -> NewDiscrepancy {
    NewDiscrepancy {
        seq,
        transaction_id: id.to_string(),
        discrepancy_type: t,
        amount_a: Some(dec!(12.345)),
        amount_b: None,
        status_a: Some("done".to_string()),
        status_b: None,
        currency: Some("USD".to_string()),
    }
}

#[tokio::test]
async fn batch_insert_is_atomic_and_reads_in_seq_order() {
    let Some(db) = database().await else {
        return;
    };

    let report = db.create_report(3, 0).await.unwrap();
    db.insert_batch(
        report.report_id,
        &[row(2, "T2", DiscrepancyType::MissingInB)],
    )
    .await
    .unwrap();

    // seq 2 collides; neither row of this batch may land.
    let err = db
        .insert_batch(
            report.report_id,
            &[
                row(0, "T0", DiscrepancyType::MissingInB),
                row(2, "T2", DiscrepancyType::MissingInB),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Database(_)));
    assert_eq!(
        db.count_discrepancies(report.report_id, None).await.unwrap(),
        1
    );

    db.insert_batch(
        report.report_id,
        &[
            row(0, "T0", DiscrepancyType::MissingInB),
            row(1, "T1", DiscrepancyType::StatusMismatch),
        ],
    )
    .await
    .unwrap();

    let rows = db
        .list_discrepancies(report.report_id, None, 0, 10)
        .await
        .unwrap();
    let seqs: Vec<i64> = rows.iter().map(|r| r.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2]);
    assert_eq!(rows[0].amount_a, Some(dec!(12.345)));

    let counts = db.count_by_type(report.report_id).await.unwrap();
    assert_eq!(counts.missing_in_b, 2);
    assert_eq!(counts.status_mismatch, 1);

    let finalized = db
        .finalize_report(report.report_id, 0.5)
        .await
        .unwrap()
        .unwrap();
    assert!(finalized.is_finalized());
    assert!(db
        .finalize_report(report.report_id, 0.5)
        .await
        .unwrap()
        .is_none());

    assert!(db.delete_report(report.report_id).await.unwrap());
    assert_eq!(
        db.count_discrepancies(report.report_id, None).await.unwrap(),
        0
    );
}
