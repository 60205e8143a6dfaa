//! PostgreSQL store for discrepancy-service.

use crate::models::{
    Discrepancy, DiscrepancyType, NewDiscrepancy, Report, ReportStatus, TypeCounts,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{DiscrepancyStore, StoreError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info, instrument};

const REPORT_COLUMNS: &str = "report_id, created_at, status, system_a_count, system_b_count, processing_time, finalized_at";

const DISCREPANCY_COLUMNS: &str = "discrepancy_id, report_id, seq, transaction_id, discrepancy_type, amount_a, amount_b, status_a, status_b, currency";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "discrepancy-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, StoreError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl DiscrepancyStore for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1").execute(&self.pool).await?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_report(
        &self,
        system_a_count: i64,
        system_b_count: i64,
    ) -> Result<Report, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_report"])
            .start_timer();

        let report = sqlx::query_as::<_, Report>(&format!(
            r#"
            INSERT INTO reconciliation_reports (status, system_a_count, system_b_count, processing_time)
            VALUES ($1, $2, $3, 0)
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(ReportStatus::Created.as_str())
        .bind(system_a_count)
        .bind(system_b_count)
        .fetch_one(&self.pool)
        .await?;

        timer.observe_duration();
        info!(report_id = report.report_id, "Report created");

        Ok(report)
    }

    /// One transaction, one `INSERT ... SELECT FROM UNNEST` statement.
    #[instrument(skip(self, batch), fields(report_id = report_id, rows = batch.len()))]
    async fn insert_batch(
        &self,
        report_id: i64,
        batch: &[NewDiscrepancy],
    ) -> Result<u64, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_batch"])
            .start_timer();

        let mut seqs = Vec::with_capacity(batch.len());
        let mut transaction_ids = Vec::with_capacity(batch.len());
        let mut types = Vec::with_capacity(batch.len());
        let mut amounts_a: Vec<Option<Decimal>> = Vec::with_capacity(batch.len());
        let mut amounts_b: Vec<Option<Decimal>> = Vec::with_capacity(batch.len());
        let mut statuses_a: Vec<Option<String>> = Vec::with_capacity(batch.len());
        let mut statuses_b: Vec<Option<String>> = Vec::with_capacity(batch.len());
        let mut currencies: Vec<Option<String>> = Vec::with_capacity(batch.len());

        for d in batch {
            seqs.push(d.seq);
            transaction_ids.push(d.transaction_id.clone());
            types.push(d.discrepancy_type.as_str().to_string());
            amounts_a.push(d.amount_a);
            amounts_b.push(d.amount_b);
            statuses_a.push(d.status_a.clone());
            statuses_b.push(d.status_b.clone());
            currencies.push(d.currency.clone());
        }

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO discrepancies (report_id, seq, transaction_id, discrepancy_type, amount_a, amount_b, status_a, status_b, currency)
            SELECT $1, u.seq, u.transaction_id, u.discrepancy_type, u.amount_a, u.amount_b, u.status_a, u.status_b, u.currency
            FROM UNNEST($2::BIGINT[], $3::TEXT[], $4::TEXT[], $5::NUMERIC[], $6::NUMERIC[], $7::TEXT[], $8::TEXT[], $9::TEXT[])
                AS u(seq, transaction_id, discrepancy_type, amount_a, amount_b, status_a, status_b, currency)
            "#,
        )
        .bind(report_id)
        .bind(&seqs)
        .bind(&transaction_ids)
        .bind(&types)
        .bind(&amounts_a)
        .bind(&amounts_b)
        .bind(&statuses_a)
        .bind(&statuses_b)
        .bind(&currencies)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        timer.observe_duration();
        debug!(rows = result.rows_affected(), "Batch committed");

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn finalize_report(
        &self,
        report_id: i64,
        processing_time: f64,
    ) -> Result<Option<Report>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["finalize_report"])
            .start_timer();

        let report = sqlx::query_as::<_, Report>(&format!(
            r#"
            UPDATE reconciliation_reports
            SET status = $3, processing_time = $2, finalized_at = NOW()
            WHERE report_id = $1 AND status = $4
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(report_id)
        .bind(processing_time)
        .bind(ReportStatus::Finalized.as_str())
        .bind(ReportStatus::Created.as_str())
        .fetch_optional(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(report)
    }

    #[instrument(skip(self))]
    async fn get_report(&self, report_id: i64) -> Result<Option<Report>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_report"])
            .start_timer();

        let report = sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reconciliation_reports WHERE report_id = $1"
        ))
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(report)
    }

    #[instrument(skip(self))]
    async fn list_reports(&self) -> Result<Vec<Report>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_reports"])
            .start_timer();

        let reports = sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reconciliation_reports ORDER BY created_at DESC, report_id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(reports)
    }

    #[instrument(skip(self))]
    async fn delete_report(&self, report_id: i64) -> Result<bool, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_report"])
            .start_timer();

        let result = sqlx::query("DELETE FROM reconciliation_reports WHERE report_id = $1")
            .bind(report_id)
            .execute(&self.pool)
            .await?;

        timer.observe_duration();
        info!(report_id = report_id, deleted = result.rows_affected(), "Report delete");

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn count_discrepancies(
        &self,
        report_id: i64,
        filter: Option<DiscrepancyType>,
    ) -> Result<i64, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["count_discrepancies"])
            .start_timer();

        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM discrepancies
            WHERE report_id = $1 AND ($2::TEXT IS NULL OR discrepancy_type = $2)
            "#,
        )
        .bind(report_id)
        .bind(filter.map(|t| t.as_str()))
        .fetch_one(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(count)
    }

    #[instrument(skip(self))]
    async fn list_discrepancies(
        &self,
        report_id: i64,
        filter: Option<DiscrepancyType>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Discrepancy>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_discrepancies"])
            .start_timer();

        let rows = sqlx::query_as::<_, Discrepancy>(&format!(
            r#"
            SELECT {DISCREPANCY_COLUMNS}
            FROM discrepancies
            WHERE report_id = $1 AND ($2::TEXT IS NULL OR discrepancy_type = $2)
            ORDER BY seq
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(report_id)
        .bind(filter.map(|t| t.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn count_by_type(&self, report_id: i64) -> Result<TypeCounts, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["count_by_type"])
            .start_timer();

        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT discrepancy_type, COUNT(*)
            FROM discrepancies
            WHERE report_id = $1
            GROUP BY discrepancy_type
            "#,
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();

        let mut counts = TypeCounts::default();
        for (name, n) in rows {
            if let Some(t) = DiscrepancyType::parse(&name) {
                counts.add(t, n);
            }
        }

        Ok(counts)
    }
}
