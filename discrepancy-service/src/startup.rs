//! Application startup and lifecycle management.

use crate::config::DiscrepancyConfig;
use crate::engine::{Reconciler, ResultReader};
use crate::handlers::{self, reconcile, results};
use crate::services::{init_metrics, Database, DiscrepancyStore};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: DiscrepancyConfig,
    pub store: Arc<dyn DiscrepancyStore>,
    pub reconciler: Reconciler,
    pub reader: ResultReader,
}

impl AppState {
    pub fn new(config: DiscrepancyConfig, store: Arc<dyn DiscrepancyStore>) -> Self {
        Self {
            reconciler: Reconciler::new(store.clone(), config.engine.settings()),
            reader: ResultReader::new(store.clone()),
            config,
            store,
        }
    }
}

/// Build the HTTP router over the given state.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.engine.max_body_bytes;

    Router::new()
        .route(
            "/reconcile",
            get(reconcile::list_reports).post(reconcile::reconcile),
        )
        .route("/results/:report_id", get(results::get_results))
        .route(
            "/reports/:report_id",
            get(results::get_report).delete(results::delete_report),
        )
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route_layer(middleware::from_fn(metrics_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Connect to PostgreSQL, apply migrations and bind the listener.
    pub async fn build(config: DiscrepancyConfig) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            AppError::DatabaseError(e.into())
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            AppError::DatabaseError(e.into())
        })?;

        Self::build_with_store(config, Arc::new(db)).await
    }

    /// Build the application over an already constructed store.
    pub async fn build_with_store(
        config: DiscrepancyConfig,
        store: Arc<dyn DiscrepancyStore>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let address = config.common.bind_address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!(error = %e, addr = %address, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, "Discrepancy service listener bound");

        Ok(Self {
            port,
            listener,
            state: AppState::new(config, store),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(
            service = %self.state.config.service_name,
            version = %self.state.config.service_version,
            port = self.port,
            batch_size = self.state.config.engine.batch_size,
            write_workers = self.state.config.engine.write_workers,
            "Service ready to accept connections"
        );

        let app = router(self.state);
        axum::serve(self.listener, app).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
