//! Configuration module for discrepancy-service.

use crate::engine::{EngineSettings, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DiscrepancyConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
    pub results: ResultsConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub batch_size: usize,
    pub write_workers: usize,
    /// Upper bound on one reconciliation request.
    pub run_timeout: Duration,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct ResultsConfig {
    pub default_page_size: u32,
}

impl EngineConfig {
    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            batch_size: self.batch_size,
            write_workers: self.write_workers,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let settings = EngineSettings::default();
        Self {
            batch_size: settings.batch_size,
            write_workers: settings.write_workers,
            run_timeout: Duration::from_secs(300),
            max_body_bytes: 256 * 1024 * 1024,
        }
    }
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl DiscrepancyConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let engine_defaults = EngineConfig::default();

        let config = Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "discrepancy-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?,
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
                min_connections: env_or("DATABASE_MIN_CONNECTIONS", 2),
            },
            engine: EngineConfig {
                batch_size: env_or("RECONCILE_BATCH_SIZE", engine_defaults.batch_size),
                write_workers: env_or("RECONCILE_WRITE_WORKERS", engine_defaults.write_workers),
                run_timeout: Duration::from_secs(env_or(
                    "RECONCILE_TIMEOUT_SECS",
                    engine_defaults.run_timeout.as_secs(),
                )),
                max_body_bytes: env_or("RECONCILE_MAX_BODY_BYTES", engine_defaults.max_body_bytes),
            },
            results: ResultsConfig {
                default_page_size: env_or("RESULTS_DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.engine.batch_size == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RECONCILE_BATCH_SIZE must be at least 1"
            )));
        }
        if self.engine.write_workers == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RECONCILE_WRITE_WORKERS must be at least 1"
            )));
        }
        if self.results.default_page_size == 0 || self.results.default_page_size > MAX_PAGE_SIZE {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RESULTS_DEFAULT_PAGE_SIZE must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MIN_CONNECTIONS exceeds DATABASE_MAX_CONNECTIONS"
            )));
        }
        Ok(())
    }
}
