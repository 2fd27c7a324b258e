pub mod config;
pub mod migrate;
pub mod operations;

use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::config::DbConfig;
use crate::db::migrate::MigrationError;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and brings the schema up to date.
    pub async fn connect(config: DbConfig) -> Result<Self, DbInitError> {
        let mut options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(config.foreign_keys)
            .busy_timeout(config.busy_timeout);
        if !config.is_in_memory() {
            options = options.journal_mode(SqliteJournalMode::Wal);
            ensure_parent_dir(&config.url);
        }

        let pool = pool_options(&config).connect_with(options).await?;

        migrate::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn check_health(&self, timeout: Duration) -> HealthCheckResult {
        let started = Instant::now();
        let ping = sqlx::query("SELECT 1").execute(&self.pool);
        let result = tokio::time::timeout(timeout, ping).await;

        match result {
            Ok(Ok(_)) => HealthCheckResult::healthy(started.elapsed()),
            Ok(Err(err)) => HealthCheckResult::unhealthy(err.to_string()),
            Err(_) => HealthCheckResult::unhealthy("timeout".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthCheckResult {
    pub fn healthy(latency: Duration) -> Self {
        Self {
            healthy: true,
            latency_ms: Some(latency.as_millis() as u64),
            error: None,
        }
    }

    pub fn unhealthy(error: String) -> Self {
        Self {
            healthy: false,
            latency_ms: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// An in-memory database lives only as long as its connection, so that
/// connection is never reaped.
fn pool_options(config: &DbConfig) -> SqlitePoolOptions {
    let options = SqlitePoolOptions::new()
        .max_connections(config.effective_max_connections())
        .acquire_timeout(config.acquire_timeout);
    if config.is_in_memory() {
        options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        options
    }
}

fn ensure_parent_dir(url: &str) {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();
    if path.is_empty() {
        return;
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        if parent.as_os_str().is_empty() {
            return;
        }
        if let Err(err) = std::fs::create_dir_all(parent) {
            tracing::warn!(
                error = %err,
                dir = %parent.display(),
                "failed to create database directory"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_pool_connection_is_never_reaped() {
        let options = pool_options(&DbConfig::for_url("sqlite::memory:"));
        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_min_connections(), 1);
        assert!(options.get_idle_timeout().is_none());
        assert!(options.get_max_lifetime().is_none());
    }

    #[test]
    fn file_pool_keeps_default_reaping() {
        let options = pool_options(&DbConfig::for_url("sqlite:data/drill.db"));
        assert_eq!(options.get_min_connections(), 0);
        assert!(options.get_idle_timeout().is_some());
        assert!(options.get_max_lifetime().is_some());
    }
}
