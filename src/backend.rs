//! Backend selection and the pinned storage service.
//!
//! [`select_backend`] runs once at startup. It tries PostgreSQL first and, on
//! any failure, falls back to the embedded SQLite file. The choice is final
//! for the life of the process: there is no re-probe and no promotion back to
//! PostgreSQL. Restart the process to try again.
//!
//! The resulting [`Storage`] is the only storage handle the rest of the crate
//! sees. It is cheap to clone and read-only after construction.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::Config;
use crate::db;
use crate::models::{NewRecord, Record};
use crate::store::postgres::PgStore;
use crate::store::sqlite::SqliteStore;
use crate::store::{CategoryBreakdown, RecordStore};

/// Which engine the process ended up pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// The preferred client/server engine.
    Primary,
    /// The embedded engine, used because the primary was unavailable.
    Fallback,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Primary => f.write_str("primary"),
            BackendKind::Fallback => f.write_str("fallback"),
        }
    }
}

/// The storage service pinned for this process.
///
/// Wraps a [`RecordStore`] and turns its errors into logged, explicit
/// failure values: `None` for a failed insert, an empty list or zero for a
/// failed read. Use [`Storage::store`] when the underlying error is needed.
#[derive(Clone)]
pub struct Storage {
    kind: BackendKind,
    descriptor: String,
    store: Arc<dyn RecordStore>,
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("kind", &self.kind)
            .field("descriptor", &self.descriptor)
            .field("engine", &self.store.engine())
            .finish()
    }
}

impl Storage {
    pub fn new(kind: BackendKind, descriptor: impl Into<String>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            kind,
            descriptor: descriptor.into(),
            store,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn engine(&self) -> &'static str {
        self.store.engine()
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Insert a record. Returns the new id, or `None` if the engine failed.
    pub async fn insert_record(&self, record: &NewRecord) -> Option<i64> {
        match self.store.insert_record(record).await {
            Ok(id) => {
                tracing::info!(id, engine = self.engine(), price = %record.price, "record stored");
                Some(id)
            }
            Err(e) => {
                tracing::error!(engine = self.engine(), error = %format!("{:#}", e), "insert failed");
                None
            }
        }
    }

    pub async fn query_all(&self) -> Vec<Record> {
        self.store
            .query_all()
            .await
            .unwrap_or_else(|e| self.log_read_failure("query_all", e))
    }

    pub async fn query_by_date(&self, date: NaiveDate) -> Vec<Record> {
        self.store
            .query_by_date(date)
            .await
            .unwrap_or_else(|e| self.log_read_failure("query_by_date", e))
    }

    pub async fn count_by_date(&self, date: NaiveDate) -> u64 {
        self.store
            .count_by_date(date)
            .await
            .unwrap_or_else(|e| self.log_read_failure("count_by_date", e))
    }

    pub async fn aggregate_total_by_date(&self, date: NaiveDate) -> Decimal {
        self.store
            .aggregate_total_by_date(date)
            .await
            .unwrap_or_else(|e| self.log_read_failure("aggregate_total_by_date", e))
    }

    pub async fn aggregate_by_category_for_date(&self, date: NaiveDate) -> CategoryBreakdown {
        self.store
            .aggregate_by_category_for_date(date)
            .await
            .unwrap_or_else(|e| self.log_read_failure("aggregate_by_category_for_date", e))
    }

    fn log_read_failure<T: Default>(&self, operation: &str, error: anyhow::Error) -> T {
        tracing::error!(
            engine = self.engine(),
            operation,
            error = %format!("{:#}", error),
            "read failed, returning empty result"
        );
        T::default()
    }
}

/// Try to pin PostgreSQL: build options, probe, create the pool, init schema.
async fn try_primary(config: &Config) -> Result<Storage> {
    let pg = &config.db.postgres;
    let options = db::postgres_options(pg)?;
    let descriptor = db::describe_postgres(&options);

    db::probe_postgres(&options, Duration::from_secs(pg.connect_timeout_secs))
        .await
        .with_context(|| format!("cannot reach {}", descriptor))?;

    let store = PgStore::new(db::postgres_pool(options));
    store.init_schema().await?;

    Ok(Storage::new(BackendKind::Primary, descriptor, Arc::new(store)))
}

/// Open the embedded engine and init its schema.
pub async fn open_fallback(config: &Config) -> Result<Storage> {
    let path = &config.db.sqlite_path;
    let store = SqliteStore::open(path).await?;
    store
        .init_schema()
        .await
        .with_context(|| format!("initializing SQLite schema at {}", path.display()))?;

    Ok(Storage::new(
        BackendKind::Fallback,
        format!("sqlite:{}", path.display()),
        Arc::new(store),
    ))
}

/// Choose the storage backend for this process.
///
/// Only fails if the embedded engine itself cannot be opened.
pub async fn select_backend(config: &Config) -> Result<Storage> {
    match try_primary(config).await {
        Ok(storage) => {
            tracing::info!(descriptor = storage.descriptor(), "pinned primary backend");
            return Ok(storage);
        }
        Err(e) => {
            tracing::warn!(
                error = %format!("{:#}", e),
                "primary backend unavailable, falling back to embedded engine"
            );
        }
    }

    let storage = open_fallback(config).await?;
    tracing::info!(descriptor = storage.descriptor(), "pinned fallback backend");
    Ok(storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(tmp: &TempDir) -> Config {
        let mut config = Config::minimal();
        config.db.sqlite_path = tmp.path().join("data").join("ledger.sqlite");
        config
    }

    #[tokio::test]
    async fn test_unconfigured_primary_falls_back() {
        let tmp = TempDir::new().unwrap();
        let storage = select_backend(&config_in(&tmp)).await.unwrap();
        assert_eq!(storage.kind(), BackendKind::Fallback);
        assert_eq!(storage.engine(), "sqlite");
        assert!(storage.descriptor().starts_with("sqlite:"));
    }

    #[tokio::test]
    async fn test_read_failures_become_empty_results() {
        let tmp = TempDir::new().unwrap();
        let storage = select_backend(&config_in(&tmp)).await.unwrap();
        if let Some(pool) = storage_pool(&storage) {
            sqlx::query("DROP TABLE productos").execute(&pool).await.unwrap();
        }
        let today = chrono::Utc::now().date_naive();
        assert!(storage.query_all().await.is_empty());
        assert_eq!(storage.aggregate_total_by_date(today).await, Decimal::ZERO);
        assert!(storage.aggregate_by_category_for_date(today).await.is_empty());
    }

    fn storage_pool(storage: &Storage) -> Option<sqlx::SqlitePool> {
        let path = storage.descriptor().strip_prefix("sqlite:")?;
        let options = sqlx::sqlite::SqliteConnectOptions::new().filename(path);
        Some(sqlx::SqlitePool::connect_lazy_with(options))
    }
}
