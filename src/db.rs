//! Database connection management for both engines.
//!
//! # SQLite
//!
//! The embedded database file and its parent directories are created
//! automatically. WAL mode is enabled so report queries do not block on an
//! in-flight insert; a second concurrent writer waits on SQLite's file lock.
//!
//! # PostgreSQL
//!
//! Connection options come from either a single URL or discrete parameters,
//! the URL taking precedence. [`probe_postgres`] opens and immediately closes
//! one connection to prove the server is reachable and the credentials work.
//!
//! Both engines hand out pooled connections of up to 5; every storage
//! operation checks one out and returns it when it finishes.

use anyhow::{bail, Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{ConnectOptions, Connection};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::config::PostgresConfig;

/// Create a connection pool to the SQLite database at `db_path`.
///
/// - Creates the database file and parent directories if they don't exist.
/// - Enables WAL journal mode for concurrent read/write.
/// - Returns a pool with up to 5 connections.
pub async fn connect_sqlite(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("opening SQLite database {}", db_path.display()))?;

    Ok(pool)
}

/// Build PostgreSQL connect options from configuration.
///
/// Fails when neither a URL nor a host is configured, or when the discrete
/// parameters carry a port that is not a number.
pub fn postgres_options(config: &PostgresConfig) -> Result<PgConnectOptions> {
    if !config.is_configured() {
        bail!("PostgreSQL is not configured (no url and no host)");
    }

    if let Some(url) = &config.url {
        return PgConnectOptions::from_str(url).context("invalid PostgreSQL connection URL");
    }

    if let Some(raw) = &config.invalid_port {
        bail!("DB_POSTGRESDB_PORT is not a port number: '{}'", raw);
    }

    let mut options = PgConnectOptions::new();
    if let Some(host) = &config.host {
        options = options.host(host);
    }
    if let Some(port) = config.port {
        options = options.port(port);
    }
    if let Some(database) = &config.database {
        options = options.database(database);
    }
    if let Some(user) = &config.user {
        options = options.username(user);
    }
    if let Some(password) = &config.password {
        options = options.password(password);
    }

    Ok(options)
}

/// Printable descriptor for logs and status output. Never includes the
/// password.
pub fn describe_postgres(options: &PgConnectOptions) -> String {
    format!(
        "postgres://{}@{}:{}/{}",
        options.get_username(),
        options.get_host(),
        options.get_port(),
        options.get_database().unwrap_or_default()
    )
}

/// Open one connection and close it again, bounded by `timeout`.
pub async fn probe_postgres(options: &PgConnectOptions, timeout: Duration) -> Result<()> {
    let conn = tokio::time::timeout(timeout, options.connect())
        .await
        .with_context(|| format!("no answer within {}s", timeout.as_secs()))??;
    conn.close().await?;
    Ok(())
}

/// Pool that connects on first use.
pub fn postgres_pool(options: PgConnectOptions) -> PgPool {
    PgPoolOptions::new()
        .max_connections(5)
        .connect_lazy_with(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_takes_precedence() {
        let config = PostgresConfig {
            url: Some("postgres://bot:pw@urlhost:6000/fromurl".to_string()),
            host: Some("discrete".to_string()),
            port: Some(5432),
            database: Some("fromfields".to_string()),
            ..PostgresConfig::default()
        };
        let options = postgres_options(&config).unwrap();
        assert_eq!(options.get_host(), "urlhost");
        assert_eq!(options.get_port(), 6000);
        assert_eq!(options.get_database(), Some("fromurl"));
    }

    #[test]
    fn test_discrete_parameters() {
        let config = PostgresConfig {
            host: Some("db.local".to_string()),
            port: Some(6543),
            database: Some("ferreteria".to_string()),
            user: Some("bot".to_string()),
            password: Some("hunter2".to_string()),
            ..PostgresConfig::default()
        };
        let options = postgres_options(&config).unwrap();
        let descriptor = describe_postgres(&options);
        assert_eq!(descriptor, "postgres://bot@db.local:6543/ferreteria");
        assert!(!descriptor.contains("hunter2"));
    }

    #[test]
    fn test_invalid_port_is_an_error_for_discrete_parameters() {
        let config = PostgresConfig {
            host: Some("db.local".to_string()),
            invalid_port: Some("fivefour".to_string()),
            ..PostgresConfig::default()
        };
        let err = postgres_options(&config).unwrap_err();
        assert!(err.to_string().contains("fivefour"));

        // A URL does not use the discrete port.
        let config = PostgresConfig {
            url: Some("postgres://bot@urlhost:6000/d".to_string()),
            ..config
        };
        assert_eq!(postgres_options(&config).unwrap().get_port(), 6000);
    }

    #[test]
    fn test_unconfigured_is_an_error() {
        assert!(postgres_options(&PostgresConfig::default()).is_err());
    }
}
