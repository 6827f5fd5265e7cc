//! Configuration loading.
//!
//! Settings come from a TOML file, then a handful of environment variables
//! (the names the deployment platform injects) override the PostgreSQL
//! connection fields.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    /// Embedded database file, used when PostgreSQL is unavailable.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
    /// Preferred client/server backend. Absent means "always embedded".
    #[serde(default)]
    pub postgres: PostgresConfig,
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./data/ledger.sqlite")
}

/// PostgreSQL connection parameters.
///
/// `url` wins over the discrete fields when both are present.
#[derive(Debug, Deserialize, Clone)]
pub struct PostgresConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// A `DB_POSTGRESDB_PORT` value that is not a port number. Reported when
    /// the connection options are built, so it only costs the primary.
    #[serde(skip)]
    pub invalid_port: Option<String>,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            port: None,
            database: None,
            user: None,
            password: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            invalid_port: None,
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl PostgresConfig {
    /// True when there is enough to attempt a connection.
    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.host.is_some()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportingConfig {
    /// How long a report snapshot may be served before recomputing.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Number of latest records shown in the daily summary.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            recent_limit: default_recent_limit(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    30
}
fn default_recent_limit() -> usize {
    3
}

impl Config {
    /// Configuration used when no file exists: embedded database at the
    /// default path, PostgreSQL only if the environment provides it.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                sqlite_path: default_sqlite_path(),
                postgres: PostgresConfig::default(),
            },
            reporting: ReportingConfig::default(),
        }
    }
}

/// Environment variable → field overrides.
///
/// `DATABASE_URL` maps to `db.postgres.url`; the `DB_POSTGRESDB_*` family maps
/// to the discrete fields.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let pg = &mut config.db.postgres;

    if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
        pg.url = Some(url);
    }
    if let Some(host) = lookup("DB_POSTGRESDB_HOST") {
        pg.host = Some(host);
    }
    if let Some(port) = lookup("DB_POSTGRESDB_PORT") {
        match port.parse::<u16>() {
            Ok(port) => pg.port = Some(port),
            Err(_) => pg.invalid_port = Some(port),
        }
    }
    if let Some(database) = lookup("DB_POSTGRESDB_DATABASE") {
        pg.database = Some(database);
    }
    if let Some(user) = lookup("DB_POSTGRESDB_USER") {
        pg.user = Some(user);
    }
    if let Some(password) = lookup("DB_POSTGRESDB_PASSWORD") {
        pg.password = Some(password);
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.db.postgres.connect_timeout_secs == 0 {
        bail!("db.postgres.connect_timeout_secs must be > 0");
    }
    if config.reporting.cache_ttl_secs == 0 {
        bail!("reporting.cache_ttl_secs must be > 0");
    }
    Ok(())
}

/// Parse TOML text without touching the filesystem or environment.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Read the config file at `path` (or fall back to [`Config::minimal`] when it
/// does not exist), then apply environment overrides.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::minimal()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;

    Ok(config)
}
