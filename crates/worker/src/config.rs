//! Worker configuration loaded from environment variables.

use std::time::Duration;

use coop_events::relay::{DEFAULT_BATCH_SIZE, DEFAULT_INTERVAL};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub poll_interval: Duration,
    pub batch_size: i64,
    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,
}

impl WorkerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                   | Default |
    /// |---------------------------|---------|
    /// | `DATABASE_URL`            | required |
    /// | `DB_MAX_CONNECTIONS`      | `5`     |
    /// | `OUTBOX_POLL_INTERVAL_MS` | `500`   |
    /// | `OUTBOX_BATCH_SIZE`       | `100`   |
    /// | `LOG_FORMAT`              | `text` (`json` to switch) |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", "a positive integer", 5u32)?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                name: "DB_MAX_CONNECTIONS",
                expected: "a positive integer",
                value: "0".into(),
            });
        }

        let interval_ms = parse_or(
            &lookup,
            "OUTBOX_POLL_INTERVAL_MS",
            "a number of milliseconds",
            DEFAULT_INTERVAL.as_millis() as u64,
        )?;
        let batch_size = parse_or(&lookup, "OUTBOX_BATCH_SIZE", "a positive integer", DEFAULT_BATCH_SIZE)?;
        if batch_size < 1 {
            return Err(ConfigError::Invalid {
                name: "OUTBOX_BATCH_SIZE",
                expected: "a positive integer",
                value: batch_size.to_string(),
            });
        }

        let json_logs = lookup("LOG_FORMAT").is_some_and(|format| format.eq_ignore_ascii_case("json"));

        Ok(Self {
            database_url,
            max_connections,
            poll_interval: Duration::from_millis(interval_ms),
            batch_size,
            json_logs,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
    }
}
