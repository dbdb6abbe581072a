//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use scorebook_event_store::storage::StorageBackend;
use scorebook_scoring::config::ScoringConfig;

use crate::error::AppError;

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Which storage backend to open.
    pub storage: StorageBackend,
    /// Limits for the scoring services.
    pub scoring: ScoringConfig,
    /// Updates buffered per match before a slow subscriber lags.
    pub broadcast_capacity: usize,
    /// OTLP collector endpoint; span export is off when unset.
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first invalid variable.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable if it is set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first invalid variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let storage = match var("STORAGE_BACKEND").as_deref().map(str::trim) {
            None | Some("memory") => StorageBackend::InMemory,
            Some("postgres") => StorageBackend::Postgres {
                database_url: var("DATABASE_URL").ok_or_else(|| {
                    AppError::Config(
                        "DATABASE_URL must be set when STORAGE_BACKEND is postgres".to_owned(),
                    )
                })?,
                max_connections: parse_or(&var, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            Some(other) => {
                return Err(AppError::Config(format!(
                    "STORAGE_BACKEND must be memory or postgres, got {other}"
                )));
            }
        };

        let store_timeout_ms: u64 = parse_or(&var, "STORE_TIMEOUT_MS", 5000)?;
        let broadcast_capacity: usize = parse_or(&var, "BROADCAST_CAPACITY", 64)?;
        if broadcast_capacity == 0 {
            return Err(AppError::Config(
                "BROADCAST_CAPACITY must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: parse_or(&var, "PORT", 3000)?,
            storage,
            scoring: ScoringConfig {
                store_timeout: Duration::from_millis(store_timeout_ms),
                ..ScoringConfig::default()
            },
            broadcast_capacity,
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    /// The socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn parse_or<T>(var: impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{name} is invalid ({raw}): {e}"))),
    }
}
