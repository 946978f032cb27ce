//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;

use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which entity store the service runs against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub log_level: Level,
    pub cors_origin: String,
    pub monitor_interval: Duration,
    pub heartbeat_timeout: Duration,
    pub auth_token_ttl_days: i64,
    pub seed_data: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            store_backend: StoreBackend::Postgres,
            database_url: None,
            log_level: Level::INFO,
            cors_origin: "http://localhost:5173".to_string(),
            monitor_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(30),
            auth_token_ttl_days: 30,
            seed_data: false,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Store Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let store_backend = match std::env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "STORE_BACKEND".to_string(),
                    format!("'{}' is not one of postgres, memory", other),
                ))
            }
        };

        let database_url = std::env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingVar("DATABASE_URL".to_string()));
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());

        // --- Load Background Monitor Settings ---
        let monitor_interval = parse_nonzero_secs("MONITOR_INTERVAL_SECS", 30)?;
        let heartbeat_timeout = parse_nonzero_secs("HEARTBEAT_TIMEOUT_SECS", 30)?;

        let auth_token_ttl_days = parse_var("AUTH_TOKEN_TTL_DAYS", 30)?;
        let seed_data = parse_var("SEED_DATA", false)?;

        Ok(Self {
            bind_address,
            store_backend,
            database_url,
            log_level,
            cors_origin,
            monitor_interval,
            heartbeat_timeout,
            auth_token_ttl_days,
            seed_data,
        })
    }
}

/// Reads and parses an optional variable, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .to_lowercase()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Reads a period in whole seconds that must be greater than zero.
fn parse_nonzero_secs(name: &str, default: u64) -> Result<Duration, ConfigError> {
    match parse_var(name, default)? {
        0 => Err(ConfigError::InvalidValue(
            name.to_string(),
            "must be greater than zero".to_string(),
        )),
        secs => Ok(Duration::from_secs(secs)),
    }
}
