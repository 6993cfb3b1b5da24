//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use till_db::DbConfig;
use tracing::warn;

const DEV_JWT_SECRET: &str = "till-dev-secret-change-in-production";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// HS256 secret shared with whoever issues tokens
    pub jwt_secret: String,

    /// Pool size
    pub db_max_connections: u32,

    /// Writer-lock wait in milliseconds
    pub db_busy_timeout_ms: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("TILL_JWT_SECRET").unwrap_or_else(|| {
            // In production, this MUST be set via environment variable
            warn!("TILL_JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let config = ServerConfig {
            http_port: parse(&lookup, "TILL_HTTP_PORT", 4000)?,

            database_path: lookup("TILL_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./till.db")),

            jwt_secret,

            db_max_connections: parse(&lookup, "TILL_DB_MAX_CONNECTIONS", 5)?,

            db_busy_timeout_ms: parse(&lookup, "TILL_DB_BUSY_TIMEOUT_MS", 5000)?,
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("TILL_DB_MAX_CONNECTIONS".to_string()));
        }
        if config.jwt_secret.is_empty() {
            return Err(ConfigError::InvalidValue("TILL_JWT_SECRET".to_string()));
        }

        Ok(config)
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.db_max_connections)
            .busy_timeout(Duration::from_millis(self.db_busy_timeout_ms))
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
