//! Configuration management for burnbox.
//!
//! Configuration can be set via environment variables:
//! - `ENCRYPTION_KEY` - Required. 32-byte AES key, hex (64 chars) or base64.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `MIN_TTL_SECONDS` - Optional. Policy floor for secret lifetimes. Defaults to `300`.
//! - `STORE_BACKEND` - Optional. `memory` or `sqlite`. Defaults to `memory`.
//! - `DATA_DIR` - Optional. Directory for SQLite files. Defaults to `./data`.
//! - `SWEEP_INTERVAL_SECONDS` - Optional. Expiry sweeper period. Defaults to `60`.

use std::path::PathBuf;
use thiserror::Error;

use crate::crypto::{self, KEY_LENGTH};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Storage backend selection for the ephemeral store and audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

impl StoreBackend {
    /// Parse from environment variable value.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "sqlite" | "db" => Self::Sqlite,
            _ => Self::Memory,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// AES-256-GCM key for secret payloads
    pub encryption_key: [u8; KEY_LENGTH],

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Policy floor for secret TTLs; requested values below this are raised
    pub min_ttl_seconds: u64,

    /// Backend for the ephemeral store and audit log
    pub store_backend: StoreBackend,

    /// Directory for SQLite files (sqlite backend only)
    pub data_dir: PathBuf,

    /// Period of the background expiry sweeper
    pub sweep_interval_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `ENCRYPTION_KEY` is not set,
    /// or `ConfigError::InvalidValue` if a variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let key_str = std::env::var("ENCRYPTION_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("ENCRYPTION_KEY".to_string()))?;
        let encryption_key = crypto::parse_key(&key_str)
            .map_err(|e| ConfigError::InvalidValue("ENCRYPTION_KEY".to_string(), e.to_string()))?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let min_ttl_seconds = std::env::var("MIN_TTL_SECONDS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("MIN_TTL_SECONDS".to_string(), format!("{}", e))
            })?;

        let store_backend = std::env::var("STORE_BACKEND")
            .map(|s| StoreBackend::from_str(&s))
            .unwrap_or_default();

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let sweep_interval_seconds = std::env::var("SWEEP_INTERVAL_SECONDS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("SWEEP_INTERVAL_SECONDS".to_string(), format!("{}", e))
            })?;

        Ok(Self {
            encryption_key,
            host,
            port,
            min_ttl_seconds,
            store_backend,
            data_dir,
            sweep_interval_seconds,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(encryption_key: [u8; KEY_LENGTH]) -> Self {
        Self {
            encryption_key,
            host: "127.0.0.1".to_string(),
            port: 3000,
            min_ttl_seconds: 300,
            store_backend: StoreBackend::Memory,
            data_dir: PathBuf::from("./data"),
            sweep_interval_seconds: 60,
        }
    }
}
