use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Ingestion
    /// Chat id of the one channel whose posts are archived. Messages from
    /// any other chat are dropped.
    pub channel_id: i64,
    pub upsert_timeout: Duration,
    pub ingest_queue_size: usize,

    // Storage
    pub storage_backend: StorageBackend,
    pub database_path: PathBuf,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
}

/// Which `Storage` implementation to compose at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Persistent SQLite archive.
    Sqlite,
    /// In-memory archive, lost on restart. For tests and dry runs.
    Memory,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Ingestion
            channel_id: parse_required_i64("CHANNEL_ID")?,
            upsert_timeout: Duration::from_secs(parse_env_u64("UPSERT_TIMEOUT_SECS", 10)?),
            ingest_queue_size: parse_env_usize("INGEST_QUEUE_SIZE", 256)?,

            // Storage
            storage_backend: parse_storage_backend(&env_or_default("STORAGE_BACKEND", "sqlite"))?,
            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/archive.sqlite")),

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upsert_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "UPSERT_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.ingest_queue_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "INGEST_QUEUE_SIZE".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_required_i64(name: &str) -> Result<i64, ConfigError> {
    required_env(name)?
        .parse()
        .map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        })
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_storage_backend(value: &str) -> Result<StorageBackend, ConfigError> {
    match value.to_lowercase().as_str() {
        "sqlite" => Ok(StorageBackend::Sqlite),
        "memory" => Ok(StorageBackend::Memory),
        _ => Err(ConfigError::InvalidValue {
            name: "STORAGE_BACKEND".to_string(),
            message: format!("must be 'sqlite' or 'memory', got '{value}'"),
        }),
    }
}
