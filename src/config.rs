//! Configuration management for the PDF layout server
//!
//! Only transport and storage settings live here. The resource ceilings in
//! [`crate::limits`] are fixed for the process and not configurable.

use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;

/// Default transport body limit; leaves room above the 50MB upload ceiling
/// so oversized uploads reach the intake guard and get a precise message.
const DEFAULT_BODY_LIMIT_MB: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid SERVER_PORT: {0}")]
    InvalidPort(String),

    #[error("Invalid UPLOAD_BODY_LIMIT_MB: {0}")]
    InvalidBodyLimit(String),

    #[error("UPLOAD_TEMP_DIR is not a directory: {0}")]
    TempDirMissing(PathBuf),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Directory for temporary upload artifacts (OS temp dir when unset)
    pub temp_dir: Option<PathBuf>,
    /// Maximum request body accepted by the HTTP layer
    pub body_limit_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
            },
            upload: UploadConfig {
                temp_dir: None,
                body_limit_bytes: DEFAULT_BODY_LIMIT_MB * 1024 * 1024,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup (environment, map in tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("SERVER_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        let body_limit_mb = match lookup("UPLOAD_BODY_LIMIT_MB") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(mb) if mb >= 1 => mb,
                _ => return Err(ConfigError::InvalidBodyLimit(raw)),
            },
            None => DEFAULT_BODY_LIMIT_MB,
        };

        let temp_dir = lookup("UPLOAD_TEMP_DIR")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        if let Some(dir) = &temp_dir {
            if !dir.is_dir() {
                return Err(ConfigError::TempDirMissing(dir.clone()));
            }
        }

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port,
            },
            upload: UploadConfig {
                temp_dir,
                body_limit_bytes: body_limit_mb * 1024 * 1024,
            },
        })
    }
}
