//! HTTP Server Configuration
//!
//! Bind address, database connection, request deadline, pagination policy,
//! CORS and the offline catalog. Loaded from an optional JSON file; every
//! field has a default.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rest_api::handler::HandlerConfig;
use crate::rest_api::parser::{PaginationPolicy, DEFAULT_PAGE_SIZE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 3000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// PostgreSQL connection string
    #[serde(default)]
    pub database_url: Option<String>,

    /// Connection pool size (default: 10)
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Per-request deadline in milliseconds (default: 30000)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Page size used when only `_page` is given (default: 10)
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    /// Largest accepted `_page_size`; unlimited when absent
    #[serde(default)]
    pub max_page_size: Option<u64>,

    /// CORS allowed origins; any origin when empty
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// JSON catalog used instead of querying the database
    #[serde(default)]
    pub catalog_file: Option<PathBuf>,

    /// Return compiled statements instead of executing them
    #[serde(default)]
    pub dry_run: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    10
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_url: None,
            max_connections: default_max_connections(),
            request_timeout_ms: default_request_timeout_ms(),
            default_page_size: default_page_size(),
            max_page_size: None,
            cors_origins: Vec::new(),
            catalog_file: None,
            dry_run: false,
        }
    }
}

impl ServerConfig {
    /// Load a config file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_size == 0 {
            return Err(ConfigError::Invalid(
                "default_page_size must be positive".to_string(),
            ));
        }
        if let Some(max) = self.max_page_size {
            if max < self.default_page_size {
                return Err(ConfigError::Invalid(format!(
                    "max_page_size {} is below default_page_size {}",
                    max, self.default_page_size
                )));
            }
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        if !self.dry_run && self.database_url.is_none() {
            return Err(ConfigError::Invalid(
                "database_url is required unless dry_run is set".to_string(),
            ));
        }
        if self.dry_run && self.catalog_file.is_none() && self.database_url.is_none() {
            return Err(ConfigError::Invalid(
                "dry_run needs a catalog_file or a database_url".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Settings handed to the request handler
    pub fn handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            request_timeout: self.request_timeout(),
            pagination: PaginationPolicy {
                default_page_size: self.default_page_size,
                max_page_size: self.max_page_size,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.handler_config().pagination.default_page_size, 10);
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            port: 8080,
            ..Default::default()
        };
        assert_eq!(config.socket_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"port": 8000, "database_url": "postgres://localhost/prest", "max_page_size": 100}}"#
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.max_page_size, Some(100));
        assert_eq!(config.request_timeout_ms, 30_000);
    }

    #[test]
    fn test_from_file_rejects_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"prot": 8000}}"#).unwrap();
        assert!(matches!(
            ServerConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ServerConfig::from_file(Path::new("/nonexistent/tablerest.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_validate() {
        let config = ServerConfig {
            database_url: Some("postgres://localhost/prest".to_string()),
            max_page_size: Some(5),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            dry_run: true,
            catalog_file: Some(PathBuf::from("catalog.json")),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        assert!(ServerConfig::default().validate().is_err());
    }
}
