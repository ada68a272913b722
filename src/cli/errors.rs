//! CLI-specific error types
//!
//! Every CLI error is fatal: it is printed and the process exits non-zero.

use thiserror::Error;

use crate::http_server::{ConfigError, ServerError};
use crate::rest_api::RestError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Server(#[from] ServerError),

    /// The compiled request was rejected
    #[error("request rejected: {0}")]
    Request(#[from] RestError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid arguments: {0}")]
    Usage(String),
}

impl CliError {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "TABLEREST_CLI_CONFIG_ERROR",
            Self::Server(_) => "TABLEREST_CLI_BOOT_FAILED",
            Self::Request(_) => "TABLEREST_CLI_REQUEST_REJECTED",
            Self::Io(_) | Self::Json(_) => "TABLEREST_CLI_IO_ERROR",
            Self::Usage(_) => "TABLEREST_CLI_USAGE",
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
