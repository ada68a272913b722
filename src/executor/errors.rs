//! Executor error types
//!
//! Execution failures are server-side (5xx) except cancellation, which the
//! REST layer reports as a client error.

use thiserror::Error;

/// Result type for executor operations
pub type ExecResult<T> = Result<T, ExecError>;

#[derive(Debug, Clone, Error)]
pub enum ExecError {
    /// The request deadline fired before the statement completed
    #[error("statement cancelled")]
    Cancelled,

    /// The database rejected or failed the statement
    #[error("database error: {0}")]
    Database(String),

    /// The result could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for ExecError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => ExecError::Database("connection pool closed".to_string()),
            sqlx::Error::PoolTimedOut => ExecError::Database("connection pool timed out".to_string()),
            sqlx::Error::ColumnDecode { source, .. } => ExecError::Decode(source.to_string()),
            sqlx::Error::Decode(source) => ExecError::Decode(source.to_string()),
            sqlx::Error::Database(db) => ExecError::Database(db.message().to_string()),
            other => ExecError::Database(other.to_string()),
        }
    }
}
