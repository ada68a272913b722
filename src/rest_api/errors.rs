//! # REST API Errors
//!
//! Error types for query translation and request handling.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::executor::ExecError;

use super::identifier::IdentifierKind;

/// Result type for REST operations
pub type RestResult<T> = Result<T, RestError>;

/// REST API errors
#[derive(Debug, Clone, Error)]
pub enum RestError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Malformed clause shape
    #[error("Syntax error in {param}: {reason}")]
    Syntax { param: String, reason: String },

    /// Name fails the lexical identifier rule
    #[error("Invalid {kind} identifier: {name:?}")]
    InvalidIdentifier { kind: IdentifierKind, name: String },

    /// Name is well formed but absent from the catalog
    #[error("Unknown {kind} {name:?} in {scope}")]
    UnknownIdentifier {
        kind: IdentifierKind,
        name: String,
        scope: String,
    },

    /// `$token` outside the operator set
    #[error("Unsupported operator {operator:?} in {param}")]
    UnsupportedOperator { param: String, operator: String },

    /// Value not parseable as the required type
    #[error("Invalid value for {param}: {value:?} is not {expected}")]
    InvalidType {
        param: String,
        value: String,
        expected: &'static str,
    },

    /// Invalid request body
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Request context cancelled or its deadline elapsed
    #[error("Request aborted: context {0}")]
    Cancelled(String),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Statement execution failed in the database
    #[error("Execution error: {0}")]
    Execution(String),

    /// Catalog introspection failed
    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl RestError {
    pub fn syntax(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Syntax {
            param: param.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_identifier(kind: IdentifierKind, name: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            kind,
            name: name.into(),
        }
    }

    pub fn unknown_identifier(
        kind: IdentifierKind,
        name: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self::UnknownIdentifier {
            kind,
            name: name.into(),
            scope: scope.into(),
        }
    }

    /// Deadline elapsed before the request finished
    pub fn deadline_exceeded() -> Self {
        Self::Cancelled("deadline exceeded".to_string())
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            RestError::Syntax { .. } => StatusCode::BAD_REQUEST,
            RestError::InvalidIdentifier { .. } => StatusCode::BAD_REQUEST,
            RestError::UnknownIdentifier { .. } => StatusCode::BAD_REQUEST,
            RestError::UnsupportedOperator { .. } => StatusCode::BAD_REQUEST,
            RestError::InvalidType { .. } => StatusCode::BAD_REQUEST,
            RestError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            // deadline expiry is reported as a client error
            RestError::Cancelled(_) => StatusCode::BAD_REQUEST,

            // 500 Internal Server Error
            RestError::Execution(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RestError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this error was caused by the client's input
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl From<ExecError> for RestError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::Cancelled => RestError::deadline_exceeded(),
            ExecError::Database(msg) => RestError::Execution(msg),
            ExecError::Decode(msg) => RestError::Execution(msg),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<RestError> for ErrorResponse {
    fn from(err: RestError) -> Self {
        Self {
            code: err.status_code().as_u16(),
            error: err.to_string(),
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(self));
        (status, body).into_response()
    }
}
