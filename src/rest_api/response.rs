//! # Response Formatting
//!
//! Response bodies that are not produced by the database itself. Selects
//! return the JSON array built by the executor and inserts the inserted row.

use serde::Serialize;

/// Update and delete response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MutationResponse {
    pub rows_affected: u64,
}

impl MutationResponse {
    pub fn new(rows_affected: u64) -> Self {
        Self { rows_affected }
    }
}

/// Liveness probe response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
