//! Dry-run executor
//!
//! Returns the compiled statement instead of running it. Used when the
//! server is started without a database and by the `compile` command.

use serde_json::Value;
use tracing::info;

use crate::rest_api::deadline::RequestDeadline;
use crate::rest_api::statement::CompiledStatement;

use super::errors::{ExecError, ExecResult};
use super::StatementExecutor;

#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

impl DryRunExecutor {
    pub fn new() -> Self {
        Self
    }

    /// JSON rendering of a statement: `{"sql", "args", "kind"}`
    pub fn describe(statement: &CompiledStatement) -> ExecResult<Value> {
        serde_json::to_value(statement).map_err(|e| ExecError::Decode(e.to_string()))
    }
}

impl StatementExecutor for DryRunExecutor {
    async fn fetch_json(
        &self,
        statement: &CompiledStatement,
        _deadline: &RequestDeadline,
    ) -> ExecResult<Value> {
        info!(sql = %statement.sql, "dry run");
        Self::describe(statement)
    }

    async fn execute(
        &self,
        statement: &CompiledStatement,
        _deadline: &RequestDeadline,
    ) -> ExecResult<u64> {
        info!(sql = %statement.sql, "dry run");
        Ok(0)
    }
}
