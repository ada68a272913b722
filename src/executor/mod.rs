//! Statement executor subsystem
//!
//! The executor is the only component that talks to the database with a
//! compiled statement. It receives statements that have already been
//! validated and never builds SQL from user input itself.
//!
//! Each call carries the request deadline. An executor bounds the statement
//! by it and reports `ExecError::Cancelled` only when nothing was committed;
//! a write whose commit completed is reported as applied.
//!
//! # Implementations
//!
//! - `PgExecutor` - runs statements on a sqlx `PgPool`
//! - `DryRunExecutor` - echoes the compiled statement as JSON

mod dry_run;
mod errors;
mod postgres;

use std::future::Future;

use serde_json::Value;

use crate::rest_api::deadline::RequestDeadline;
use crate::rest_api::statement::CompiledStatement;

pub use dry_run::DryRunExecutor;
pub use errors::{ExecError, ExecResult};
pub use postgres::PgExecutor;

/// Runs compiled statements
pub trait StatementExecutor: Send + Sync + 'static {
    /// Run a `Select` or `Insert` statement and return its JSON result
    fn fetch_json(
        &self,
        statement: &CompiledStatement,
        deadline: &RequestDeadline,
    ) -> impl Future<Output = ExecResult<Value>> + Send;

    /// Run a `Mutation` statement and return the affected row count
    fn execute(
        &self,
        statement: &CompiledStatement,
        deadline: &RequestDeadline,
    ) -> impl Future<Output = ExecResult<u64>> + Send;
}
