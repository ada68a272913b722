//! PostgreSQL executor
//!
//! Selects come back as one `json_agg` value, inserts as the `row_to_json`
//! of the inserted row. Writes run inside a transaction. Only `BEGIN` and the
//! statement are bounded by the request deadline; once the statement has
//! completed the commit always runs to the end, so a cancelled request never
//! leaves a committed write behind.

use std::future::Future;

use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPool, Postgres};
use sqlx::query::{Query, QueryScalar};
use tracing::debug;

use crate::rest_api::deadline::RequestDeadline;
use crate::rest_api::statement::{CompiledStatement, SqlValue, StatementKind};

use super::errors::{ExecError, ExecResult};
use super::StatementExecutor;

/// Executor backed by a sqlx connection pool
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Run one database call under the request deadline
async fn bounded<T, F>(deadline: &RequestDeadline, fut: F) -> ExecResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match deadline.within(fut).await {
        Some(result) => Ok(result?),
        None => Err(ExecError::Cancelled),
    }
}

/// Wrap a statement so the database returns a single JSON value
fn json_wrapped(statement: &CompiledStatement) -> ExecResult<String> {
    match statement.kind {
        StatementKind::Select => Ok(format!(
            "SELECT coalesce(json_agg(s), '[]'::json) FROM ({}) s",
            statement.sql
        )),
        StatementKind::Insert => Ok(format!(
            "WITH inserted AS ({}) SELECT row_to_json(inserted) FROM inserted",
            statement.sql
        )),
        StatementKind::Mutation => Err(ExecError::Database(
            "mutation statements do not return rows".to_string(),
        )),
    }
}

fn bind_scalar<'q>(
    mut query: QueryScalar<'q, Postgres, Value, PgArguments>,
    args: &[SqlValue],
) -> QueryScalar<'q, Postgres, Value, PgArguments> {
    for arg in args {
        query = match arg {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Int(n) => query.bind(*n),
        };
    }
    query
}

fn bind_query<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    args: &[SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for arg in args {
        query = match arg {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Int(n) => query.bind(*n),
        };
    }
    query
}

impl StatementExecutor for PgExecutor {
    async fn fetch_json(
        &self,
        statement: &CompiledStatement,
        deadline: &RequestDeadline,
    ) -> ExecResult<Value> {
        let sql = json_wrapped(statement)?;
        debug!(kind = ?statement.kind, args = statement.args.len(), "executing statement");

        let query = bind_scalar(sqlx::query_scalar::<_, Value>(&sql), &statement.args);
        if statement.kind == StatementKind::Select {
            return bounded(deadline, query.fetch_one(&self.pool)).await;
        }

        let mut tx = bounded(deadline, self.pool.begin()).await?;
        let row = bounded(deadline, query.fetch_one(&mut *tx)).await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn execute(
        &self,
        statement: &CompiledStatement,
        deadline: &RequestDeadline,
    ) -> ExecResult<u64> {
        debug!(kind = ?statement.kind, args = statement.args.len(), "executing statement");

        let mut tx = bounded(deadline, self.pool.begin()).await?;
        let query = bind_query(sqlx::query(&statement.sql), &statement.args);
        let result = bounded(deadline, query.execute(&mut *tx)).await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
