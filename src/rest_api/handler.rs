//! # REST API Handler
//!
//! Runs one request end to end: path and query parsing, catalog snapshot,
//! identifier resolution, statement assembly and execution. The request
//! deadline bounds everything up to the end of the statement. Nothing
//! reaches the executor until every step before it has succeeded.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::executor::StatementExecutor;
use crate::schema::system::{self, SystemRelation};
use crate::schema::{CatalogProvider, SchemaContext};

use super::deadline::RequestDeadline;
use super::errors::{RestError, RestResult};
use super::filter::FilterPredicate;
use super::identifier::{ColumnRef, Identifier, IdentifierKind};
use super::parser::{PaginationPolicy, QueryParams, ResolvedPredicate, ResolvedQuery};
use super::response::MutationResponse;
use super::statement::{CompiledStatement, RowBody, SelectSource, StatementAssembler};

/// Default request deadline
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Handler settings
#[derive(Debug, Clone, Copy)]
pub struct HandlerConfig {
    pub request_timeout: Duration,
    pub pagination: PaginationPolicy,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            pagination: PaginationPolicy::default(),
        }
    }
}

/// Operation on a single relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

/// `{database}/{schema}/{table}` path segments, validated lexically
#[derive(Debug, Clone)]
pub struct RelationPath {
    pub database: Identifier,
    pub schema: Identifier,
    pub table: Identifier,
}

impl RelationPath {
    pub fn parse(database: &str, schema: &str, table: &str) -> RestResult<Self> {
        Ok(Self {
            database: Identifier::parse(database, IdentifierKind::Database)?,
            schema: Identifier::parse(schema, IdentifierKind::Schema)?,
            table: Identifier::parse(table, IdentifierKind::Table)?,
        })
    }
}

/// Request handler over a catalog provider and a statement executor
pub struct TableHandler<C: CatalogProvider, E: StatementExecutor> {
    catalog: Arc<C>,
    executor: Arc<E>,
    config: HandlerConfig,
}

impl<C: CatalogProvider, E: StatementExecutor> TableHandler<C, E> {
    pub fn new(catalog: C, executor: E, config: HandlerConfig) -> Self {
        Self {
            catalog: Arc::new(catalog),
            executor: Arc::new(executor),
            config,
        }
    }

    /// GET /tables
    pub async fn list_tables(&self, params: &[(String, String)]) -> RestResult<Value> {
        let deadline = self.deadline();
        let query = QueryParams::parse(params, &self.config.pagination)?;
        let ctx = SchemaContext::listing(system::TABLES.relation_info(), None)?;
        let resolved = query.resolve(&ctx)?;
        self.run_listing(&deadline, &ctx, &system::TABLES, resolved).await
    }

    /// GET /{database}/{schema}
    pub async fn list_tables_by_schema(
        &self,
        database: &str,
        schema: &str,
        params: &[(String, String)],
    ) -> RestResult<Value> {
        let deadline = self.deadline();
        let database = Identifier::parse(database, IdentifierKind::Database)?;
        let schema = Identifier::parse(schema, IdentifierKind::Schema)?;
        let query = QueryParams::parse(params, &self.config.pagination)?;

        let snapshot = deadline.run(self.catalog.snapshot(&database, &schema)).await?;
        let ctx = SchemaContext::listing(system::SCHEMA_TABLES.relation_info(), Some(snapshot))?;

        let mut resolved = query.resolve(&ctx)?;
        let mut scoped = vec![
            bind_eq(&ctx, "sc.catalog_name", database.as_str())?,
            bind_eq(&ctx, "t.schemaname", schema.as_str())?,
        ];
        scoped.append(&mut resolved.filters);
        resolved.filters = scoped;

        self.run_listing(&deadline, &ctx, &system::SCHEMA_TABLES, resolved)
            .await
    }

    /// GET /{database}/{schema}/{table}
    pub async fn select(&self, path: &RelationPath, params: &[(String, String)]) -> RestResult<Value> {
        let deadline = self.deadline();
        let statement = self
            .prepare(&deadline, Operation::Select, path, params, &[])
            .await?;
        self.fetch(&deadline, &statement).await
    }

    /// POST /{database}/{schema}/{table}
    pub async fn insert(
        &self,
        path: &RelationPath,
        params: &[(String, String)],
        body: &[u8],
    ) -> RestResult<Value> {
        let deadline = self.deadline();
        let statement = self
            .prepare(&deadline, Operation::Insert, path, params, body)
            .await?;
        self.fetch(&deadline, &statement).await
    }

    /// PUT or PATCH /{database}/{schema}/{table}
    pub async fn update(
        &self,
        path: &RelationPath,
        params: &[(String, String)],
        body: &[u8],
    ) -> RestResult<MutationResponse> {
        let deadline = self.deadline();
        let statement = self
            .prepare(&deadline, Operation::Update, path, params, body)
            .await?;
        self.execute(&deadline, &statement).await
    }

    /// DELETE /{database}/{schema}/{table}
    pub async fn delete(
        &self,
        path: &RelationPath,
        params: &[(String, String)],
    ) -> RestResult<MutationResponse> {
        let deadline = self.deadline();
        let statement = self
            .prepare(&deadline, Operation::Delete, path, params, &[])
            .await?;
        self.execute(&deadline, &statement).await
    }

    /// Compile a table request without executing it
    pub async fn compile(
        &self,
        operation: Operation,
        path: &RelationPath,
        params: &[(String, String)],
        body: &[u8],
    ) -> RestResult<CompiledStatement> {
        let deadline = self.deadline();
        self.prepare(&deadline, operation, path, params, body).await
    }

    /// Parse, resolve and assemble one table request.
    ///
    /// Request syntax (query and body) is checked before the catalog is
    /// fetched.
    async fn prepare(
        &self,
        deadline: &RequestDeadline,
        operation: Operation,
        path: &RelationPath,
        params: &[(String, String)],
        body: &[u8],
    ) -> RestResult<CompiledStatement> {
        match operation {
            Operation::Select => {
                let query = QueryParams::parse(params, &self.config.pagination)?;
                let ctx = self.context(deadline, path).await?;
                let resolved = query.resolve(&ctx)?;
                StatementAssembler::new(&ctx).select(SelectSource::Relation, &resolved)
            }
            Operation::Insert => {
                if let Some((key, _)) = params.first() {
                    return Err(RestError::syntax(
                        key.as_str(),
                        "insert does not take query parameters",
                    ));
                }
                let body = RowBody::from_bytes(body)?;
                let ctx = self.context(deadline, path).await?;
                StatementAssembler::new(&ctx).insert(&body)
            }
            Operation::Update => {
                let query = self.mutation_filters(params)?;
                let body = RowBody::from_bytes(body)?;
                let ctx = self.context(deadline, path).await?;
                let filters = query.resolve(&ctx)?.filters;
                StatementAssembler::new(&ctx).update(&body, &filters)
            }
            Operation::Delete => {
                let query = self.mutation_filters(params)?;
                let ctx = self.context(deadline, path).await?;
                let filters = query.resolve(&ctx)?.filters;
                StatementAssembler::new(&ctx).delete(&filters)
            }
        }
    }

    fn deadline(&self) -> RequestDeadline {
        RequestDeadline::after(self.config.request_timeout)
    }

    /// Mutations accept filters only
    fn mutation_filters(&self, params: &[(String, String)]) -> RestResult<QueryParams> {
        let query = QueryParams::parse(params, &self.config.pagination)?;
        if query.has_read_clauses() {
            return Err(RestError::syntax(
                "query",
                "only filters are allowed on update and delete",
            ));
        }
        Ok(query)
    }

    /// Fetch the catalog snapshot and resolve the target relation
    async fn context(&self, deadline: &RequestDeadline, path: &RelationPath) -> RestResult<SchemaContext> {
        let snapshot = deadline
            .run(self.catalog.snapshot(&path.database, &path.schema))
            .await?;
        SchemaContext::for_relation(snapshot, &path.table)
    }

    async fn run_listing(
        &self,
        deadline: &RequestDeadline,
        ctx: &SchemaContext,
        system: &SystemRelation,
        resolved: ResolvedQuery,
    ) -> RestResult<Value> {
        let statement = StatementAssembler::new(ctx).select(SelectSource::System(system), &resolved)?;
        self.fetch(deadline, &statement).await
    }

    async fn fetch(&self, deadline: &RequestDeadline, statement: &CompiledStatement) -> RestResult<Value> {
        deadline.check()?;
        self.executor
            .fetch_json(statement, deadline)
            .await
            .map_err(RestError::from)
            .inspect_err(|e| log_failure(e, statement))
    }

    async fn execute(
        &self,
        deadline: &RequestDeadline,
        statement: &CompiledStatement,
    ) -> RestResult<MutationResponse> {
        deadline.check()?;
        let rows = self
            .executor
            .execute(statement, deadline)
            .await
            .map_err(RestError::from)
            .inspect_err(|e| log_failure(e, statement))?;
        Ok(MutationResponse::new(rows))
    }
}

/// Equality predicate on a listing column, resolved in `ctx`
fn bind_eq(ctx: &SchemaContext, column: &str, value: &str) -> RestResult<ResolvedPredicate> {
    let predicate = FilterPredicate::eq(ColumnRef::parse(column)?, value);
    Ok(ResolvedPredicate {
        column: ctx.resolve_column(&predicate.column, None)?,
        operator: predicate.operator,
        values: predicate.values,
    })
}

fn log_failure(err: &RestError, statement: &CompiledStatement) {
    if err.is_client_error() {
        debug!(error = %err, kind = ?statement.kind, "statement abandoned");
    } else {
        warn!(error = %err, kind = ?statement.kind, "statement failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::DryRunExecutor;
    use crate::schema::{CatalogSnapshot, ColumnInfo, RelationInfo, StaticCatalog};

    fn handler() -> TableHandler<StaticCatalog, DryRunExecutor> {
        let catalog = StaticCatalog::new(vec![CatalogSnapshot::new("prest", "public")
            .with_relation(RelationInfo::table(
                "test",
                vec![ColumnInfo::new("id"), ColumnInfo::new("name")],
            ))]);
        TableHandler::new(catalog, DryRunExecutor::new(), HandlerConfig::default())
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn path(table: &str) -> RelationPath {
        RelationPath::parse("prest", "public", table).unwrap()
    }

    #[tokio::test]
    async fn test_select_compiles() {
        let out = handler()
            .select(&path("test"), &params(&[("name", "$eq.nuveo")]))
            .await
            .unwrap();
        assert_eq!(out["sql"], "SELECT * FROM \"public\".\"test\" WHERE \"name\" = $1");
        assert_eq!(out["args"][0], "nuveo");
    }

    #[test]
    fn test_relation_path_lexical() {
        assert!(RelationPath::parse("0prest", "public", "test").is_err());
        assert!(RelationPath::parse("prest", "0public", "test").is_err());
        assert!(RelationPath::parse("prest", "public", "0test").is_err());
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let err = handler().select(&path("nope"), &[]).await.unwrap_err();
        assert!(matches!(err, RestError::UnknownIdentifier { .. }));
    }

    #[tokio::test]
    async fn test_listing_by_schema_binds_scope() {
        let out = handler()
            .list_tables_by_schema("prest", "public", &params(&[("t.tablename", "$eq.test")]))
            .await
            .unwrap();
        assert_eq!(
            out["args"],
            serde_json::json!(["prest", "public", "test"])
        );
    }

    #[tokio::test]
    async fn test_mutations_reject_read_clauses() {
        let err = handler()
            .delete(&path("test"), &params(&[("_order", "name")]))
            .await
            .unwrap_err();
        assert!(matches!(err, RestError::Syntax { .. }));
    }

    #[tokio::test]
    async fn test_insert_rejects_query_params() {
        let err = handler()
            .insert(&path("test"), &params(&[("name", "$eq.x")]), br#"{"name":"a"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, RestError::Syntax { .. }));
    }

    #[tokio::test]
    async fn test_compile_delete_returns_statement() {
        let statement = handler()
            .compile(
                Operation::Delete,
                &path("test"),
                &params(&[("name", "$eq.nuveo")]),
                &[],
            )
            .await
            .unwrap();
        assert_eq!(statement.sql, "DELETE FROM \"public\".\"test\" WHERE \"name\" = $1");
    }

    #[tokio::test]
    async fn test_update_requires_body() {
        let err = handler()
            .update(&path("test"), &params(&[("name", "$eq.nuveo")]), b"")
            .await
            .unwrap_err();
        assert!(matches!(err, RestError::InvalidBody(_)));
    }

    #[tokio::test]
    async fn test_expired_deadline_stops_before_execution() {
        let catalog = StaticCatalog::new(vec![CatalogSnapshot::new("prest", "public")
            .with_relation(RelationInfo::table("test", vec![ColumnInfo::new("name")]))]);
        let config = HandlerConfig {
            request_timeout: Duration::ZERO,
            ..HandlerConfig::default()
        };
        let handler = TableHandler::new(catalog, DryRunExecutor::new(), config);

        let err = handler.select(&path("test"), &[]).await.unwrap_err();
        assert!(matches!(err, RestError::Cancelled(_)));
        assert!(err.to_string().contains("context"));
    }
}
