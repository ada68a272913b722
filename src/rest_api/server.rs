//! # REST API HTTP Server
//!
//! Axum routes for the table endpoints:
//!
//! - `GET /tables`
//! - `GET /:database/:schema`
//! - `GET|POST|PUT|PATCH|DELETE /:database/:schema/:table`

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::executor::StatementExecutor;
use crate::schema::CatalogProvider;

use super::errors::{RestError, RestResult};
use super::handler::{RelationPath, TableHandler};
use super::response::MutationResponse;

/// Raw query pairs in request order, repeated keys kept
type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;

/// REST API server state
pub struct RestServer<C: CatalogProvider, E: StatementExecutor> {
    handler: Arc<TableHandler<C, E>>,
}

impl<C: CatalogProvider, E: StatementExecutor> RestServer<C, E> {
    pub fn new(handler: TableHandler<C, E>) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Build the Axum router
    pub fn router(self) -> Router {
        Router::new()
            .route("/tables", get(list_tables_handler::<C, E>))
            .route(
                "/:database/:schema",
                get(list_tables_by_schema_handler::<C, E>),
            )
            .route(
                "/:database/:schema/:table",
                get(select_handler::<C, E>)
                    .post(insert_handler::<C, E>)
                    .put(update_handler::<C, E>)
                    .patch(update_handler::<C, E>)
                    .delete(delete_handler::<C, E>),
            )
            .with_state(self.handler)
    }
}

/// Shared state type
type ServerState<C, E> = Arc<TableHandler<C, E>>;

fn query_pairs(query: QueryPairs) -> RestResult<Vec<(String, String)>> {
    match query {
        Ok(Query(pairs)) => Ok(pairs),
        Err(rejection) => Err(RestError::syntax("query", rejection.body_text())),
    }
}

/// List every relation of the database
async fn list_tables_handler<C: CatalogProvider, E: StatementExecutor>(
    State(handler): State<ServerState<C, E>>,
    query: QueryPairs,
) -> Result<Json<Value>, RestError> {
    let params = query_pairs(query)?;
    Ok(Json(handler.list_tables(&params).await?))
}

/// List the tables of one database+schema
async fn list_tables_by_schema_handler<C: CatalogProvider, E: StatementExecutor>(
    State(handler): State<ServerState<C, E>>,
    Path((database, schema)): Path<(String, String)>,
    query: QueryPairs,
) -> Result<Json<Value>, RestError> {
    let params = query_pairs(query)?;
    let rows = handler
        .list_tables_by_schema(&database, &schema, &params)
        .await?;
    Ok(Json(rows))
}

/// Select rows
async fn select_handler<C: CatalogProvider, E: StatementExecutor>(
    State(handler): State<ServerState<C, E>>,
    Path((database, schema, table)): Path<(String, String, String)>,
    query: QueryPairs,
) -> Result<Json<Value>, RestError> {
    let path = RelationPath::parse(&database, &schema, &table)?;
    let params = query_pairs(query)?;
    Ok(Json(handler.select(&path, &params).await?))
}

/// Insert one row
async fn insert_handler<C: CatalogProvider, E: StatementExecutor>(
    State(handler): State<ServerState<C, E>>,
    Path((database, schema, table)): Path<(String, String, String)>,
    query: QueryPairs,
    body: Bytes,
) -> Result<Json<Value>, RestError> {
    let path = RelationPath::parse(&database, &schema, &table)?;
    let params = query_pairs(query)?;
    Ok(Json(handler.insert(&path, &params, &body).await?))
}

/// Update filtered rows (PUT and PATCH)
async fn update_handler<C: CatalogProvider, E: StatementExecutor>(
    State(handler): State<ServerState<C, E>>,
    Path((database, schema, table)): Path<(String, String, String)>,
    query: QueryPairs,
    body: Bytes,
) -> Result<Json<MutationResponse>, RestError> {
    let path = RelationPath::parse(&database, &schema, &table)?;
    let params = query_pairs(query)?;
    Ok(Json(handler.update(&path, &params, &body).await?))
}

/// Delete filtered rows
async fn delete_handler<C: CatalogProvider, E: StatementExecutor>(
    State(handler): State<ServerState<C, E>>,
    Path((database, schema, table)): Path<(String, String, String)>,
    query: QueryPairs,
) -> Result<Json<MutationResponse>, RestError> {
    let path = RelationPath::parse(&database, &schema, &table)?;
    let params = query_pairs(query)?;
    Ok(Json(handler.delete(&path, &params).await?))
}
