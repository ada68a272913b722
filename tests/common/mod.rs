//! Shared fixtures for the HTTP integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use tablerest::executor::{ExecError, ExecResult, StatementExecutor};
use tablerest::http_server::{build_router, ServerConfig};
use tablerest::rest_api::{
    CompiledStatement, HandlerConfig, RequestDeadline, StatementKind, TableHandler,
};
use tablerest::schema::{CatalogSnapshot, ColumnInfo, RelationInfo, StaticCatalog};

/// `prest.public` with the relations the route tests address
pub fn catalog() -> StaticCatalog {
    let snapshot = CatalogSnapshot::new("prest", "public")
        .with_relation(RelationInfo::table(
            "test",
            vec![ColumnInfo::typed("id", "int4"), ColumnInfo::typed("name", "text")],
        ))
        .with_relation(RelationInfo::table(
            "test2",
            vec![ColumnInfo::typed("name", "text"), ColumnInfo::typed("number", "int4")],
        ))
        .with_relation(RelationInfo::table(
            "test5",
            vec![ColumnInfo::typed("celphone", "text"), ColumnInfo::typed("name", "text")],
        ))
        .with_relation(RelationInfo::table(
            "test8",
            vec![ColumnInfo::typed("nameforjoin", "text")],
        ))
        .with_relation(RelationInfo::table(
            "testarray",
            vec![ColumnInfo::typed("data", "_text")],
        ))
        .with_relation(RelationInfo::table(
            "testjson",
            vec![ColumnInfo::typed("name", "text"), ColumnInfo::typed("data", "jsonb")],
        ))
        .with_relation(RelationInfo::view(
            "view_test",
            vec![ColumnInfo::typed("player", "text")],
        ));
    StaticCatalog::new(vec![snapshot])
}

/// Records every statement it receives and answers with empty results
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    statements: Arc<Mutex<Vec<CompiledStatement>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statements(&self) -> Vec<CompiledStatement> {
        self.statements.lock().unwrap().clone()
    }

    pub fn last(&self) -> CompiledStatement {
        self.statements()
            .pop()
            .expect("no statement was executed")
    }

    fn record(&self, statement: &CompiledStatement) {
        self.statements.lock().unwrap().push(statement.clone());
    }
}

impl StatementExecutor for RecordingExecutor {
    async fn fetch_json(
        &self,
        statement: &CompiledStatement,
        _deadline: &RequestDeadline,
    ) -> ExecResult<Value> {
        self.record(statement);
        Ok(match statement.kind {
            StatementKind::Insert => json!({"id": 1}),
            _ => json!([]),
        })
    }

    async fn execute(
        &self,
        statement: &CompiledStatement,
        _deadline: &RequestDeadline,
    ) -> ExecResult<u64> {
        self.record(statement);
        Ok(1)
    }
}

/// Never finishes within a short deadline
#[derive(Debug, Clone, Copy)]
pub struct SlowExecutor(pub Duration);

impl StatementExecutor for SlowExecutor {
    async fn fetch_json(
        &self,
        _statement: &CompiledStatement,
        deadline: &RequestDeadline,
    ) -> ExecResult<Value> {
        deadline
            .within(tokio::time::sleep(self.0))
            .await
            .ok_or(ExecError::Cancelled)?;
        Ok(json!([]))
    }

    async fn execute(
        &self,
        _statement: &CompiledStatement,
        deadline: &RequestDeadline,
    ) -> ExecResult<u64> {
        deadline
            .within(tokio::time::sleep(self.0))
            .await
            .ok_or(ExecError::Cancelled)?;
        Ok(0)
    }
}

/// Transactional write: the statement runs under the deadline, the commit
/// after it does not
#[derive(Debug, Clone)]
pub struct CommittingExecutor {
    pub statement_time: Duration,
    pub commit_time: Duration,
    committed: Arc<AtomicBool>,
}

impl CommittingExecutor {
    pub fn new(statement_time: Duration, commit_time: Duration) -> Self {
        Self {
            statement_time,
            commit_time,
            committed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn committed(&self) -> bool {
        self.committed.load(Ordering::SeqCst)
    }
}

impl StatementExecutor for CommittingExecutor {
    async fn fetch_json(
        &self,
        statement: &CompiledStatement,
        deadline: &RequestDeadline,
    ) -> ExecResult<Value> {
        self.execute(statement, deadline).await?;
        Ok(json!({"id": 1}))
    }

    async fn execute(
        &self,
        _statement: &CompiledStatement,
        deadline: &RequestDeadline,
    ) -> ExecResult<u64> {
        deadline
            .within(tokio::time::sleep(self.statement_time))
            .await
            .ok_or(ExecError::Cancelled)?;
        tokio::time::sleep(self.commit_time).await;
        self.committed.store(true, Ordering::SeqCst);
        Ok(1)
    }
}

/// Fails every statement as the database would
#[derive(Debug, Clone, Copy)]
pub struct FailingExecutor;

impl StatementExecutor for FailingExecutor {
    async fn fetch_json(
        &self,
        _statement: &CompiledStatement,
        _deadline: &RequestDeadline,
    ) -> ExecResult<Value> {
        Err(ExecError::Database("relation does not exist".to_string()))
    }

    async fn execute(
        &self,
        _statement: &CompiledStatement,
        _deadline: &RequestDeadline,
    ) -> ExecResult<u64> {
        Err(ExecError::Database("relation does not exist".to_string()))
    }
}

pub fn app_with<E: StatementExecutor>(executor: E, config: HandlerConfig) -> Router {
    let handler = TableHandler::new(catalog(), executor, config);
    build_router(&ServerConfig::default(), handler)
}

/// Router over the fixture catalog and a recording executor
pub fn app() -> (Router, RecordingExecutor) {
    let executor = RecordingExecutor::new();
    (app_with(executor.clone(), HandlerConfig::default()), executor)
}

pub async fn send(router: Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
    send(router, Method::GET, uri, None).await
}
