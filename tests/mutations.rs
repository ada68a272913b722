//! Write routes, execution failures and request deadlines

mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use serde_json::json;

use tablerest::rest_api::{HandlerConfig, SqlValue, StatementKind};

use common::{app, app_with, get, send, CommittingExecutor, FailingExecutor, SlowExecutor};

// =============================================================================
// POST
// =============================================================================

#[tokio::test]
async fn test_insert_into_table() {
    let (router, executor) = app();
    let (status, body) = send(
        router,
        Method::POST,
        "/prest/public/test",
        Some(r#"{"name": "nuveo"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 1}));

    let statement = executor.last();
    assert_eq!(
        statement.sql,
        "INSERT INTO \"public\".\"test\" (\"name\") VALUES ($1::text) RETURNING *"
    );
    assert_eq!(statement.args, vec![SqlValue::Text("nuveo".to_string())]);
    assert_eq!(statement.kind, StatementKind::Insert);
}

#[tokio::test]
async fn test_insert_array_column() {
    let (router, executor) = app();
    let (status, _) = send(
        router,
        Method::POST,
        "/prest/public/testarray",
        Some(r#"{"data": ["value 1", "value 2", "value 3"]}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let statement = executor.last();
    assert!(statement.sql.contains("VALUES ($1::_text)"));
    assert_eq!(
        statement.args,
        vec![SqlValue::Text(
            r#"{"value 1","value 2","value 3"}"#.to_string()
        )]
    );
}

#[tokio::test]
async fn test_insert_json_column() {
    let (router, executor) = app();
    let (status, _) = send(
        router,
        Method::POST,
        "/prest/public/testjson",
        Some(r#"{"name": "nuveo", "data": {"term": "name", "subterm": ["names", "of"]}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let statement = executor.last();
    assert!(statement.sql.starts_with("INSERT INTO \"public\".\"testjson\" ("));
    assert!(statement.sql.contains("::jsonb"));
    let doc = statement
        .args
        .iter()
        .find_map(|arg| match arg {
            SqlValue::Text(text) => serde_json::from_str::<serde_json::Value>(text)
                .ok()
                .filter(|v| v.is_object()),
            _ => None,
        })
        .expect("json argument");
    assert_eq!(doc["subterm"], json!(["names", "of"]));
}

#[tokio::test]
async fn test_insert_rejections() {
    let cases = [
        ("/prest/public/test", None),
        ("/prest/public/test", Some("")),
        ("/prest/public/test", Some("{}")),
        ("/prest/public/test", Some("[1, 2]")),
        ("/prest/public/test", Some("{\"name\": ")),
        ("/prest/public/test", Some(r#"{"missing": 1}"#)),
        ("/prest/public/test", Some(r#"{"0name": 1}"#)),
        ("/prest/public/test?name=$eq.nuveo", Some(r#"{"name": "nuveo"}"#)),
        ("/0prest/public/test", Some(r#"{"name": "nuveo"}"#)),
        ("/prest/0public/test", Some(r#"{"name": "nuveo"}"#)),
        ("/prest/public/0test", Some(r#"{"name": "nuveo"}"#)),
        ("/prest/public/missing", Some(r#"{"name": "nuveo"}"#)),
    ];

    for (uri, body) in cases {
        let (router, executor) = app();
        let (status, response) = send(router, Method::POST, uri, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "POST {} {:?}: {}", uri, body, response);
        assert!(executor.statements().is_empty(), "POST {} reached the executor", uri);
    }
}

// =============================================================================
// DELETE
// =============================================================================

#[tokio::test]
async fn test_delete_from_table() {
    let (router, executor) = app();
    let (status, body) = send(router, Method::DELETE, "/prest/public/test?name=$eq.nuveo", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"rows_affected": 1}));

    let statement = executor.last();
    assert_eq!(
        statement.sql,
        "DELETE FROM \"public\".\"test\" WHERE \"name\" = $1::text"
    );
    assert_eq!(statement.kind, StatementKind::Mutation);
}

#[tokio::test]
async fn test_delete_rejections() {
    let cases = [
        "/prest/public/test?0name=$eq.nuveo",
        "/prest/public/test?missing=$eq.nuveo",
        "/prest/public/test?name=$eq.nuveo&_order=name",
        "/prest/public/test?_page=1",
        "/prest/public/test?_join=inner:test8:test8.nameforjoin:$eq:test.name",
        "/0prest/public/test",
        "/prest/0public/test",
        "/prest/public/0test",
    ];

    for uri in cases {
        let (router, executor) = app();
        let (status, _) = send(router, Method::DELETE, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "DELETE {}", uri);
        assert!(executor.statements().is_empty(), "DELETE {} reached the executor", uri);
    }
}

// =============================================================================
// PUT / PATCH
// =============================================================================

#[tokio::test]
async fn test_update_table() {
    for method in [Method::PUT, Method::PATCH] {
        let (router, executor) = app();
        let (status, body) = send(
            router,
            method.clone(),
            "/prest/public/test?name=$eq.nuveo",
            Some(r#"{"name": "prest"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", method);
        assert_eq!(body, json!({"rows_affected": 1}));

        let statement = executor.last();
        assert_eq!(
            statement.sql,
            "UPDATE \"public\".\"test\" SET \"name\" = $1::text WHERE \"name\" = $2::text"
        );
        assert_eq!(
            statement.args,
            vec![
                SqlValue::Text("prest".to_string()),
                SqlValue::Text("nuveo".to_string())
            ]
        );
    }
}

#[tokio::test]
async fn test_update_rejections() {
    let cases = [
        ("/prest/public/test?name=$eq.nuveo", None),
        ("/prest/public/test?name=$eq.nuveo", Some("")),
        ("/prest/public/test?0name=$eq.nuveo", Some(r#"{"name": "prest"}"#)),
        ("/prest/public/test?name=$eq.nuveo", Some(r#"{"missing": "prest"}"#)),
        ("/prest/public/test?_select=name", Some(r#"{"name": "prest"}"#)),
        ("/0prest/public/test", Some(r#"{"name": "prest"}"#)),
        ("/prest/0public/test", Some(r#"{"name": "prest"}"#)),
        ("/prest/public/0test", Some(r#"{"name": "prest"}"#)),
    ];

    for method in [Method::PUT, Method::PATCH] {
        for (uri, body) in cases {
            let (router, executor) = app();
            let (status, _) = send(router, method.clone(), uri, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{} {} {:?}", method, uri, body);
            assert!(executor.statements().is_empty());
        }
    }
}

// =============================================================================
// Execution failures and deadlines
// =============================================================================

#[tokio::test]
async fn test_execution_failure_is_server_error() {
    let router = app_with(FailingExecutor, HandlerConfig::default());
    let (status, body) = get(router.clone(), "/prest/public/test").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 500);

    let (status, _) = send(router, Method::DELETE, "/prest/public/test", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_deadline_exceeded() {
    let config = HandlerConfig {
        request_timeout: Duration::from_millis(20),
        ..HandlerConfig::default()
    };
    let router = app_with(SlowExecutor(Duration::from_secs(5)), config);

    let (status, body) = get(router.clone(), "/prest/public/test").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("context"));

    let (status, body) = send(
        router,
        Method::PUT,
        "/prest/public/test?name=$eq.nuveo",
        Some(r#"{"name": "prest"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("context deadline exceeded"));
}

#[tokio::test]
async fn test_committed_write_reported_as_applied() {
    let config = HandlerConfig {
        request_timeout: Duration::from_millis(20),
        ..HandlerConfig::default()
    };
    let executor = CommittingExecutor::new(Duration::from_millis(1), Duration::from_millis(50));
    let router = app_with(executor.clone(), config);

    let (status, body) = send(
        router,
        Method::PUT,
        "/prest/public/test?name=$eq.nuveo",
        Some(r#"{"name": "prest"}"#),
    )
    .await;
    assert!(executor.committed());
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body, json!({"rows_affected": 1}));
}

#[tokio::test]
async fn test_timed_out_write_never_committed() {
    let config = HandlerConfig {
        request_timeout: Duration::from_millis(20),
        ..HandlerConfig::default()
    };
    let executor = CommittingExecutor::new(Duration::from_secs(5), Duration::ZERO);
    let router = app_with(executor.clone(), config);

    let (status, body) = send(
        router,
        Method::POST,
        "/prest/public/test",
        Some(r#"{"name": "nuveo"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("context deadline exceeded"));
    assert!(!executor.committed());
}
