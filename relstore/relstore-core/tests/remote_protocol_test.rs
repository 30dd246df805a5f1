//! RemoteStore against scripted HTTP responses: auth, status codes, protocol
//! errors and corrupt rows.

use relstore_core::{ReleaseStore, RemoteStore, StorageError};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "secret-token";

const COLUMNS: [&str; 11] = [
    "id",
    "organization",
    "appName",
    "platform",
    "version",
    "branch",
    "status",
    "tag",
    "uploadDate",
    "forceUpdate",
    "additionalData",
];

fn execute_ok(cols: &[&str], rows: Value) -> Value {
    let cols: Vec<Value> = cols.iter().map(|c| json!({"name": c})).collect();
    json!({
        "baton": null,
        "results": [
            {
                "type": "ok",
                "response": {
                    "type": "execute",
                    "result": {
                        "cols": cols,
                        "rows": rows,
                        "affected_row_count": 0,
                        "last_insert_rowid": null
                    }
                }
            },
            {"type": "ok", "response": {"type": "close"}}
        ]
    })
}

fn text(v: &str) -> Value {
    json!({"type": "text", "value": v})
}

/// Server that answers the open-time migration for an up-to-date table.
async fn current_schema_server() -> MockServer {
    let server = MockServer::start().await;

    let names: Vec<Value> = COLUMNS.iter().map(|c| json!([text(c)])).collect();
    Mock::given(method("POST"))
        .and(path("/v2/pipeline"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(body_string_contains("pragma_table_info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(execute_ok(&["name"], json!(names))))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/pipeline"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(body_string_contains("CREATE TABLE IF NOT EXISTS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(execute_ok(&[], json!([]))))
        .with_priority(1)
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn test_connect_sends_bearer_token() {
    let server = current_schema_server().await;
    let store = RemoteStore::connect(&server.uri(), TOKEN).await.unwrap();
    assert!(store.migration_report().is_noop());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2, "create table + column listing");
    for request in &requests {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["requests"][0]["type"], "execute");
        assert_eq!(body["requests"][1]["type"], "close");
    }
}

#[tokio::test]
async fn test_wrong_token_fails_to_connect() {
    let server = current_schema_server().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .with_priority(10)
        .mount(&server)
        .await;

    let err = RemoteStore::connect(&server.uri(), "wrong").await.unwrap_err();
    assert!(matches!(err, StorageError::Schema(_)), "got {err:?}");
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn test_http_error_surfaces_as_remote_error() {
    let server = current_schema_server().await;
    let store = RemoteStore::connect(&server.uri(), TOKEN).await.unwrap();

    Mock::given(method("POST"))
        .and(body_string_contains("FROM releases ORDER BY"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = store.get_all_releases().await.unwrap_err();
    assert!(matches!(err, StorageError::Remote(_)), "got {err:?}");
}

#[tokio::test]
async fn test_statement_error_result_is_not_empty_list() {
    let server = current_schema_server().await;
    let store = RemoteStore::connect(&server.uri(), TOKEN).await.unwrap();

    Mock::given(method("POST"))
        .and(body_string_contains("FROM releases ORDER BY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"type": "error", "error": {"message": "no such table: releases", "code": "SQLITE_ERROR"}}
            ]
        })))
        .mount(&server)
        .await;

    let err = store.get_all_releases().await.unwrap_err();
    assert!(err.to_string().contains("no such table"));
}

#[tokio::test]
async fn test_unknown_status_row_is_corrupt() {
    let server = current_schema_server().await;
    let store = RemoteStore::connect(&server.uri(), TOKEN).await.unwrap();

    let row = json!([[
        {"type": "integer", "value": "1"},
        text("Froggy Media"),
        text("froggy-98"),
        text("iOS"),
        text("1.0.0"),
        text("main"),
        text("Shipped"),
        text("launch"),
        text("2024-01-01T00:00:00.000Z"),
        text("No"),
        {"type": "null"}
    ]]);
    Mock::given(method("POST"))
        .and(body_string_contains("WHERE id = ?"))
        .respond_with(ResponseTemplate::new(200).set_body_json(execute_ok(&COLUMNS, row)))
        .mount(&server)
        .await;

    let err = store.get_release_by_id(1).await.unwrap_err();
    assert!(matches!(err, StorageError::Corrupt(_)), "got {err:?}");
}

#[tokio::test]
async fn test_bulk_update_is_one_request_per_distinct_id() {
    let server = current_schema_server().await;
    let store = RemoteStore::connect(&server.uri(), TOKEN).await.unwrap();

    let mut touched = execute_ok(&[], json!([]));
    touched["results"][0]["response"]["result"]["affected_row_count"] = json!(1);
    Mock::given(method("POST"))
        .and(body_string_contains("SET status = ?"))
        .respond_with(ResponseTemplate::new(200).set_body_json(touched))
        .expect(3)
        .mount(&server)
        .await;

    let updated = store
        .update_multiple_release_status(&[1, 2, 2, 3], relstore_core::ReleaseStatus::Published)
        .await
        .unwrap();
    assert_eq!(updated, 3);
}
