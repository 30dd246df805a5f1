//! Shared test fixtures: store builders and an in-process Hrana server.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Arguments, Column, Row, TypeInfo, ValueRef};

use relstore_core::{MemoryStore, ReleaseStore, RemoteStore, SimClock, SqliteStore};

/// Fixed start time for every store built here: 2024-06-01T09:30:00.000Z.
pub const CLOCK_START_MS: i64 = 1_717_234_200_000;

pub const FAKE_TOKEN: &str = "test-token";

// =============================================================================
// Fake Hrana Server
// =============================================================================

/// Hrana-over-HTTP v2 pipeline endpoint backed by an in-memory SQLite pool.
pub struct FakeHrana {
    pub url: String,
    pub pool: SqlitePool,
    server: tokio::task::JoinHandle<()>,
}

impl Drop for FakeHrana {
    fn drop(&mut self) {
        self.server.abort();
    }
}

#[derive(Clone)]
struct FakeState {
    pool: SqlitePool,
    token: String,
}

pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap()
}

impl FakeHrana {
    pub async fn spawn() -> Self {
        Self::spawn_with_pool(memory_pool().await).await
    }

    /// Serve an existing pool, e.g. one holding a legacy table.
    pub async fn spawn_with_pool(pool: SqlitePool) -> Self {
        let state = FakeState {
            pool: pool.clone(),
            token: FAKE_TOKEN.to_string(),
        };
        let app = Router::new()
            .route("/v2/pipeline", post(pipeline))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            pool,
            server,
        }
    }
}

async fn pipeline(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let expected = format!("Bearer {}", state.token);
    let authorised = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorised {
        return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
    }

    let mut results = Vec::new();
    for request in body["requests"].as_array().cloned().unwrap_or_default() {
        match request["type"].as_str() {
            Some("execute") => results.push(execute(&state.pool, &request["stmt"]).await),
            Some("close") => results.push(json!({"type": "ok", "response": {"type": "close"}})),
            other => results.push(json!({
                "type": "error",
                "error": {"message": format!("unsupported request {other:?}")}
            })),
        }
    }

    Json(json!({"baton": null, "base_url": null, "results": results})).into_response()
}

async fn execute(pool: &SqlitePool, stmt: &Value) -> Value {
    let sql = stmt["sql"].as_str().unwrap_or_default().to_string();

    let mut args = SqliteArguments::default();
    for arg in stmt["args"].as_array().cloned().unwrap_or_default() {
        let bound = match arg["type"].as_str() {
            Some("integer") => args.add(arg["value"].as_str().and_then(|v| v.parse::<i64>().ok())),
            Some("float") => args.add(arg["value"].as_f64()),
            Some("text") => args.add(arg["value"].as_str().map(str::to_string)),
            _ => args.add(Option::<String>::None),
        };
        bound.unwrap();
    }

    let head = sql.trim_start().to_uppercase();
    let outcome = if head.starts_with("SELECT") || head.starts_with("PRAGMA") {
        sqlx::query_with(&sql, args)
            .fetch_all(pool)
            .await
            .map(|rows| rows_result(&rows))
    } else {
        sqlx::query_with(&sql, args).execute(pool).await.map(|done| {
            json!({
                "cols": [],
                "rows": [],
                "affected_row_count": done.rows_affected(),
                "last_insert_rowid": done.last_insert_rowid().to_string(),
            })
        })
    };

    match outcome {
        Ok(result) => json!({"type": "ok", "response": {"type": "execute", "result": result}}),
        Err(e) => json!({
            "type": "error",
            "error": {"message": format!("SQLite error: {e}"), "code": "SQLITE_ERROR"}
        }),
    }
}

fn rows_result(rows: &[sqlx::sqlite::SqliteRow]) -> Value {
    let cols: Vec<Value> = rows
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|c| json!({"name": c.name()}))
                .collect()
        })
        .unwrap_or_default();

    let encoded: Vec<Value> = rows
        .iter()
        .map(|row| {
            (0..row.columns().len())
                .map(|i| encode_value(row, i))
                .collect::<Vec<_>>()
                .into()
        })
        .collect();

    json!({
        "cols": cols,
        "rows": encoded,
        "affected_row_count": 0,
        "last_insert_rowid": null,
    })
}

fn encode_value(row: &sqlx::sqlite::SqliteRow, index: usize) -> Value {
    let raw = row.try_get_raw(index).unwrap();
    if raw.is_null() {
        return json!({"type": "null"});
    }
    let type_name = raw.type_info().name().to_string();
    match type_name.as_str() {
        "INTEGER" => json!({"type": "integer", "value": row.get::<i64, _>(index).to_string()}),
        "REAL" => json!({"type": "float", "value": row.get::<f64, _>(index)}),
        _ => json!({"type": "text", "value": row.get::<String, _>(index)}),
    }
}

// =============================================================================
// Store Builders
// =============================================================================

/// One store of each kind, all on the same simulated clock.
pub struct Backends {
    pub stores: Vec<Arc<dyn ReleaseStore>>,
    _remote: FakeHrana,
}

impl Backends {
    pub async fn all() -> Self {
        let memory: Arc<dyn ReleaseStore> = Arc::new(MemoryStore::with_clock(clock()));

        let sqlite: Arc<dyn ReleaseStore> =
            Arc::new(SqliteStore::in_memory().await.unwrap().with_clock(clock()));

        let fake = FakeHrana::spawn().await;
        let remote: Arc<dyn ReleaseStore> = Arc::new(
            RemoteStore::connect_with_clock(&fake.url, FAKE_TOKEN, clock())
                .await
                .unwrap(),
        );

        Self {
            stores: vec![memory, sqlite, remote],
            _remote: fake,
        }
    }
}

pub fn clock() -> Arc<SimClock> {
    Arc::new(SimClock::at_ms(CLOCK_START_MS))
}
