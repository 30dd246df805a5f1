//! `/health` diagnostics. Always 200; database trouble is reported in the body.

use std::sync::Arc;

use axum::{extract::State, Json};
use relstore_core::clock::format_timestamp;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub message: &'static str,
    pub timestamp: String,
    pub environment: EnvironmentReport,
    pub database: DatabaseReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentReport {
    pub backend: String,
    pub production_like: bool,
    pub has_remote_url: bool,
    pub has_remote_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DatabaseReport {
    #[serde(rename_all = "camelCase")]
    Connected { release_count: u64 },
    Error { error: String },
}

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = match state.service.count().await {
        Ok(release_count) => DatabaseReport::Connected { release_count },
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            DatabaseReport::Error {
                error: e.to_string(),
            }
        }
    };

    Json(HealthResponse {
        message: "API is working",
        timestamp: format_timestamp(chrono::Utc::now()),
        environment: EnvironmentReport {
            backend: state.service.backend().to_string(),
            production_like: state.environment.production_like,
            has_remote_url: state.environment.has_remote_url,
            has_remote_token: state.environment.has_remote_token,
        },
        database,
    })
}
