//! HTTP API.
//!
//! | Method | Path                   | Success                      |
//! |--------|------------------------|------------------------------|
//! | GET    | /releases              | 200 `[Release]`              |
//! | POST   | /releases              | 201 `Release`                |
//! | GET    | /releases/:id          | 200 `Release`                |
//! | PUT    | /releases/:id          | 200 `Release`                |
//! | DELETE | /releases/:id          | 204                          |
//! | POST   | /releases/bulk-update  | 200 `{message, updatedCount}`|
//! | GET    | /releases/grouped      | 200 `[TagGroup]`             |
//! | GET    | /releases/summary      | 200 `ReleaseSummary`         |
//! | GET    | /releases/export.csv   | 200 `text/csv`               |
//! | GET    | /health                | 200 diagnostics              |

pub mod health;
pub mod releases;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/releases",
            get(releases::list_releases).post(releases::create_release),
        )
        .route("/releases/bulk-update", post(releases::bulk_update))
        .route("/releases/grouped", get(releases::grouped_releases))
        .route("/releases/summary", get(releases::release_summary))
        .route("/releases/export.csv", get(releases::export_csv))
        .route(
            "/releases/:id",
            get(releases::get_release)
                .put(releases::update_release)
                .delete(releases::delete_release),
        )
        .route("/health", get(health::health_check))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
