//! `/releases` handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use relstore_core::export::CSV_FILENAME_DEFAULT;
use relstore_core::{
    group_by_tag, releases_to_csv, sort_releases, BulkStatusRequest, Release, ReleaseCreate,
    ReleaseFilter, ReleaseId, ReleaseSummary, ReleaseUpdate, SortDirection, SortField, TagGroup,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ServiceResultExt};
use crate::state::AppState;

// =============================================================================
// Query / Response Types
// =============================================================================

/// Optional filters and ordering accepted by the read endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub organization: Option<String>,
    pub platform: Option<String>,
    pub status: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

impl ListQuery {
    fn filter(&self) -> ReleaseFilter {
        ReleaseFilter {
            organization: self.organization.clone(),
            platform: self.platform.clone(),
            status: self.status.clone(),
            tag: self.tag.clone(),
            search: self.search.clone(),
        }
    }

    /// `None` keeps storage order.
    fn ordering(&self) -> Result<Option<(SortField, SortDirection)>, ApiError> {
        let Some(raw) = self.sort.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let field = SortField::parse(raw)
            .ok_or_else(|| ApiError::bad_request(format!("Unknown sort field: {raw}")))?;
        let direction = match self.direction.as_deref().filter(|s| !s.is_empty()) {
            None => SortDirection::default(),
            Some(d) => SortDirection::parse(d)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown sort direction: {d}")))?,
        };
        Ok(Some((field, direction)))
    }

    fn apply(&self, releases: &[Release]) -> Result<Vec<Release>, ApiError> {
        let ordering = self.ordering()?;
        let mut selected = self.filter().apply(releases);
        if let Some((field, direction)) = ordering {
            sort_releases(&mut selected, field, direction);
        }
        Ok(selected)
    }
}

/// Bulk update response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateResponse {
    pub message: String,
    pub updated_count: u64,
}

/// Non-numeric ids can never match a record.
fn parse_id(raw: &str) -> Result<ReleaseId, ApiError> {
    raw.trim().parse::<ReleaseId>().map_err(|_| ApiError::not_found())
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(format!("Invalid JSON body: {}", rejection.body_text())))
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /releases
pub async fn list_releases(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Release>>, ApiError> {
    let releases = state.service.list().await.or_api("Failed to fetch releases")?;
    Ok(Json(query.apply(&releases)?))
}

/// POST /releases
pub async fn create_release(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ReleaseCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<Release>), ApiError> {
    let body = json_body(body)?;
    let release = state
        .service
        .create(body)
        .await
        .or_api("Failed to create release")?;
    Ok((StatusCode::CREATED, Json(release)))
}

/// GET /releases/:id
pub async fn get_release(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Release>, ApiError> {
    let id = parse_id(&raw_id)?;
    state
        .service
        .get(id)
        .await
        .or_api("Failed to fetch release")?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

/// PUT /releases/:id
pub async fn update_release(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    body: Result<Json<ReleaseUpdate>, JsonRejection>,
) -> Result<Json<Release>, ApiError> {
    let id = parse_id(&raw_id)?;
    let body = json_body(body)?;
    state
        .service
        .update(id, body)
        .await
        .or_api("Failed to update release")?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

/// DELETE /releases/:id
pub async fn delete_release(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw_id)?;
    let deleted = state
        .service
        .delete(id)
        .await
        .or_api("Failed to delete release")?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found())
    }
}

/// POST /releases/bulk-update
pub async fn bulk_update(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BulkStatusRequest>, JsonRejection>,
) -> Result<Json<BulkUpdateResponse>, ApiError> {
    let request = json_body(body)?;
    let outcome = state
        .service
        .bulk_update_status(&request)
        .await
        .or_api("Failed to update releases")?;
    Ok(Json(BulkUpdateResponse {
        message: outcome.message(),
        updated_count: outcome.updated,
    }))
}

/// GET /releases/grouped
pub async fn grouped_releases(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TagGroup>>, ApiError> {
    let releases = state.service.list().await.or_api("Failed to fetch releases")?;
    Ok(Json(group_by_tag(&query.apply(&releases)?)))
}

/// GET /releases/summary
pub async fn release_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ReleaseSummary>, ApiError> {
    let releases = state.service.list().await.or_api("Failed to fetch releases")?;
    Ok(Json(ReleaseSummary::of(&query.apply(&releases)?)))
}

/// GET /releases/export.csv
pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let releases = state.service.list().await.or_api("Failed to export releases")?;
    let csv = releases_to_csv(&query.apply(&releases)?);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{CSV_FILENAME_DEFAULT}\""),
            ),
        ],
        csv,
    )
        .into_response())
}
