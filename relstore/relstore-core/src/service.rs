//! ReleaseService - the access API every caller goes through.
//!
//! TigerStyle: validate first, then delegate to the one selected store.
//!
//! Validation failures never reach a backend. Storage failures are passed
//! up unchanged so the caller decides how much detail to expose.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::release::{Release, ReleaseCreate, ReleaseId, ReleaseStatus, ReleaseUpdate};
use crate::selector::StoreHandle;
use crate::storage::{BackendKind, StorageError};
use crate::validation::{
    validate_bulk_ids, validate_create, validate_status, validate_update, ValidationError,
};

// =============================================================================
// Errors
// =============================================================================

/// Anything an access API call can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Bulk Request / Outcome
// =============================================================================

/// Bulk status body. Both fields are kept loose so every malformed shape is
/// reported as a validation error rather than a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkStatusRequest {
    #[serde(default)]
    pub ids: Value,
    #[serde(default)]
    pub status: Value,
}

impl BulkStatusRequest {
    #[must_use]
    pub fn new(ids: Vec<Value>, status: &str) -> Self {
        Self {
            ids: Value::Array(ids),
            status: Value::String(status.to_string()),
        }
    }
}

/// Result of a bulk status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkUpdateOutcome {
    pub status: ReleaseStatus,
    /// Distinct ids after validation
    pub requested: usize,
    /// Ids that matched an existing release
    pub updated: u64,
}

impl BulkUpdateOutcome {
    /// Human-readable summary returned to callers.
    #[must_use]
    pub fn message(&self) -> String {
        format!("Updated {} releases to status: {}", self.updated, self.status)
    }
}

// =============================================================================
// ReleaseService
// =============================================================================

/// The six release operations plus a count.
#[derive(Debug, Clone)]
pub struct ReleaseService {
    handle: StoreHandle,
}

impl ReleaseService {
    #[must_use]
    pub fn new(handle: StoreHandle) -> Self {
        Self { handle }
    }

    /// Backend behind this service.
    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.handle.kind()
    }

    /// All releases, newest first.
    pub async fn list(&self) -> ServiceResult<Vec<Release>> {
        let releases = self.handle.store().get_all_releases().await?;
        tracing::debug!(count = releases.len(), "Listed releases");
        Ok(releases)
    }

    /// One release, `None` when the id does not exist.
    pub async fn get(&self, id: ReleaseId) -> ServiceResult<Option<Release>> {
        Ok(self.handle.store().get_release_by_id(id).await?)
    }

    /// Validate and create.
    ///
    /// # Errors
    /// [`ServiceError::Validation`] for missing fields or an invalid status.
    pub async fn create(&self, body: ReleaseCreate) -> ServiceResult<Release> {
        let new = validate_create(body)?;
        let release = self.handle.store().create_release(new).await?;

        // Postcondition
        assert!(!release.organization.is_empty(), "stored organization must not be empty");

        tracing::info!(
            release_id = release.id,
            app = %release.app_name,
            version = %release.version,
            "Release created"
        );
        Ok(release)
    }

    /// Validate and merge a partial update.
    pub async fn update(&self, id: ReleaseId, body: ReleaseUpdate) -> ServiceResult<Option<Release>> {
        let patch = validate_update(body)?;
        let updated = self.handle.store().update_release(id, patch).await?;
        match &updated {
            Some(release) => tracing::info!(release_id = id, status = %release.status, "Release updated"),
            None => tracing::debug!(release_id = id, "Update for missing release"),
        }
        Ok(updated)
    }

    /// Delete; `false` when nothing matched.
    pub async fn delete(&self, id: ReleaseId) -> ServiceResult<bool> {
        let deleted = self.handle.store().delete_release(id).await?;
        if deleted {
            tracing::info!(release_id = id, "Release deleted");
        }
        Ok(deleted)
    }

    /// Set the status of many releases at once.
    ///
    /// Checks run in order: ids present, status valid, ids numeric.
    pub async fn bulk_update_status(&self, request: &BulkStatusRequest) -> ServiceResult<BulkUpdateOutcome> {
        let raw_ids = match &request.ids {
            Value::Array(ids) if !ids.is_empty() => ids.as_slice(),
            _ => return Err(ValidationError::EmptyIds.into()),
        };
        let status = validate_status(request.status.as_str())?;
        let ids = validate_bulk_ids(raw_ids)?;

        let updated = self
            .handle
            .store()
            .update_multiple_release_status(&ids, status)
            .await?;

        // Postcondition
        assert!(updated as usize <= ids.len(), "cannot update more releases than requested");

        tracing::info!(
            requested = ids.len(),
            updated,
            status = %status,
            "Bulk status update"
        );
        Ok(BulkUpdateOutcome {
            status,
            requested: ids.len(),
            updated,
        })
    }

    /// Number of stored releases.
    pub async fn count(&self) -> ServiceResult<u64> {
        Ok(self.handle.store().count_releases().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn service() -> ReleaseService {
        ReleaseService::new(StoreHandle::from_store(Arc::new(MemoryStore::new())))
    }

    fn body(app: &str) -> ReleaseCreate {
        ReleaseCreate {
            app_name: Some(app.into()),
            platform: Some("iOS".into()),
            version: Some("1.0.0".into()),
            branch: Some("main".into()),
            tag: Some("launch".into()),
            ..ReleaseCreate::default()
        }
    }

    #[tokio::test]
    async fn test_create_validation_never_reaches_store() {
        let service = service();
        let err = service
            .create(ReleaseCreate {
                tag: None,
                ..body("froggy-98")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ValidationError::MissingFields { .. })));
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bulk_checks_ids_before_status() {
        let service = service();
        let err = service
            .bulk_update_status(&BulkStatusRequest {
                ids: json!([]),
                status: json!("Nope"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ValidationError::EmptyIds)));

        let err = service
            .bulk_update_status(&BulkStatusRequest {
                ids: json!("1,2"),
                status: json!("Published"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ValidationError::EmptyIds)));
    }

    #[tokio::test]
    async fn test_bulk_checks_status_before_ids() {
        let service = service();
        let err = service
            .bulk_update_status(&BulkStatusRequest {
                ids: json!(["abc"]),
                status: json!(null),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ValidationError::InvalidStatus { .. })));
    }

    #[tokio::test]
    async fn test_bulk_outcome_message() {
        let service = service();
        let a = service.create(body("a")).await.unwrap();
        let b = service.create(body("b")).await.unwrap();

        let outcome = service
            .bulk_update_status(&BulkStatusRequest::new(
                vec![json!(a.id), json!(b.id.to_string()), json!(a.id), json!(999)],
                "Published",
            ))
            .await
            .unwrap();

        assert_eq!(outcome.requested, 3);
        assert_eq!(outcome.updated, 2);
        assert_eq!(outcome.message(), "Updated 2 releases to status: Published");
    }
}
