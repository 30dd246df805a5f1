//! ReleaseStore - the contract every backend implements identically.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::StorageResult;
use crate::release::{NewRelease, Release, ReleaseId, ReleasePatch, ReleaseStatus};

// =============================================================================
// Backend Kind
// =============================================================================

/// Which implementation backs a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local SQLite file
    Sqlite,
    /// Volatile in-process store
    Memory,
    /// Hosted libSQL over HTTP
    Remote,
}

impl BackendKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
            Self::Remote => "remote",
        }
    }

    /// Parse a backend name, ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "file" => Some(Self::Sqlite),
            "memory" | "in-memory" => Some(Self::Memory),
            "remote" | "turso" | "libsql" => Some(Self::Remote),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ReleaseStore
// =============================================================================

/// Release persistence. Swapping implementations must never change what a
/// caller observes.
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Every release, newest upload first (ties: higher id first).
    async fn get_all_releases(&self) -> StorageResult<Vec<Release>>;

    /// One release, or `None` if the id does not exist.
    async fn get_release_by_id(&self, id: ReleaseId) -> StorageResult<Option<Release>>;

    /// Assign an id, fill defaults, persist and return the stored record.
    async fn create_release(&self, release: NewRelease) -> StorageResult<Release>;

    /// Merge supplied fields onto an existing release. `None` if the id does
    /// not exist; nothing is created in that case.
    async fn update_release(
        &self,
        id: ReleaseId,
        patch: ReleasePatch,
    ) -> StorageResult<Option<Release>>;

    /// Remove a release. `false` if nothing matched.
    async fn delete_release(&self, id: ReleaseId) -> StorageResult<bool>;

    /// Overwrite the status of each existing id. Returns how many matched;
    /// unknown ids are skipped.
    async fn update_multiple_release_status(
        &self,
        ids: &[ReleaseId],
        status: ReleaseStatus,
    ) -> StorageResult<u64>;

    /// Number of stored releases.
    async fn count_releases(&self) -> StorageResult<u64> {
        Ok(self.get_all_releases().await?.len() as u64)
    }
}

/// Ordering used by `get_all_releases`: upload date descending compared as
/// bytes (SQLite TEXT order), then id descending.
#[must_use]
pub fn newest_first(a: &Release, b: &Release) -> Ordering {
    b.upload_date
        .as_bytes()
        .cmp(a.upload_date.as_bytes())
        .then_with(|| b.id.cmp(&a.id))
}
