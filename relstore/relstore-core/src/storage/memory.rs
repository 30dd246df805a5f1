//! MemoryStore - volatile in-process backend.
//!
//! TigerStyle: same contract as the SQL backends, no I/O.
//!
//! Used when a production-like deployment has no remote credentials, and by
//! tests. Data lives for the process lifetime only.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::backend::{newest_first, BackendKind, ReleaseStore};
use super::error::StorageResult;
use crate::clock::{Clock, SystemClock};
use crate::release::{NewRelease, Release, ReleaseId, ReleasePatch, ReleaseStatus};

/// Records plus the id counter, guarded together.
#[derive(Debug)]
struct MemoryState {
    releases: Vec<Release>,
    /// Next id to hand out. Only ever grows, so deleted ids are never reused.
    next_id: ReleaseId,
}

/// In-memory release store.
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Empty store stamped by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Empty store using the given clock for default upload dates.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                releases: Vec::new(),
                next_id: 1,
            }),
            clock,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReleaseStore for MemoryStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn get_all_releases(&self) -> StorageResult<Vec<Release>> {
        let state = self.state.read().await;
        let mut releases = state.releases.clone();
        releases.sort_by(newest_first);
        Ok(releases)
    }

    async fn get_release_by_id(&self, id: ReleaseId) -> StorageResult<Option<Release>> {
        let state = self.state.read().await;
        Ok(state.releases.iter().find(|r| r.id == id).cloned())
    }

    async fn create_release(&self, release: NewRelease) -> StorageResult<Release> {
        let fields = release.resolve(self.clock.as_ref());

        let mut state = self.state.write().await;
        let id = state.next_id;
        state.next_id += 1;

        let stored = fields.into_release(id);
        state.releases.push(stored.clone());

        // Postcondition
        assert!(state.next_id > id, "id counter must advance");
        Ok(stored)
    }

    async fn update_release(
        &self,
        id: ReleaseId,
        patch: ReleasePatch,
    ) -> StorageResult<Option<Release>> {
        let mut state = self.state.write().await;
        let Some(existing) = state.releases.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        patch.apply(existing);
        Ok(Some(existing.clone()))
    }

    async fn delete_release(&self, id: ReleaseId) -> StorageResult<bool> {
        let mut state = self.state.write().await;
        let before = state.releases.len();
        state.releases.retain(|r| r.id != id);
        Ok(state.releases.len() < before)
    }

    async fn update_multiple_release_status(
        &self,
        ids: &[ReleaseId],
        status: ReleaseStatus,
    ) -> StorageResult<u64> {
        let mut state = self.state.write().await;
        let mut updated = 0u64;
        for release in state.releases.iter_mut().filter(|r| ids.contains(&r.id)) {
            release.status = status;
            updated += 1;
        }

        // Postcondition
        assert!(updated as usize <= ids.len(), "cannot update more than requested");
        Ok(updated)
    }

    async fn count_releases(&self) -> StorageResult<u64> {
        Ok(self.state.read().await.releases.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimClock;

    fn store() -> MemoryStore {
        MemoryStore::with_clock(Arc::new(SimClock::at_ms(1_700_000_000_000)))
    }

    fn sample(version: &str) -> NewRelease {
        NewRelease::new("the-wolf", "Android", version, "main", "spring")
    }

    #[test]
    fn test_default_store_is_empty() {
        let store = MemoryStore::default();
        let releases = tokio_test::block_on(store.get_all_releases()).unwrap();
        assert!(releases.is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let store = store();
        let first = store.create_release(sample("1.0")).await.unwrap();
        assert!(store.delete_release(first.id).await.unwrap());
        let second = store.create_release(sample("1.1")).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_create_uses_clock() {
        let store = store();
        let created = store.create_release(sample("1.0")).await.unwrap();
        assert_eq!(created.upload_date, "2023-11-14T22:13:20.000Z");
        assert_eq!(created.organization, "Rock Radio Group");
    }

    #[tokio::test]
    async fn test_count_releases() {
        let store = store();
        assert_eq!(store.count_releases().await.unwrap(), 0);
        store.create_release(sample("1.0")).await.unwrap();
        store.create_release(sample("1.1")).await.unwrap();
        assert_eq!(store.count_releases().await.unwrap(), 2);
    }
}
