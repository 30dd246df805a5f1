//! SqliteStore - local file backend.
//!
//! TigerStyle: Real database storage, explicit schema, proper error handling.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       SqliteStore                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Pool: sqlx::SqlitePool (small, one file)                    │
//! │  Table: releases (see schema.rs)                             │
//! │  Open: create table, then additive migration                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use super::backend::{BackendKind, ReleaseStore};
use super::error::{StorageError, StorageResult};
use super::row::{encode_additional_data, ReleaseRow};
use super::schema::{self, MigrationReport, SchemaTarget, SELECT_COLUMNS};
use crate::clock::{Clock, SystemClock};
use crate::constants::{RELEASES_TABLE, SQLITE_CONNECTIONS_MAX};
use crate::release::{NewRelease, Release, ReleaseFields, ReleaseId, ReleasePatch, ReleaseStatus};

// =============================================================================
// SqliteStore
// =============================================================================

/// SQLite storage backend for local development.
pub struct SqliteStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    migration: MigrationReport,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `path` and migrate it.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or the migration fails.
    ///
    /// # Example
    /// ```ignore
    /// let store = SqliteStore::open("releases.db").await?;
    /// ```
    pub async fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();

        if path.as_os_str().is_empty() {
            return Err(StorageError::connection("database path cannot be empty"));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(SQLITE_CONNECTIONS_MAX)
            .connect_with(options)
            .await
            .map_err(|e| {
                StorageError::connection(format!("failed to open {}: {e}", path.display()))
            })?;

        tracing::debug!(path = %path.display(), "Opened SQLite database");
        Self::from_pool(pool).await
    }

    /// Private in-memory database, gone when the store is dropped.
    ///
    /// A single connection that never idles out, so every query sees the
    /// same database.
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::connection(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::connection(format!("failed to open in-memory db: {e}")))?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and migrate it.
    pub async fn from_pool(pool: SqlitePool) -> StorageResult<Self> {
        let migration = schema::migrate(&pool).await?;
        Ok(Self {
            pool,
            clock: Arc::new(SystemClock),
            migration,
        })
    }

    /// Replace the clock used for default upload dates.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// What the migration changed when this store was opened.
    #[must_use]
    pub fn migration_report(&self) -> &MigrationReport {
        &self.migration
    }

    /// Get the connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn write_fields(&self, id: ReleaseId, fields: &ReleaseFields) -> StorageResult<u64> {
        let additional = encode_additional_data(fields.additional_data.as_ref())?;
        let result = sqlx::query(
            "UPDATE releases SET organization = ?, appName = ?, platform = ?, version = ?, \
             branch = ?, status = ?, tag = ?, uploadDate = ?, forceUpdate = ?, additionalData = ? \
             WHERE id = ?",
        )
        .bind(&fields.organization)
        .bind(&fields.app_name)
        .bind(&fields.platform)
        .bind(&fields.version)
        .bind(&fields.branch)
        .bind(fields.status.as_str())
        .bind(&fields.tag)
        .bind(&fields.upload_date)
        .bind(&fields.force_update)
        .bind(additional)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::write(format!("failed to update release {id}: {e}")))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SchemaTarget for SqlitePool {
    async fn execute_sql(&self, sql: &str) -> StorageResult<u64> {
        let result = sqlx::query(sql)
            .execute(self)
            .await
            .map_err(|e| StorageError::write(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn column_names(&self) -> StorageResult<Vec<String>> {
        let rows = sqlx::query(&format!(
            "SELECT name FROM pragma_table_info('{RELEASES_TABLE}')"
        ))
        .fetch_all(self)
        .await
        .map_err(|e| StorageError::schema(format!("failed to read table info: {e}")))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("name")
                    .map_err(|e| StorageError::schema(e.to_string()))
            })
            .collect()
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

/// Parse a database row into a Release.
fn row_to_release(row: &SqliteRow) -> StorageResult<Release> {
    let text = |column: &str| {
        row.try_get::<Option<String>, _>(column)
            .map_err(|e| StorageError::read(format!("column {column}: {e}")))
    };

    let id: i64 = row
        .try_get("id")
        .map_err(|e| StorageError::read(format!("column id: {e}")))?;

    ReleaseRow {
        id,
        organization: text("organization")?,
        app_name: text("appName")?,
        platform: text("platform")?,
        version: text("version")?,
        branch: text("branch")?,
        status: text("status")?,
        tag: text("tag")?,
        upload_date: text("uploadDate")?,
        force_update: text("forceUpdate")?,
        additional_data: text("additionalData")?,
    }
    .into_release()
}

// =============================================================================
// ReleaseStore Implementation
// =============================================================================

#[async_trait]
impl ReleaseStore for SqliteStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn get_all_releases(&self) -> StorageResult<Vec<Release>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM releases ORDER BY uploadDate DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::read(format!("failed to list releases: {e}")))?;

        rows.iter().map(row_to_release).collect()
    }

    async fn get_release_by_id(&self, id: ReleaseId) -> StorageResult<Option<Release>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM releases WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::read(format!("failed to get release {id}: {e}")))?;

        row.as_ref().map(row_to_release).transpose()
    }

    async fn create_release(&self, release: NewRelease) -> StorageResult<Release> {
        let fields = release.resolve(self.clock.as_ref());
        let additional = encode_additional_data(fields.additional_data.as_ref())?;

        let result = sqlx::query(
            "INSERT INTO releases (organization, appName, platform, version, branch, status, \
             tag, uploadDate, forceUpdate, additionalData) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&fields.organization)
        .bind(&fields.app_name)
        .bind(&fields.platform)
        .bind(&fields.version)
        .bind(&fields.branch)
        .bind(fields.status.as_str())
        .bind(&fields.tag)
        .bind(&fields.upload_date)
        .bind(&fields.force_update)
        .bind(additional)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::write(format!("failed to insert release: {e}")))?;

        let id = result.last_insert_rowid();
        self.get_release_by_id(id)
            .await?
            .ok_or_else(|| StorageError::write(format!("release {id} missing after insert")))
    }

    async fn update_release(
        &self,
        id: ReleaseId,
        patch: ReleasePatch,
    ) -> StorageResult<Option<Release>> {
        let Some(mut release) = self.get_release_by_id(id).await? else {
            return Ok(None);
        };
        patch.apply(&mut release);

        if self.write_fields(id, &ReleaseFields::from(release)).await? == 0 {
            // Deleted between read and write.
            return Ok(None);
        }
        self.get_release_by_id(id).await
    }

    async fn delete_release(&self, id: ReleaseId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM releases WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::write(format!("failed to delete release {id}: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_multiple_release_status(
        &self,
        ids: &[ReleaseId],
        status: ReleaseStatus,
    ) -> StorageResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("UPDATE releases SET status = ? WHERE id IN ({placeholders})");
        let mut query = sqlx::query(&sql).bind(status.as_str());
        for id in ids {
            query = query.bind(*id);
        }

        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::write(format!("failed to bulk update status: {e}")))?;

        Ok(result.rows_affected())
    }

    async fn count_releases(&self) -> StorageResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM releases")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::read(format!("failed to count releases: {e}")))?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}
