//! Schema - table definition and self-healing migration.
//!
//! Shared by the SQLite and remote backends so both heal an old table the
//! same way. The migration is idempotent: running it against an up-to-date
//! table does nothing.

use async_trait::async_trait;

use super::error::{StorageError, StorageResult};
use crate::constants::{
    BRANCH_DEFAULT, FORCE_UPDATE_DEFAULT, LEGACY_BRANCH_COLUMN, RELEASES_TABLE, STATUS_DEFAULT,
    TAG_DEFAULT,
};

/// Create statement for a fresh database.
pub const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS releases (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        organization TEXT NOT NULL,
        appName TEXT NOT NULL,
        platform TEXT NOT NULL,
        version TEXT NOT NULL,
        branch TEXT NOT NULL,
        status TEXT DEFAULT 'In Review',
        tag TEXT NOT NULL,
        uploadDate TEXT NOT NULL,
        forceUpdate TEXT DEFAULT 'No',
        additionalData TEXT
    )
"#;

/// Explicit column list used by every read.
pub const SELECT_COLUMNS: &str = "id, organization, appName, platform, version, branch, status, \
                                  tag, uploadDate, forceUpdate, additionalData";

/// Optional column added to tables that predate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalColumn {
    pub name: &'static str,
    pub default: &'static str,
}

impl OptionalColumn {
    /// `ALTER TABLE` statement adding this column with its default.
    #[must_use]
    pub fn add_column_sql(&self) -> String {
        format!(
            "ALTER TABLE {RELEASES_TABLE} ADD COLUMN {} TEXT DEFAULT '{}'",
            self.name, self.default
        )
    }
}

/// Columns that older databases may lack, in the order they are added.
pub const OPTIONAL_COLUMNS: [OptionalColumn; 4] = [
    OptionalColumn {
        name: "status",
        default: STATUS_DEFAULT,
    },
    OptionalColumn {
        name: "branch",
        default: BRANCH_DEFAULT,
    },
    OptionalColumn {
        name: "tag",
        default: TAG_DEFAULT,
    },
    OptionalColumn {
        name: "forceUpdate",
        default: FORCE_UPDATE_DEFAULT,
    },
];

/// Legacy copy when `branch` already existed: only fill empty branches.
const LEGACY_COPY_EMPTY_SQL: &str = "UPDATE releases SET branch = buildNumber \
     WHERE (branch IS NULL OR branch = '') \
     AND buildNumber IS NOT NULL AND buildNumber != ''";

/// Legacy copy when `branch` was just added: every row got the default, so
/// overwrite it from the legacy column.
const LEGACY_COPY_ALL_SQL: &str = "UPDATE releases SET branch = buildNumber \
     WHERE buildNumber IS NOT NULL AND buildNumber != ''";

// =============================================================================
// Migration
// =============================================================================

/// What a migration run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Optional columns added during this run
    pub added_columns: Vec<&'static str>,
    /// Whether the legacy branch column was found
    pub legacy_column_present: bool,
    /// Rows whose branch was copied from the legacy column
    pub legacy_rows_copied: u64,
}

impl MigrationReport {
    /// True when the table was already current.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.added_columns.is_empty() && self.legacy_rows_copied == 0
    }
}

/// Something that can run DDL against the releases table.
#[async_trait]
pub(crate) trait SchemaTarget: Send + Sync {
    /// Execute one statement, returning rows affected.
    async fn execute_sql(&self, sql: &str) -> StorageResult<u64>;

    /// Column names of the releases table.
    async fn column_names(&self) -> StorageResult<Vec<String>>;
}

/// True when an error means the column is already there.
pub(crate) fn is_duplicate_column(err: &StorageError) -> bool {
    err.to_string().to_lowercase().contains("duplicate column")
}

/// Ensure the table exists and carries every optional column.
///
/// "Column already exists" is success; any other failure is fatal.
pub(crate) async fn migrate<T: SchemaTarget + ?Sized>(target: &T) -> StorageResult<MigrationReport> {
    target
        .execute_sql(CREATE_TABLE_SQL)
        .await
        .map_err(|e| StorageError::schema(format!("failed to create table: {e}")))?;

    let existing = target.column_names().await?;
    let has_column = |name: &str| existing.iter().any(|c| c.eq_ignore_ascii_case(name));

    let mut report = MigrationReport::default();

    for column in OPTIONAL_COLUMNS {
        if has_column(column.name) {
            continue;
        }
        match target.execute_sql(&column.add_column_sql()).await {
            Ok(_) => {
                tracing::info!(column = column.name, default = column.default, "Added missing column");
                report.added_columns.push(column.name);
            }
            Err(e) if is_duplicate_column(&e) => {
                tracing::debug!(column = column.name, "Column already present");
            }
            Err(e) => {
                return Err(StorageError::schema(format!(
                    "failed to add column {}: {e}",
                    column.name
                )));
            }
        }
    }

    if has_column(LEGACY_BRANCH_COLUMN) {
        report.legacy_column_present = true;
        let sql = if report.added_columns.contains(&"branch") {
            LEGACY_COPY_ALL_SQL
        } else {
            LEGACY_COPY_EMPTY_SQL
        };
        report.legacy_rows_copied = target
            .execute_sql(sql)
            .await
            .map_err(|e| StorageError::schema(format!("failed to migrate legacy branch: {e}")))?;
        if report.legacy_rows_copied > 0 {
            tracing::info!(
                rows = report.legacy_rows_copied,
                "Copied legacy {} into branch",
                LEGACY_BRANCH_COLUMN
            );
        }
    }

    Ok(report)
}

// =============================================================================
// Tests
// =============================================================================
