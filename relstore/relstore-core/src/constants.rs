//! Constants - TigerStyle naming with units and bounds.
//!
//! Every literal the storage contract depends on lives here so that all three
//! backends agree on defaults byte-for-byte.

// =============================================================================
// Table
// =============================================================================

/// Name of the single releases table.
pub const RELEASES_TABLE: &str = "releases";

/// Legacy column that predates `branch`.
pub const LEGACY_BRANCH_COLUMN: &str = "buildNumber";

// =============================================================================
// Defaults
// =============================================================================

/// Default status for a newly created release.
pub const STATUS_DEFAULT: &str = "In Review";

/// Default branch applied to rows that predate the `branch` column.
pub const BRANCH_DEFAULT: &str = "main";

/// Default tag applied to rows that predate the `tag` column.
pub const TAG_DEFAULT: &str = "general-release-untagged";

/// Default force-update flag.
pub const FORCE_UPDATE_DEFAULT: &str = "No";

/// Organization used when an app name is not in the lookup table.
pub const ORGANIZATION_FALLBACK: &str = "Other";

// =============================================================================
// Limits
// =============================================================================

/// Maximum number of ids accepted by one bulk status update.
pub const BULK_IDS_COUNT_MAX: usize = 1_000;

/// Default page size for paginated views.
pub const PAGE_SIZE_DEFAULT: usize = 25;

/// Maximum page size for paginated views.
pub const PAGE_SIZE_MAX: usize = 500;

// =============================================================================
// Environment
// =============================================================================

/// Set to `production` for a production-like deployment.
pub const ENV_APP_ENV: &str = "RELBOARD_ENV";

/// Node-style production marker, honoured for parity with existing deploys.
pub const ENV_NODE_ENV: &str = "NODE_ENV";

/// Present on Netlify builds and functions.
pub const ENV_NETLIFY: &str = "NETLIFY";

/// Remote database URL (`libsql://` or `https://`).
pub const ENV_REMOTE_URL: &str = "TURSO_DATABASE_URL";

/// Remote database auth token.
pub const ENV_REMOTE_TOKEN: &str = "TURSO_AUTH_TOKEN";

/// Path of the local SQLite file.
pub const ENV_DB_PATH: &str = "RELBOARD_DB_PATH";

/// Explicit backend override (`sqlite`, `memory`, `remote`).
pub const ENV_BACKEND: &str = "RELBOARD_BACKEND";

/// Default local SQLite file.
pub const DB_PATH_DEFAULT: &str = "releases.db";

// =============================================================================
// Remote
// =============================================================================

/// Hrana-over-HTTP pipeline endpoint, relative to the database URL.
pub const REMOTE_PIPELINE_PATH: &str = "v2/pipeline";

/// Request timeout for one remote round trip in milliseconds.
pub const REMOTE_TIMEOUT_MS: u64 = 15_000;

/// SQLite connection pool size for the file backend.
pub const SQLITE_CONNECTIONS_MAX: u32 = 5;
