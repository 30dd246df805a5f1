//! Storage - Backend Trait and Implementations
//!
//! TigerStyle: one contract, three interchangeable backends.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ReleaseStore Trait                       │
//! └─────────────────────────────────────────────────────────────┘
//!        ↑                     ↑                     ↑
//!        │                     │                     │
//! ┌──────┴──────┐      ┌───────┴──────┐      ┌───────┴──────┐
//! │ SqliteStore │      │ MemoryStore  │      │ RemoteStore  │
//! │ (local dev) │      │ (no creds)   │      │ (production) │
//! └─────────────┘      └──────────────┘      └──────────────┘
//! ```
//!
//! The SQL backends share one schema module and one row mapper, so legacy
//! defaults and migration steps are identical between them.

mod backend;
mod error;
mod memory;
mod row;
mod schema;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "remote")]
mod remote;

pub use backend::{newest_first, BackendKind, ReleaseStore};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use schema::{MigrationReport, OptionalColumn, CREATE_TABLE_SQL, OPTIONAL_COLUMNS};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

#[cfg(feature = "remote")]
pub use remote::{pipeline_url, RemoteStore};
