//! Relstore Core - release records and their storage
//!
//! TigerStyle: one storage contract, explicit selection, validated inputs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            ReleaseService (access API)       │
//! │   validation → StoreHandle (chosen once)     │
//! ├─────────────────────────────────────────────┤
//! │  SqliteStore   │ local file, sqlx            │
//! │  MemoryStore   │ process lifetime            │
//! │  RemoteStore   │ hosted libSQL over HTTP     │
//! ├─────────────────────────────────────────────┤
//! │  Views / CSV   │ pure functions over lists   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use relstore_core::{Environment, ReleaseCreate, ReleaseService, StoreHandle};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let env = Environment::from_env()?;
//! let service = ReleaseService::new(StoreHandle::open(&env).await?);
//!
//! let created = service
//!     .create(ReleaseCreate {
//!         app_name: Some("froggy-98".into()),
//!         platform: Some("iOS".into()),
//!         version: Some("1.0.0".into()),
//!         branch: Some("main".into()),
//!         tag: Some("launch".into()),
//!         ..ReleaseCreate::default()
//!     })
//!     .await?;
//! assert_eq!(created.organization, "Froggy Media");
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod constants;
pub mod export;
pub mod organization;
pub mod release;
pub mod selector;
pub mod service;
pub mod storage;
pub mod validation;
pub mod view;

// Re-export common types
pub use clock::{Clock, SimClock, SystemClock};
pub use export::releases_to_csv;
pub use organization::organization_for_app;
pub use release::{
    AdditionalData, NewRelease, Release, ReleaseCreate, ReleaseId, ReleasePatch, ReleaseStatus,
    ReleaseUpdate,
};
pub use selector::{select_backend, Environment, RemoteCredentials, SelectorError, StoreHandle};
pub use service::{BulkStatusRequest, BulkUpdateOutcome, ReleaseService, ServiceError};
pub use storage::{BackendKind, MemoryStore, ReleaseStore, StorageError, StorageResult};
pub use validation::ValidationError;
pub use view::{
    group_by_tag, paginate, sort_releases, Page, ReleaseFilter, ReleaseSummary, SortDirection,
    SortField, TagGroup,
};

#[cfg(feature = "sqlite")]
pub use storage::SqliteStore;

#[cfg(feature = "remote")]
pub use storage::RemoteStore;
