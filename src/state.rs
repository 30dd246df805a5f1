//! Shared handler state.

use relstore_core::{Environment, ReleaseService, StoreHandle};

/// State handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: ReleaseService,
    /// Signals the backend was chosen from, for diagnostics
    pub environment: Environment,
}

impl AppState {
    /// Open the selected backend once.
    pub async fn open(environment: Environment) -> anyhow::Result<Self> {
        let handle = StoreHandle::open(&environment).await?;
        Ok(Self::new(handle, environment))
    }

    #[must_use]
    pub fn new(handle: StoreHandle, environment: Environment) -> Self {
        Self {
            service: ReleaseService::new(handle),
            environment,
        }
    }
}
