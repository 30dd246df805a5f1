//! Backend selection.
//!
//! TigerStyle: decide once, at start-up, from an explicit snapshot of the
//! environment. Nothing re-probes the environment after [`StoreHandle::open`].
//!
//! | production-like | remote credentials | backend |
//! |-----------------|--------------------|---------|
//! | yes             | yes                | remote  |
//! | yes             | no                 | memory  |
//! | no              | any                | sqlite  |
//!
//! An explicit override beats the table.

use std::path::PathBuf;
use std::sync::Arc;

use crate::constants::{
    DB_PATH_DEFAULT, ENV_APP_ENV, ENV_BACKEND, ENV_DB_PATH, ENV_NETLIFY, ENV_NODE_ENV,
    ENV_REMOTE_TOKEN, ENV_REMOTE_URL,
};
use crate::storage::{BackendKind, MemoryStore, ReleaseStore, StorageError};

// =============================================================================
// Errors
// =============================================================================

/// Failure to pick or open a backend.
#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    #[error("unknown backend {value:?} (expected sqlite, memory or remote)")]
    UnknownBackend { value: String },

    #[error("remote backend requires {} and {}", ENV_REMOTE_URL, ENV_REMOTE_TOKEN)]
    MissingCredentials,

    #[error("{0} backend is not compiled in")]
    NotCompiled(BackendKind),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

// =============================================================================
// Environment
// =============================================================================

/// URL and token for the hosted database.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteCredentials {
    pub url: String,
    pub auth_token: String,
}

impl std::fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("url", &self.url)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

/// Snapshot of every signal the selector reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Running as a production-like deployment
    pub production_like: bool,
    /// Both remote URL and token present and non-empty
    pub remote: Option<RemoteCredentials>,
    /// Remote URL present, even without a token (diagnostics only)
    pub has_remote_url: bool,
    /// Remote token present, even without a URL (diagnostics only)
    pub has_remote_token: bool,
    /// Local database file, `~` already expanded
    pub sqlite_path: PathBuf,
    /// Explicit backend choice
    pub backend_override: Option<BackendKind>,
}

impl Environment {
    /// Read the process environment.
    ///
    /// # Errors
    /// Returns error if the backend override names an unknown backend.
    pub fn from_env() -> Result<Self, SelectorError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SelectorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let is_production = |key: &str| {
            get(key).is_some_and(|v| v.trim().eq_ignore_ascii_case("production"))
        };
        let production_like =
            is_production(ENV_APP_ENV) || is_production(ENV_NODE_ENV) || get(ENV_NETLIFY).is_some();

        let url = get(ENV_REMOTE_URL);
        let token = get(ENV_REMOTE_TOKEN);
        let has_remote_url = url.is_some();
        let has_remote_token = token.is_some();
        let remote = match (url, token) {
            (Some(url), Some(auth_token)) => Some(RemoteCredentials { url, auth_token }),
            _ => None,
        };

        let raw_path = get(ENV_DB_PATH).unwrap_or_else(|| DB_PATH_DEFAULT.to_string());
        let sqlite_path = PathBuf::from(shellexpand::tilde(&raw_path).into_owned());

        let backend_override = get(ENV_BACKEND)
            .map(|value| {
                BackendKind::parse(&value).ok_or(SelectorError::UnknownBackend { value })
            })
            .transpose()?;

        Ok(Self {
            production_like,
            remote,
            has_remote_url,
            has_remote_token,
            sqlite_path,
            backend_override,
        })
    }

    /// Development defaults: local file, no remote, no override.
    #[must_use]
    pub fn local(sqlite_path: impl Into<PathBuf>) -> Self {
        Self {
            production_like: false,
            remote: None,
            has_remote_url: false,
            has_remote_token: false,
            sqlite_path: sqlite_path.into(),
            backend_override: None,
        }
    }

    #[must_use]
    pub fn with_backend_override(mut self, kind: BackendKind) -> Self {
        self.backend_override = Some(kind);
        self
    }

    #[must_use]
    pub fn with_sqlite_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sqlite_path = path.into();
        self
    }
}

/// Pure decision table.
#[must_use]
pub fn select_backend(env: &Environment) -> BackendKind {
    if let Some(kind) = env.backend_override {
        return kind;
    }
    match (env.production_like, env.remote.is_some()) {
        (true, true) => BackendKind::Remote,
        (true, false) => BackendKind::Memory,
        (false, _) => BackendKind::Sqlite,
    }
}

// =============================================================================
// StoreHandle
// =============================================================================

/// The selected backend. Immutable and cheap to clone.
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<dyn ReleaseStore>,
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("kind", &self.kind())
            .finish()
    }
}

impl StoreHandle {
    /// Select and open the backend for `env`.
    ///
    /// # Errors
    /// Returns error if the chosen backend cannot be opened or migrated.
    /// There is no fallback to another backend.
    pub async fn open(env: &Environment) -> Result<Self, SelectorError> {
        let kind = select_backend(env);
        tracing::info!(
            backend = %kind,
            production_like = env.production_like,
            has_remote_url = env.has_remote_url,
            has_remote_token = env.has_remote_token,
            "Selecting storage backend"
        );

        let store: Arc<dyn ReleaseStore> = match kind {
            BackendKind::Memory => Arc::new(MemoryStore::new()),
            BackendKind::Sqlite => open_sqlite(env).await?,
            BackendKind::Remote => open_remote(env).await?,
        };

        // Postcondition
        assert_eq!(store.kind(), kind, "opened backend must match selection");
        Ok(Self { store })
    }

    /// Wrap an already-constructed store.
    #[must_use]
    pub fn from_store(store: Arc<dyn ReleaseStore>) -> Self {
        Self { store }
    }

    /// The store every operation goes through.
    #[must_use]
    pub fn store(&self) -> &dyn ReleaseStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn kind(&self) -> BackendKind {
        self.store.kind()
    }
}

#[cfg(feature = "sqlite")]
async fn open_sqlite(env: &Environment) -> Result<Arc<dyn ReleaseStore>, SelectorError> {
    let store = crate::storage::SqliteStore::open(&env.sqlite_path).await?;
    let report = store.migration_report();
    if !report.is_noop() {
        tracing::info!(
            added = ?report.added_columns,
            legacy_rows = report.legacy_rows_copied,
            "Migrated local database"
        );
    }
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite"))]
async fn open_sqlite(_env: &Environment) -> Result<Arc<dyn ReleaseStore>, SelectorError> {
    Err(SelectorError::NotCompiled(BackendKind::Sqlite))
}

#[cfg(feature = "remote")]
async fn open_remote(env: &Environment) -> Result<Arc<dyn ReleaseStore>, SelectorError> {
    let creds = env.remote.as_ref().ok_or(SelectorError::MissingCredentials)?;
    let store = crate::storage::RemoteStore::connect(&creds.url, &creds.auth_token).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "remote"))]
async fn open_remote(_env: &Environment) -> Result<Arc<dyn ReleaseStore>, SelectorError> {
    Err(SelectorError::NotCompiled(BackendKind::Remote))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Environment::from_lookup(|key| map.get(key).cloned()).unwrap()
    }

    #[test]
    fn test_development_selects_sqlite() {
        let env = env(&[]);
        assert!(!env.production_like);
        assert_eq!(env.sqlite_path, PathBuf::from("releases.db"));
        assert_eq!(select_backend(&env), BackendKind::Sqlite);
    }

    #[test]
    fn test_development_with_credentials_still_sqlite() {
        let env = env(&[(ENV_REMOTE_URL, "libsql://x"), (ENV_REMOTE_TOKEN, "t")]);
        assert_eq!(select_backend(&env), BackendKind::Sqlite);
    }

    #[test]
    fn test_production_with_credentials_selects_remote() {
        let env = env(&[
            (ENV_NODE_ENV, "production"),
            (ENV_REMOTE_URL, "libsql://x"),
            (ENV_REMOTE_TOKEN, "t"),
        ]);
        assert_eq!(select_backend(&env), BackendKind::Remote);
    }

    #[test]
    fn test_production_without_token_selects_memory() {
        let env = env(&[(ENV_NETLIFY, "true"), (ENV_REMOTE_URL, "libsql://x")]);
        assert!(env.has_remote_url);
        assert!(!env.has_remote_token);
        assert_eq!(select_backend(&env), BackendKind::Memory);
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let env = env(&[(ENV_APP_ENV, "production"), (ENV_REMOTE_URL, ""), (ENV_REMOTE_TOKEN, "t")]);
        assert!(env.remote.is_none());
        assert_eq!(select_backend(&env), BackendKind::Memory);
    }

    #[test]
    fn test_override_wins() {
        let env = env(&[(ENV_NODE_ENV, "production"), (ENV_BACKEND, "sqlite")]);
        assert_eq!(select_backend(&env), BackendKind::Sqlite);
    }

    #[test]
    fn test_unknown_override_is_error() {
        let err = Environment::from_lookup(|key| (key == ENV_BACKEND).then(|| "mongo".to_string()))
            .unwrap_err();
        assert!(matches!(err, SelectorError::UnknownBackend { .. }));
    }

    #[test]
    fn test_tilde_is_expanded() {
        let env = env(&[(ENV_DB_PATH, "~/releases.db")]);
        assert!(!env.sqlite_path.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let creds = RemoteCredentials {
            url: "libsql://x".into(),
            auth_token: "secret".into(),
        };
        assert!(!format!("{creds:?}").contains("secret"));
    }

    #[tokio::test]
    async fn test_open_memory() {
        let env = Environment::local("unused.db").with_backend_override(BackendKind::Memory);
        let handle = StoreHandle::open(&env).await.unwrap();
        assert_eq!(handle.kind(), BackendKind::Memory);
    }

    #[tokio::test]
    async fn test_remote_override_without_credentials_fails() {
        let env = Environment::local("unused.db").with_backend_override(BackendKind::Remote);
        let err = StoreHandle::open(&env).await.unwrap_err();
        assert!(matches!(
            err,
            SelectorError::MissingCredentials | SelectorError::NotCompiled(_)
        ));
    }
}
