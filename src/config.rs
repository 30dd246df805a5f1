//! Server configuration.
//!
//! Read once from the environment (after `.env` is loaded), then overridden
//! by command-line flags.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use relstore_core::{BackendKind, Environment};

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Bind address variable
pub const ENV_BIND: &str = "RELBOARD_BIND";

/// Default HTTP bind address
pub const BIND_ADDRESS_DEFAULT: &str = "127.0.0.1:4321";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address
    pub bind: SocketAddr,

    /// Backend selection signals
    pub environment: Environment,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = lookup(ENV_BIND)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| BIND_ADDRESS_DEFAULT.to_string());
        let bind = bind
            .parse()
            .with_context(|| format!("invalid {ENV_BIND} address {bind:?}"))?;

        let environment = Environment::from_lookup(&lookup)?;

        Ok(Self { bind, environment })
    }

    #[must_use]
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    #[must_use]
    pub fn with_backend(mut self, kind: BackendKind) -> Self {
        self.environment = self.environment.with_backend_override(kind);
        self
    }

    /// Use a local database file. Implies the SQLite backend.
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.environment = self
            .environment
            .with_sqlite_path(path)
            .with_backend_override(BackendKind::Sqlite);
        self
    }
}
