//! Relboard - release dashboard API
//!
//! Tracks mobile and web app releases across organizations. All data access
//! goes through [`relstore_core::ReleaseService`] over a backend chosen once
//! at start-up.

pub mod api;
pub mod config;
pub mod error;
pub mod state;

pub use api::router;
pub use config::Config;
pub use error::ApiError;
pub use state::AppState;

/// Application name
pub const APP_NAME: &str = "relboard";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
