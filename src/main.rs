//! Relboard - release dashboard API server
//!
//! Serves the release CRUD, bulk status, grouped view, CSV export and health
//! endpoints over one backend chosen at start-up.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use relboard::{router, AppState, Config, APP_NAME, APP_VERSION};
use relstore_core::BackendKind;

// =============================================================================
// CLI
// =============================================================================

/// Relboard - release dashboard API server
#[derive(Parser, Debug)]
#[command(name = APP_NAME)]
#[command(about = "Release dashboard API over SQLite, memory or hosted libSQL")]
#[command(version)]
struct Cli {
    /// HTTP bind address (overrides RELBOARD_BIND)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Force a backend: sqlite, memory or remote
    #[arg(long, value_parser = parse_backend)]
    backend: Option<BackendKind>,

    /// Local database file (implies --backend sqlite)
    #[arg(long)]
    db: Option<String>,
}

fn parse_backend(raw: &str) -> Result<BackendKind, String> {
    BackendKind::parse(raw).ok_or_else(|| format!("unknown backend {raw:?}"))
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "info,tower_http=debug",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    tracing::info!("{} v{}", APP_NAME, APP_VERSION);

    let mut config = Config::from_env()?;
    if let Some(bind) = cli.bind {
        config = config.with_bind(bind);
    }
    if let Some(kind) = cli.backend {
        config = config.with_backend(kind);
    }
    if let Some(db) = cli.db.as_deref() {
        config = config.with_db_path(shellexpand::tilde(db).to_string());
    }

    let state = AppState::open(config.environment.clone())
        .await
        .context("failed to open release store")?;
    tracing::info!(backend = %state.service.backend(), "Release store ready");

    let app = router(Arc::new(state));

    tracing::info!("Starting HTTP server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
