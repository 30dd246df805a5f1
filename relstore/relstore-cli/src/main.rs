//! Relstore CLI
//!
//! Command-line interface for the release database.
//!
//! # Usage
//!
//! ```bash
//! # List releases, filtered and paged
//! relstore list --organization "Froggy Media" --page 2
//!
//! # Publish several releases at once
//! relstore set-status Published 4 5 6
//!
//! # Fill a fresh database with demo data
//! relstore --db demo.db seed --rng-seed 42
//!
//! # Copy rows out of a pre-branch database
//! relstore import-legacy --from ../backend/releases.db
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use relstore_core::clock::format_timestamp;
use relstore_core::organization::known_apps;
use relstore_core::{
    paginate, releases_to_csv, sort_releases, AdditionalData, BackendKind, BulkStatusRequest,
    Environment, ReleaseCreate, ReleaseFilter, ReleaseId, ReleaseService, ReleaseStatus,
    ReleaseSummary, SortDirection, SortField, StoreHandle,
};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;

// =============================================================================
// Constants
// =============================================================================

/// Platforms generated by `seed`.
const SEED_PLATFORMS: [&str; 2] = ["iOS", "Android"];

/// Versions generated per app and platform by `seed`.
const SEED_VERSIONS_PER_APP: u32 = 5;

/// Tags `seed` picks from.
const SEED_TAGS: [&str; 4] = [
    "general-release-untagged",
    "spring-campaign",
    "hotfix-round",
    "holiday-push",
];

/// Branches `seed` picks from.
const SEED_BRANCHES: [&str; 3] = ["main", "develop", "release"];

/// Prefix of the tag given to imported rows; the import date is appended.
const LEGACY_TAG_PREFIX: &str = "migrated-release-";

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(name = "relstore")]
#[command(about = "Relstore release database CLI", long_about = None)]
struct Cli {
    /// Local database file (implies --backend sqlite)
    #[arg(long, global = true, value_parser = parse_db_path)]
    db: Option<PathBuf>,

    /// Force a backend: sqlite, memory or remote
    #[arg(long, global = true, value_parser = parse_backend)]
    backend: Option<BackendKind>,

    /// Enable verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List releases
    List {
        #[arg(long)]
        organization: Option<String>,
        #[arg(long)]
        platform: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        /// Substring of the app name or version
        #[arg(long)]
        search: Option<String>,
        /// Field to sort on, e.g. appName or uploadDate
        #[arg(long, default_value = "uploadDate")]
        sort: String,
        /// asc or desc
        #[arg(long, default_value = "desc")]
        direction: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 0)]
        page_size: usize,
    },
    /// Print one release as JSON
    Get {
        id: ReleaseId,
    },
    /// Set the status of one or more releases
    SetStatus {
        /// In Review, Ready to publish or Published
        status: String,
        #[arg(required = true)]
        ids: Vec<ReleaseId>,
    },
    /// Delete a release
    Delete {
        id: ReleaseId,
    },
    /// Insert deterministic demo releases
    Seed {
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        rng_seed: u64,
    },
    /// Import rows from a database that predates the branch column
    ImportLegacy {
        /// Path of the old database
        #[arg(long)]
        from: PathBuf,
    },
    /// Write app names and versions as CSV
    ExportCsv {
        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn parse_backend(raw: &str) -> Result<BackendKind, String> {
    BackendKind::parse(raw).ok_or_else(|| format!("unknown backend {raw:?}"))
}

fn parse_db_path(raw: &str) -> Result<PathBuf, String> {
    if raw.trim().is_empty() {
        return Err("database path cannot be empty".to_string());
    }
    Ok(PathBuf::from(shellexpand::tilde(raw).as_ref()))
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut env = Environment::from_env()?;
    if let Some(kind) = cli.backend {
        env = env.with_backend_override(kind);
    }
    if let Some(db) = cli.db {
        env = env
            .with_sqlite_path(db)
            .with_backend_override(BackendKind::Sqlite);
    }
    let service = ReleaseService::new(StoreHandle::open(&env).await?);

    match cli.command {
        Commands::List {
            organization,
            platform,
            status,
            tag,
            search,
            sort,
            direction,
            page,
            page_size,
        } => {
            let filter = ReleaseFilter {
                organization,
                platform,
                status,
                tag,
                search,
            };
            let field = SortField::parse(&sort).with_context(|| format!("unknown sort field {sort:?}"))?;
            let direction = SortDirection::parse(&direction)
                .with_context(|| format!("unknown sort direction {direction:?}"))?;

            let mut releases = filter.apply(&service.list().await?);
            sort_releases(&mut releases, field, direction);
            let summary = ReleaseSummary::of(&releases);
            let page = paginate(&releases, page, page_size);

            for r in &page.items {
                println!(
                    "{:>5}  {:<20} {:<8} {:<12} {:<17} {:<28} {}",
                    r.id, r.app_name, r.platform, r.version, r.status.as_str(), r.tag, r.upload_date
                );
            }
            println!(
                "page {}/{} ({} releases, {} apps)",
                page.page, page.total_pages, summary.total, summary.apps
            );
            for (status, count) in &summary.by_status {
                println!("  {status}: {count}");
            }
        }
        Commands::Get { id } => match service.get(id).await? {
            Some(release) => println!("{}", serde_json::to_string_pretty(&release)?),
            None => bail!("release {id} not found"),
        },
        Commands::SetStatus { status, ids } => {
            let ids = ids.into_iter().map(serde_json::Value::from).collect();
            let outcome = service
                .bulk_update_status(&BulkStatusRequest::new(ids, &status))
                .await?;
            println!("{}", outcome.message());
        }
        Commands::Delete { id } => {
            if !service.delete(id).await? {
                bail!("release {id} not found");
            }
            println!("Deleted release {id}");
        }
        Commands::Seed { rng_seed } => {
            let created = seed(&service, rng_seed, Utc::now()).await?;
            println!("Seeded {created} releases (rng seed {rng_seed})");
        }
        Commands::ImportLegacy { from } => {
            let imported = import_legacy(&service, &from, Utc::now()).await?;
            println!("Imported {imported} releases from {}", from.display());
        }
        Commands::ExportCsv { out } => {
            let csv = releases_to_csv(&service.list().await?);
            match out {
                Some(path) => {
                    std::fs::write(&path, csv)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                None => println!("{csv}"),
            }
        }
    }

    Ok(())
}

// =============================================================================
// Seed
// =============================================================================

/// Demo releases for every known app on both mobile platforms. The same seed
/// and `now` always produce the same bodies.
fn seed_bodies(rng_seed: u64, now: DateTime<Utc>) -> Vec<ReleaseCreate> {
    let mut rng = ChaCha8Rng::seed_from_u64(rng_seed);
    let mut bodies = Vec::new();

    for app in known_apps() {
        let major = rng.gen_range(1..=4);
        for platform in SEED_PLATFORMS {
            for step in 0..SEED_VERSIONS_PER_APP {
                let weeks_ago = i64::from(SEED_VERSIONS_PER_APP - step);
                let status = ReleaseStatus::all()
                    .choose(&mut rng)
                    .copied()
                    .unwrap_or_default();
                let tag = SEED_TAGS.choose(&mut rng).copied().unwrap_or(SEED_TAGS[0]);
                let branch = SEED_BRANCHES
                    .choose(&mut rng)
                    .copied()
                    .unwrap_or(SEED_BRANCHES[0]);

                let mut data = AdditionalData::new();
                data.insert(
                    "notes".into(),
                    format!("Demo build {} for {app}", step + 1).into(),
                );
                data.insert(
                    "size".into(),
                    format!("{}.{} MB", rng.gen_range(20..120), rng.gen_range(0..10)).into(),
                );

                bodies.push(ReleaseCreate {
                    app_name: Some(app.to_string()),
                    platform: Some(platform.to_string()),
                    version: Some(format!("{major}.{step}.0")),
                    branch: Some(branch.to_string()),
                    status: Some(status.as_str().to_string()),
                    tag: Some(tag.to_string()),
                    upload_date: Some(format_timestamp(now - Duration::weeks(weeks_ago))),
                    force_update: Some(if rng.gen_bool(0.1) { "Yes" } else { "No" }.to_string()),
                    additional_data: Some(data),
                    ..ReleaseCreate::default()
                });
            }
        }
    }

    bodies
}

async fn seed(service: &ReleaseService, rng_seed: u64, now: DateTime<Utc>) -> anyhow::Result<usize> {
    let bodies = seed_bodies(rng_seed, now);
    let count = bodies.len();
    for body in bodies {
        service.create(body).await?;
    }
    tracing::info!(count, rng_seed, "Seeded demo releases");
    Ok(count)
}

// =============================================================================
// Legacy Import
// =============================================================================

/// A row of the pre-branch schema.
#[derive(Debug, sqlx::FromRow)]
#[sqlx(rename_all = "camelCase")]
struct LegacyRow {
    app_name: Option<String>,
    platform: Option<String>,
    version: Option<String>,
    build_number: Option<String>,
    upload_date: Option<String>,
    additional_data: Option<String>,
}

impl LegacyRow {
    fn into_body(self, tag: &str) -> ReleaseCreate {
        ReleaseCreate {
            app_name: self.app_name,
            platform: self.platform,
            version: self.version,
            branch: self.build_number,
            status: Some(ReleaseStatus::InReview.as_str().to_string()),
            tag: Some(tag.to_string()),
            upload_date: self.upload_date,
            additional_data: self.additional_data.as_deref().and_then(parse_legacy_data),
            ..ReleaseCreate::default()
        }
    }
}

/// Old rows store additionalData as JSON text; anything but an object is dropped.
fn parse_legacy_data(raw: &str) -> Option<AdditionalData> {
    match serde_json::from_str(raw) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn legacy_tag(now: DateTime<Utc>) -> String {
    format!("{LEGACY_TAG_PREFIX}{}", now.format("%Y-%m-%d"))
}

/// Copy every row of an old database through the validated create path.
/// Rows that fail validation are skipped and logged.
async fn import_legacy(service: &ReleaseService, from: &Path, now: DateTime<Utc>) -> anyhow::Result<usize> {
    if !from.exists() {
        bail!("legacy database {} does not exist", from.display());
    }
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", from.display()))?.read_only(true);
    let pool = SqlitePool::connect_with(options)
        .await
        .with_context(|| format!("failed to open {}", from.display()))?;

    let rows: Vec<LegacyRow> = sqlx::query_as(
        "SELECT CAST(appName AS TEXT) AS appName, CAST(platform AS TEXT) AS platform, \
         CAST(version AS TEXT) AS version, CAST(buildNumber AS TEXT) AS buildNumber, \
         CAST(uploadDate AS TEXT) AS uploadDate, CAST(additionalData AS TEXT) AS additionalData \
         FROM releases ORDER BY id",
    )
    .fetch_all(&pool)
    .await
    .context("failed to read legacy releases")?;
    pool.close().await;

    let tag = legacy_tag(now);
    let total = rows.len();
    let mut imported = 0;
    for row in rows {
        match service.create(row.into_body(&tag)).await {
            Ok(release) => {
                tracing::debug!(release_id = release.id, app = %release.app_name, "Imported legacy release");
                imported += 1;
            }
            Err(relstore_core::ServiceError::Validation(e)) => {
                tracing::warn!(error = %e, "Skipping legacy row");
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(imported, skipped = total - imported, %tag, "Legacy import finished");
    Ok(imported)
}

// =============================================================================
// Tests
// =============================================================================
