//! Schema self-healing against on-disk and remote legacy tables.

mod common;

use common::{FakeHrana, FAKE_TOKEN};
use relstore_core::{ReleaseStatus, ReleaseStore, RemoteStore, SqliteStore};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tempfile::TempDir;

const LEGACY_TABLE_SQL: &str = r#"
    CREATE TABLE releases (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        organization TEXT NOT NULL,
        appName TEXT NOT NULL,
        platform TEXT NOT NULL,
        version TEXT NOT NULL,
        buildNumber TEXT,
        uploadDate TEXT NOT NULL,
        additionalData TEXT
    )
"#;

async fn seed_legacy(pool: &SqlitePool) {
    sqlx::query(LEGACY_TABLE_SQL).execute(pool).await.unwrap();
    for (app, build, date) in [
        ("froggy-98", "release/1.4", "2024-01-01T00:00:00.000Z"),
        ("the-wolf", "", "2024-02-01T00:00:00.000Z"),
    ] {
        sqlx::query(
            "INSERT INTO releases (organization, appName, platform, version, buildNumber, uploadDate) \
             VALUES ('Legacy Org', ?, 'iOS', '1.0.0', ?, ?)",
        )
        .bind(app)
        .bind(build)
        .bind(date)
        .execute(pool)
        .await
        .unwrap();
    }
}

async fn file_pool(dir: &TempDir) -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("releases.db"))
        .create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_legacy_file_is_healed_once() {
    let dir = TempDir::new().unwrap();
    let pool = file_pool(&dir).await;
    seed_legacy(&pool).await;
    pool.close().await;

    let path = dir.path().join("releases.db");
    let store = SqliteStore::open(&path).await.unwrap();
    let report = store.migration_report().clone();
    assert_eq!(report.added_columns, vec!["status", "branch", "tag", "forceUpdate"]);
    assert!(report.legacy_column_present);
    assert_eq!(report.legacy_rows_copied, 1);

    let releases = store.get_all_releases().await.unwrap();
    assert_eq!(releases.len(), 2);
    let wolf = &releases[0];
    let froggy = &releases[1];
    assert_eq!(froggy.branch, "release/1.4");
    assert_eq!(wolf.branch, "main", "empty legacy value keeps the default");
    assert_eq!(froggy.status, ReleaseStatus::InReview);
    assert_eq!(froggy.tag, "general-release-untagged");
    assert_eq!(froggy.force_update, "No");
    store.close().await;

    let reopened = SqliteStore::open(&path).await.unwrap();
    assert!(reopened.migration_report().is_noop());
    assert_eq!(reopened.get_all_releases().await.unwrap(), releases);
}

#[tokio::test]
async fn test_existing_branch_only_fills_empty_values() {
    let dir = TempDir::new().unwrap();
    let pool = file_pool(&dir).await;
    seed_legacy(&pool).await;
    sqlx::query("ALTER TABLE releases ADD COLUMN branch TEXT")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE releases SET branch = 'hotfix' WHERE appName = 'froggy-98'")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let store = SqliteStore::open(dir.path().join("releases.db")).await.unwrap();
    assert!(!store.migration_report().added_columns.contains(&"branch"));

    let releases = store.get_all_releases().await.unwrap();
    let froggy = releases.iter().find(|r| r.app_name == "froggy-98").unwrap();
    assert_eq!(froggy.branch, "hotfix", "existing branch is never overwritten");
}

#[tokio::test]
async fn test_fresh_file_has_no_legacy_step() {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(dir.path().join("fresh.db")).await.unwrap();
    let report = store.migration_report();
    assert!(report.is_noop());
    assert!(!report.legacy_column_present);
}

#[tokio::test]
async fn test_remote_legacy_table_is_healed() {
    let pool = common::memory_pool().await;
    seed_legacy(&pool).await;
    let fake = FakeHrana::spawn_with_pool(pool).await;

    let store = RemoteStore::connect(&fake.url, FAKE_TOKEN).await.unwrap();
    assert_eq!(
        store.migration_report().added_columns,
        vec!["status", "branch", "tag", "forceUpdate"]
    );
    assert_eq!(store.migration_report().legacy_rows_copied, 1);

    let releases = store.get_all_releases().await.unwrap();
    let froggy = releases.iter().find(|r| r.app_name == "froggy-98").unwrap();
    assert_eq!(froggy.branch, "release/1.4");

    let again = RemoteStore::connect(&fake.url, FAKE_TOKEN).await.unwrap();
    assert!(again.migration_report().is_noop());
}
