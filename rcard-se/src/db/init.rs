//! Database connection and schema initialization
//!
//! Schema creation is idempotent; every table uses CREATE TABLE IF NOT
//! EXISTS so startup can run against a fresh or existing database.

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the engine database at the given path
pub async fn connect(db_path: &Path) -> Result<Pool<Sqlite>> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    info!("Connected to database at {}", db_path.display());
    Ok(pool)
}

/// Create all engine tables if they do not exist
pub async fn init_schema(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bouts (
            bout_id TEXT PRIMARY KEY,
            red_fighter TEXT NOT NULL,
            blue_fighter TEXT NOT NULL,
            scheduled_rounds INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Append-only event log; seq is monotonic within (bout_id, round_number)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS round_events (
            bout_id TEXT NOT NULL,
            round_number INTEGER NOT NULL,
            seq INTEGER NOT NULL,
            corner TEXT NOT NULL,
            kind TEXT NOT NULL,
            confidence REAL,
            source TEXT NOT NULL,
            occurred_at TEXT NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            PRIMARY KEY (bout_id, round_number, seq)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rounds (
            bout_id TEXT NOT NULL,
            round_number INTEGER NOT NULL,
            state TEXT NOT NULL DEFAULT 'OPEN',
            lock_seq INTEGER,
            score TEXT,
            closed_by TEXT,
            close_reason TEXT,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (bout_id, round_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tuning_profiles (
            name TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            profile TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recompute_jobs (
            job_id TEXT PRIMARY KEY,
            scope TEXT NOT NULL,
            status TEXT NOT NULL,
            rows_updated INTEGER NOT NULL DEFAULT 0,
            error TEXT,
            started_at TEXT NOT NULL,
            finished_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Full startup initialization: schema, settings defaults, built-in profiles
pub async fn init_database(pool: &Pool<Sqlite>) -> Result<()> {
    init_schema(pool).await?;
    super::settings::init_settings_defaults(pool).await?;
    super::profiles::seed_builtin_profiles(pool).await?;
    Ok(())
}
