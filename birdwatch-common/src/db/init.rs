//! Database initialization
//!
//! Creates the database file and every table on first run. All statements
//! are idempotent, so calling [`init_database`] on an existing database is safe.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets map queries run while a tally insert is in flight
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_species_table(pool).await?;
    create_checklist_table(pool).await?;
    create_sightings_table(pool).await?;
    create_tally_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_species_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS species (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Sampling events; one row per `SAMPLING_EVENT_IDENTIFIER`
async fn create_checklist_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS checklist (
            id INTEGER PRIMARY KEY,
            SAMPLING_EVENT_IDENTIFIER TEXT NOT NULL UNIQUE,
            LATITUDE REAL NOT NULL,
            LONGITUDE REAL NOT NULL,
            OBSERVATION_DATE TEXT NOT NULL,
            TIME_OBSERVATIONS_STARTED TEXT,
            OBSERVER_ID TEXT,
            DURATION_MINUTES REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_checklist_location ON checklist(LATITUDE, LONGITUDE)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_checklist_date ON checklist(OBSERVATION_DATE)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Sightings reference checklist events by id; the reference is not enforced
async fn create_sightings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sightings (
            id INTEGER PRIMARY KEY,
            SAMPLING_EVENT_IDENTIFIER TEXT NOT NULL,
            COMMON_NAME TEXT NOT NULL,
            OBSERVATION_COUNT TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sightings_event ON sightings(SAMPLING_EVENT_IDENTIFIER)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sightings_name ON sightings(COMMON_NAME)")
        .execute(pool)
        .await?;

    Ok(())
}

/// User tally rows, independent of the bulk-imported tables
async fn create_tally_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS checklist_table (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_email TEXT NOT NULL,
            species_name TEXT NOT NULL,
            num_seen INTEGER NOT NULL DEFAULT 0,
            data TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_checklist_table_user ON checklist_table(user_email)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
