//! Tests for database initialization
//!
//! - Database file created on first run
//! - Reopening an existing database is safe
//! - Every table the service queries exists

use birdwatch_common::db::init::{init_database, SCHEMA_VERSION};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("birdwatch.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("birdwatch.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO species (name) VALUES ('American Robin')")
        .execute(&pool1)
        .await
        .unwrap();
    pool1.close().await;

    // Second open must keep existing rows
    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.as_ref().err());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM species")
        .fetch_one(&pool2.unwrap())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_all_tables_created() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("birdwatch.db")).await.unwrap();

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for expected in ["checklist", "checklist_table", "schema_version", "sightings", "species"] {
        assert!(
            tables.iter().any(|t| t == expected),
            "missing table {} (found {:?})",
            expected,
            tables
        );
    }
}

#[tokio::test]
async fn test_schema_version_recorded_once() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("birdwatch.db");

    init_database(&db_path).await.unwrap().close().await;
    let pool = init_database(&db_path).await.unwrap();

    let versions: Vec<i64> = sqlx::query_scalar("SELECT version FROM schema_version")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(versions, vec![SCHEMA_VERSION]);
}

#[tokio::test]
async fn test_event_identifier_is_unique() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("birdwatch.db")).await.unwrap();

    let insert = "INSERT INTO checklist (SAMPLING_EVENT_IDENTIFIER, LATITUDE, LONGITUDE, OBSERVATION_DATE)
                  VALUES ('S1', 1.0, 2.0, '2020-01-01')";
    sqlx::query(insert).execute(&pool).await.unwrap();
    let duplicate = sqlx::query(insert).execute(&pool).await;

    assert!(duplicate.is_err(), "duplicate event id should violate UNIQUE");
}
