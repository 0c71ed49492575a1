//! Tests for the CSV bootstrap loader
//!
//! - Each CSV row is inserted exactly once across repeated runs
//! - Header rows and malformed rows are skipped
//! - Missing files are reported, not fatal
//! - GET /my_callback reports per-table status

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use birdwatch_common::db::init_database;
use birdwatch_sq::bootstrap::{self, LoadStatus, CHECKLIST_CSV, SIGHTINGS_CSV, SPECIES_CSV};
use birdwatch_sq::{build_router, AppState};
use serde_json::Value;
use sqlx::SqlitePool;
use std::path::Path;
use tempfile::TempDir;
use tower::util::ServiceExt;

async fn setup_test_db(dir: &Path) -> SqlitePool {
    init_database(&dir.join("birdwatch.db"))
        .await
        .expect("Should create test database")
}

fn write_csvs(dir: &Path) {
    std::fs::write(dir.join(SPECIES_CSV), "name\nAmerican Robin\nBlue Jay\n\"Duck, Mallard\"\n").unwrap();
    std::fs::write(
        dir.join(SIGHTINGS_CSV),
        "SAMPLING_EVENT_IDENTIFIER,COMMON_NAME,OBSERVATION_COUNT\n\
         S1,American Robin,5\n\
         S1,Blue Jay,X\n\
         S2,American Robin,2\n\
         broken-row\n",
    )
    .unwrap();
    std::fs::write(
        dir.join(CHECKLIST_CSV),
        "S1,36.97,-122.03,2023-04-01,07:30:00,obs1,45\r\n\
         S2,37.10,-122.10,2023-05-02\r\n\
         S3,not-a-number,-122.10,2023-05-02\r\n",
    )
    .unwrap();
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_bootstrap_loads_empty_tables() {
    let dir = TempDir::new().unwrap();
    write_csvs(dir.path());
    let pool = setup_test_db(dir.path()).await;

    let report = bootstrap::run(&pool, dir.path()).await.unwrap();

    assert_eq!(report.species.status, LoadStatus::Loaded);
    assert_eq!(report.species.inserted, 3);
    assert_eq!(report.species.sample.as_ref().unwrap()["name"], "American Robin");

    assert_eq!(report.sightings.status, LoadStatus::Loaded);
    assert_eq!(report.sightings.inserted, 3);
    assert_eq!(report.sightings.skipped_rows, 1);

    assert_eq!(report.checklist.status, LoadStatus::Loaded);
    assert_eq!(report.checklist.inserted, 2);
    assert_eq!(report.checklist.skipped_rows, 1);
    assert_eq!(report.checklist.total, 2);

    let sample = report.checklist.sample.unwrap();
    assert_eq!(sample["SAMPLING_EVENT_IDENTIFIER"], "S1");
    assert_eq!(sample["OBSERVER_ID"], "obs1");
    assert_eq!(sample["DURATION_MINUTES"], 45.0);

    let quoted: Option<String> = sqlx::query_scalar("SELECT name FROM species WHERE name LIKE 'Duck%'")
        .fetch_optional(&pool)
        .await
        .unwrap();
    assert_eq!(quoted.as_deref(), Some("Duck, Mallard"));
}

#[tokio::test]
async fn test_bootstrap_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write_csvs(dir.path());
    let pool = setup_test_db(dir.path()).await;

    bootstrap::run(&pool, dir.path()).await.unwrap();
    let second = bootstrap::run(&pool, dir.path()).await.unwrap();

    assert_eq!(second.species.status, LoadStatus::Skipped);
    assert_eq!(second.sightings.status, LoadStatus::Skipped);
    assert_eq!(second.checklist.status, LoadStatus::Skipped);
    assert_eq!(second.sightings.inserted, 0);

    assert_eq!(count(&pool, "species").await, 3);
    assert_eq!(count(&pool, "sightings").await, 3);
    assert_eq!(count(&pool, "checklist").await, 2);
}

#[tokio::test]
async fn test_bootstrap_missing_files() {
    let dir = TempDir::new().unwrap();
    let pool = setup_test_db(dir.path()).await;
    std::fs::write(dir.path().join(SPECIES_CSV), "Barn Owl\n").unwrap();

    let report = bootstrap::run(&pool, dir.path()).await.unwrap();

    // No header row: the first line is data
    assert_eq!(report.species.status, LoadStatus::Loaded);
    assert_eq!(report.species.total, 1);
    assert_eq!(report.sightings.status, LoadStatus::Missing);
    assert_eq!(report.checklist.status, LoadStatus::Missing);
    assert!(report.checklist.sample.is_none());
}

#[tokio::test]
async fn test_bootstrap_skips_only_empty_tables() {
    let dir = TempDir::new().unwrap();
    write_csvs(dir.path());
    let pool = setup_test_db(dir.path()).await;
    sqlx::query("INSERT INTO species (name) VALUES ('Preloaded')")
        .execute(&pool)
        .await
        .unwrap();

    let report = bootstrap::run(&pool, dir.path()).await.unwrap();

    assert_eq!(report.species.status, LoadStatus::Skipped);
    assert_eq!(report.species.total, 1);
    assert_eq!(report.sightings.status, LoadStatus::Loaded);
}

#[tokio::test]
async fn test_my_callback_endpoint() {
    let dir = TempDir::new().unwrap();
    write_csvs(dir.path());
    let pool = setup_test_db(dir.path()).await;
    let app = build_router(AppState::new(pool.clone(), dir.path().to_path_buf()));

    for expected in ["loaded", "skipped"] {
        let request = Request::builder()
            .uri("/my_callback")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["species"]["status"], expected);
        assert_eq!(body["sightings"]["total"], 3);
        assert_eq!(body["checklist"]["sample"]["LATITUDE"], 36.97);
    }

    assert_eq!(count(&pool, "sightings").await, 3);
}

#[tokio::test]
async fn test_bootstrap_quoted_line_break_skips_both_halves() {
    let dir = TempDir::new().unwrap();
    let pool = setup_test_db(dir.path()).await;
    std::fs::write(
        dir.path().join(SIGHTINGS_CSV),
        "S1,American Robin,5\nS2,\"Blue\nJay\",3\nS3,Osprey,1\n",
    )
    .unwrap();

    let report = bootstrap::run(&pool, dir.path()).await.unwrap();

    assert_eq!(report.sightings.status, LoadStatus::Loaded);
    assert_eq!(report.sightings.inserted, 2);
    assert_eq!(report.sightings.skipped_rows, 2);
    assert_eq!(count(&pool, "sightings").await, 2);
}
