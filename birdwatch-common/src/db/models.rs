//! Database models
//!
//! Bulk-imported tables keep the upper-case eBird column names so the CSV
//! exports load without renaming; JSON output uses the same names.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Species {
    pub id: i64,
    pub name: String,
}

/// One species-count record attached to a sampling event
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sighting {
    pub id: i64,
    #[serde(rename = "SAMPLING_EVENT_IDENTIFIER")]
    #[sqlx(rename = "SAMPLING_EVENT_IDENTIFIER")]
    pub sampling_event_identifier: String,
    #[serde(rename = "COMMON_NAME")]
    #[sqlx(rename = "COMMON_NAME")]
    pub common_name: String,
    /// Decimal integer or "X"; see [`crate::parse_intensity`]
    #[serde(rename = "OBSERVATION_COUNT")]
    #[sqlx(rename = "OBSERVATION_COUNT")]
    pub observation_count: String,
}

/// One observation session at a location and time
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChecklistEvent {
    pub id: i64,
    #[serde(rename = "SAMPLING_EVENT_IDENTIFIER")]
    #[sqlx(rename = "SAMPLING_EVENT_IDENTIFIER")]
    pub sampling_event_identifier: String,
    #[serde(rename = "LATITUDE")]
    #[sqlx(rename = "LATITUDE")]
    pub latitude: f64,
    #[serde(rename = "LONGITUDE")]
    #[sqlx(rename = "LONGITUDE")]
    pub longitude: f64,
    #[serde(rename = "OBSERVATION_DATE")]
    #[sqlx(rename = "OBSERVATION_DATE")]
    pub observation_date: String,
    #[serde(rename = "TIME_OBSERVATIONS_STARTED")]
    #[sqlx(rename = "TIME_OBSERVATIONS_STARTED")]
    pub time_observations_started: Option<String>,
    #[serde(rename = "OBSERVER_ID")]
    #[sqlx(rename = "OBSERVER_ID")]
    pub observer_id: Option<String>,
    #[serde(rename = "DURATION_MINUTES")]
    #[sqlx(rename = "DURATION_MINUTES")]
    pub duration_minutes: Option<f64>,
}

/// User-authored per-species count entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TallyRow {
    pub id: i64,
    pub user_email: String,
    pub species_name: String,
    pub num_seen: i64,
    /// Free-form payload replaced wholesale by edits
    pub data: Option<Json<serde_json::Value>>,
    pub created_at: String,
}
