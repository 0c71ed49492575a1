//! User checklist (tally) endpoints
//!
//! Absent or foreign ids are not errors: the response message reports that
//! nothing changed.

use axum::{
    extract::{Path, State},
    Json,
};
use birdwatch_common::db::TallyRow;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::info;

use super::error::ApiError;
use super::identity::CurrentUser;
use crate::db::{delete_tally, insert_tallies, tallies_for_user, update_tally_data, NewTally};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ChecklistItem {
    #[serde(rename = "COMMON_NAME")]
    pub common_name: String,
    #[serde(rename = "numSeen", default, deserialize_with = "count_from_number_or_string")]
    pub num_seen: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubmitChecklistRequest {
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
}

#[derive(Debug, Serialize)]
pub struct SubmitChecklistResponse {
    pub message: String,
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct ChecklistsResponse {
    pub checklists: Vec<TallyRow>,
}

#[derive(Debug, Deserialize)]
pub struct EditChecklistRequest {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub data: Value,
}

/// Accept `3`, `"3"`, `""` or `null` for a tally count
fn count_from_number_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("numSeen must be an integer, got {}", n))),
        Value::String(s) if s.trim().is_empty() => Ok(0),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| D::Error::custom(format!("numSeen must be an integer, got {:?}", s))),
        other => Err(D::Error::custom(format!("numSeen must be an integer, got {}", other))),
    }
}

/// POST /submit_checklist
pub async fn submit_checklist(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<SubmitChecklistRequest>,
) -> Result<Json<SubmitChecklistResponse>, ApiError> {
    let tallies: Vec<NewTally> = request
        .checklist
        .into_iter()
        .map(|item| NewTally {
            species_name: item.common_name,
            num_seen: item.num_seen,
        })
        .collect();

    let ids = insert_tallies(&state.db, user.email(), &tallies).await?;
    info!("{} submitted a checklist with {} entries", user.email(), ids.len());

    Ok(Json(SubmitChecklistResponse {
        message: "Checklist submitted successfully".to_string(),
        ids,
    }))
}

/// GET /load_checklists
pub async fn load_checklists(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ChecklistsResponse>, ApiError> {
    let checklists = tallies_for_user(&state.db, user.email()).await?;
    Ok(Json(ChecklistsResponse { checklists }))
}

/// DELETE /delete_checklist/:id
pub async fn delete_checklist(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    if delete_tally(&state.db, user.email(), id).await? {
        info!("{} deleted checklist entry {}", user.email(), id);
        Ok(MessageResponse::new("Checklist deleted"))
    } else {
        Ok(MessageResponse::new("Checklist not deleted"))
    }
}

/// POST /edit_checklist
pub async fn edit_checklist(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<EditChecklistRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Some(id) = request.id else {
        return Ok(MessageResponse::new("Checklist not updated"));
    };

    if update_tally_data(&state.db, user.email(), id, &request.data).await? {
        info!("{} edited checklist entry {}", user.email(), id);
        Ok(MessageResponse::new("Checklist updated"))
    } else {
        Ok(MessageResponse::new("Checklist not updated"))
    }
}
