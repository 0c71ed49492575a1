//! Map endpoints
//!
//! - POST /get_bird_sightings: sightings inside the visible map box
//! - POST /save_coords: remember the polygon the user drew
//! - GET /drawn_coords: read that polygon back

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::error::ApiError;
use crate::db::{sightings_in_box, BoundingBox, MapSighting};
use crate::session::{SessionToken, DRAWN_COORDINATES_KEY};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SightingsResponse {
    pub sightings: Vec<MapSighting>,
}

/// POST /get_bird_sightings
///
/// Body: `{north, south, east, west}`. An empty box returns an empty list.
pub async fn get_bird_sightings(
    State(state): State<AppState>,
    Json(bbox): Json<BoundingBox>,
) -> Result<Json<SightingsResponse>, ApiError> {
    let sightings = sightings_in_box(&state.db, &bbox).await?;
    info!(
        "Loaded {} sightings for box N{} S{} E{} W{}",
        sightings.len(),
        bbox.north,
        bbox.south,
        bbox.east,
        bbox.west
    );

    Ok(Json(SightingsResponse { sightings }))
}

#[derive(Debug, Deserialize)]
pub struct SaveCoordsRequest {
    /// `[{lat, lng}, ...]` as drawn on the map; stored verbatim
    #[serde(default)]
    pub drawing_coords: Value,
}

/// POST /save_coords
pub async fn save_coords(
    State(state): State<AppState>,
    session: SessionToken,
    Json(request): Json<SaveCoordsRequest>,
) -> Response {
    state
        .sessions
        .insert(&session.token, DRAWN_COORDINATES_KEY, request.drawing_coords)
        .await;
    debug!("Saved drawn coordinates for session {}", session.token);

    session.attach("Coordinates saved successfully.".into_response())
}

/// GET /drawn_coords
///
/// Returns `[]` when the session has not drawn anything yet.
pub async fn drawn_coords(State(state): State<AppState>, session: SessionToken) -> Response {
    let coords = state
        .sessions
        .get(&session.token, DRAWN_COORDINATES_KEY)
        .await
        .unwrap_or_else(|| json!([]));

    session.attach(Json(json!({ "drawn_coordinates": coords })).into_response())
}
