//! Species list for the checklist page

use axum::{extract::State, Json};
use birdwatch_common::db::Species;
use serde::Serialize;

use super::error::ApiError;
use crate::db::list_species;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SpeciesResponse {
    pub species: Vec<Species>,
}

/// GET /load_species
pub async fn load_species(State(state): State<AppState>) -> Result<Json<SpeciesResponse>, ApiError> {
    let species = list_species(&state.db).await?;
    Ok(Json(SpeciesResponse { species }))
}
