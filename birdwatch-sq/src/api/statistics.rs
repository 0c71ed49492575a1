//! Species statistics and search
//!
//! Only sightings with a positive numeric count take part; `"X"` counts
//! never surface a species here.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::ApiError;
use crate::db::{observation_dates as query_observation_dates, positive_species, ObservationDates, SortOrder};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CommonNamesResponse {
    pub common_names: Vec<String>,
}

/// Search filters, sent either at the top level or nested under `params`
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// Substring of the species name
    #[serde(default)]
    pub q: Option<String>,
    /// `"recent"` or `"old"`; anything else orders by name
    #[serde(default)]
    pub option: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(flatten)]
    pub top: SearchParams,
    #[serde(default)]
    pub params: Option<SearchParams>,
}

impl SearchRequest {
    /// Top-level fields win; `params` fills whichever is absent
    pub fn resolve(self) -> SearchParams {
        let nested = self.params.unwrap_or_default();
        SearchParams {
            q: self.top.q.or(nested.q),
            option: self.top.option.or(nested.option),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ObservationDatesRequest {
    #[serde(default)]
    pub common_name: Option<String>,
    #[serde(default, alias = "date")]
    pub observation_date: Option<String>,
}

/// GET /load_user_statistics
///
/// Every species with at least one positive count.
pub async fn load_user_statistics(
    State(state): State<AppState>,
) -> Result<Json<CommonNamesResponse>, ApiError> {
    let common_names = positive_species(&state.db, None, None).await?;
    Ok(Json(CommonNamesResponse { common_names }))
}

/// POST /search
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<CommonNamesResponse>, ApiError> {
    let request = request.resolve();
    let order = SortOrder::from_option(request.option.as_deref());
    let common_names = positive_species(&state.db, request.q.as_deref(), order).await?;

    info!(
        "Search q={:?} option={:?}: {} species",
        request.q,
        request.option,
        common_names.len()
    );
    Ok(Json(CommonNamesResponse { common_names }))
}

/// POST /observation_dates
///
/// A missing or empty `common_name` returns the empty result without a query.
pub async fn observation_dates(
    State(state): State<AppState>,
    Json(request): Json<ObservationDatesRequest>,
) -> Result<Json<ObservationDates>, ApiError> {
    let Some(common_name) = request.common_name.as_deref().filter(|n| !n.is_empty()) else {
        return Ok(Json(ObservationDates::default()));
    };

    let result =
        query_observation_dates(&state.db, common_name, request.observation_date.as_deref()).await?;
    Ok(Json(result))
}
