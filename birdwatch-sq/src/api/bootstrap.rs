//! Bulk table bootstrap endpoint

use axum::{extract::State, Json};

use super::error::ApiError;
use crate::bootstrap::{self, BootstrapReport};
use crate::AppState;

/// GET /my_callback
///
/// Loads any empty bulk table from its CSV file and reports per-table status.
/// Safe to call repeatedly.
pub async fn my_callback(State(state): State<AppState>) -> Result<Json<BootstrapReport>, ApiError> {
    let _guard = state.bootstrap_lock.lock().await;
    let report = bootstrap::run(&state.db, &state.bootstrap_dir).await?;
    Ok(Json(report))
}
