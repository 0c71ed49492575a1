//! birdwatch-sq library - Sighting Query service
//!
//! JSON endpoints behind the map, search and checklist pages: bounding-box
//! sighting lookup, species search, observation dates, user tallies and the
//! one-time CSV bootstrap.

use axum::Router;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod bootstrap;
pub mod db;
pub mod session;

use session::SessionStore;

/// Default idle lifetime of a session
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Per-session key/value storage
    pub sessions: SessionStore,
    /// Directory holding the bootstrap CSV files
    pub bootstrap_dir: PathBuf,
    /// Reject user routes without an `X-User-Email` header
    pub require_identity: bool,
    /// Serializes bootstrap runs so each CSV row is imported once
    pub bootstrap_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Create new application state with identity checks on
    pub fn new(db: SqlitePool, bootstrap_dir: PathBuf) -> Self {
        Self {
            db,
            sessions: SessionStore::new(DEFAULT_SESSION_TTL),
            bootstrap_dir,
            require_identity: true,
            bootstrap_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.sessions = SessionStore::new(ttl);
        self
    }

    pub fn with_require_identity(mut self, require: bool) -> Self {
        self.require_identity = require;
        self
    }
}

/// Build application router
///
/// User routes sit behind the identity middleware; health and bootstrap do not.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{delete, get, post};

    let user_routes = Router::new()
        .route("/get_bird_sightings", post(api::get_bird_sightings))
        .route("/save_coords", post(api::save_coords))
        .route("/drawn_coords", get(api::drawn_coords))
        .route("/load_species", get(api::load_species))
        .route("/submit_checklist", post(api::submit_checklist))
        .route("/load_checklists", get(api::load_checklists))
        .route("/delete_checklist/:id", delete(api::delete_checklist))
        .route("/edit_checklist", post(api::edit_checklist))
        .route("/load_user_statistics", get(api::load_user_statistics))
        .route("/search", post(api::search))
        .route("/observation_dates", post(api::observation_dates))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::identity_middleware,
        ));

    let public = Router::new()
        .route("/my_callback", get(api::my_callback))
        .merge(api::health_routes());

    Router::new()
        .merge(user_routes)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
