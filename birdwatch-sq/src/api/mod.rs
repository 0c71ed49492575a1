//! HTTP API handlers for birdwatch-sq

pub mod bootstrap;
pub mod checklists;
pub mod error;
pub mod health;
pub mod identity;
pub mod sightings;
pub mod species;
pub mod statistics;

pub use bootstrap::my_callback;
pub use checklists::{delete_checklist, edit_checklist, load_checklists, submit_checklist};
pub use error::ApiError;
pub use health::health_routes;
pub use identity::{identity_middleware, CurrentUser};
pub use sightings::{drawn_coords, get_bird_sightings, save_coords};
pub use species::load_species;
pub use statistics::{load_user_statistics, observation_dates, search};
