//! Query layer for the sighting service
//!
//! Schema creation lives in `birdwatch_common::db`; this module only reads
//! and writes rows.

pub mod sightings;
pub mod tallies;

pub use sightings::{
    list_species, observation_dates, positive_species, sightings_in_box, BoundingBox,
    Coordinates, MapSighting, ObservationDates, SortOrder,
};
pub use tallies::{delete_tally, insert_tallies, tallies_for_user, update_tally_data, NewTally};
