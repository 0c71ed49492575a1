//! # Birdwatch Common Library
//!
//! Shared code for the birdwatch services:
//! - Database initialization and row models
//! - Configuration loading and root folder resolution
//! - Observation count parsing
//! - Error types

pub mod config;
pub mod db;
pub mod error;
pub mod observation;

pub use error::{Error, Result};
pub use observation::parse_intensity;
