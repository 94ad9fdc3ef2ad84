//! Relay between a browser UI and the Brightdata dataset API for Facebook
//! group collection jobs.
//!
//! The relay validates group batches, converts their local date/time fields
//! into IST timestamps, and forwards trigger, progress, snapshot listing,
//! cancel and download calls with the caller's own API token.

pub mod brightdata;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod token;
pub mod transform;
pub mod validation;

pub use brightdata::BrightdataClient;
pub use config::Config;
pub use error::{ApiError, SetupError};
pub use handlers::AppState;

