//! `wildwatch` - A journal of geolocated wildlife observations
//!
//! This library provides the observation model, its local persistent store,
//! a best-effort photo identification client backed by a remote vision
//! model, and location acquisition helpers.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod identify;
pub mod location;
pub mod logging;
pub mod observation;
pub mod query;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use identify::{Identification, IdentificationResult, ImageIdentifier};
pub use logging::init_logging;
pub use observation::{NewObservation, Observation, ObservationIcon, ObservationPatch};
pub use query::{ObservationQuery, SortOrder};
pub use store::{ObservationStore, StoreStats};
