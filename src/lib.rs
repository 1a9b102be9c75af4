//! geoStash Library
//!
//! This module exposes the geoStash components for use in integration tests
//! and as a library.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;

// Re-export commonly used types
pub use application::ResolverService;
pub use config::load_config;
pub use domain::entities::{Geolocation, Language, Location};
pub use domain::errors::{ResolveError, StoreError, Violation};
pub use domain::identifier::{GeoIdentifier, IdentifierKind};
pub use domain::ports::{GeolocationProvider, GeolocationStore};
