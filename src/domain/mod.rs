//! Domain Layer
//!
//! Entities, identifier normalization, validation rules, and the ports
//! the application layer is wired through.

pub mod entities;
pub mod errors;
pub mod identifier;
pub mod ports;
pub mod validation;

pub use entities::{Geolocation, Language, Location};
pub use errors::{ResolveError, StoreError, Violation};
pub use identifier::{GeoIdentifier, IdentifierKind};
pub use validation::validate;
