//! Domain Errors - Typed failure modes
//!
//! Store and resolution failures are separate enums so callers can
//! branch exhaustively: a store miss is `Ok(None)`, a store outage is
//! `Err(StoreError::Unavailable)`, and the two are never conflated.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single validation failure on a geolocation record.
///
/// Validation collects every violation instead of stopping at the first,
/// so one response can report all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted path of the offending field (`continent_code`,
    /// `location.languages[0].code`)
    pub field: String,
    /// Human-readable description of the violated rule
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure modes of the persistence store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or the operation did not complete
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// A record with the same ip or url already exists
    #[error("an entry with the same ip or url already exists")]
    Duplicate,
}

/// Failure modes of a resolution operation, as seen by callers of the
/// resolver service.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The raw identifier is neither an IP address nor a URL
    #[error("identifier is neither an ip address nor a url")]
    InvalidIdentifier,
    /// The record violated one or more validation rules
    #[error("validation failed with {} violation(s)", .0.len())]
    Validation(Vec<Violation>),
    /// A record with the same ip or url already exists
    #[error("an entry with the same ip or url already exists")]
    DuplicateEntry,
    /// No record found in the store and no provider result
    #[error("geolocation not found")]
    NotFound,
    /// The store is down and no fallback produced a result
    #[error("store unavailable")]
    StoreUnavailable,
    /// The store failed while persisting a new record
    #[error("failed to create geolocation entry")]
    CreateFailed,
}
