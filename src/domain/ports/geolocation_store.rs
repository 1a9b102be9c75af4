//! Geolocation Store Port
//!
//! Defines the interface for the persisted geolocation store.
//! Implementations may use SQLite, PostgreSQL, or in-memory storage.

use crate::domain::entities::Geolocation;
use crate::domain::errors::StoreError;
use crate::domain::identifier::GeoIdentifier;
use async_trait::async_trait;

/// Persistence store for geolocation records.
///
/// This is an outbound port that abstracts the storage mechanism. A
/// miss and an outage are distinct outcomes: `Ok(None)` means the store
/// answered and holds no matching record, `Err(Unavailable)` means the
/// store could not answer at all. The resolver branches on exactly that
/// distinction.
#[async_trait]
pub trait GeolocationStore: Send + Sync {
    /// Look up a record by its canonical identifier.
    async fn find_by_identifier(
        &self,
        identifier: &GeoIdentifier,
    ) -> Result<Option<Geolocation>, StoreError>;

    /// Check whether any record matches the given ip or url.
    ///
    /// Matching is an OR over the supplied values; `None` fields do not
    /// participate.
    async fn exists(&self, ip: Option<&str>, url: Option<&str>) -> Result<bool, StoreError>;

    /// Persist a validated record and return it as stored.
    ///
    /// Nested locations and languages are reused by natural key when
    /// they already exist. Returns `Err(Duplicate)` when another record
    /// already claims the same ip or url.
    async fn insert(&self, record: Geolocation) -> Result<Geolocation, StoreError>;

    /// Delete the record matching the given identifier.
    ///
    /// Returns `Ok(true)` when a record was removed and `Ok(false)`
    /// when nothing matched. Nested locations and languages survive the
    /// delete, they stay shared with other records.
    async fn delete_by_identifier(&self, identifier: &GeoIdentifier) -> Result<bool, StoreError>;
}
