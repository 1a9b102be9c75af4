//! Resolver Service - Main application use case
//!
//! Orchestrates geolocation resolution: normalizing identifiers,
//! consulting the store and the provider, and persisting new records.
//! This is the primary interface for the inbound adapter.

use crate::domain::entities::Geolocation;
use crate::domain::errors::{ResolveError, StoreError};
use crate::domain::identifier::GeoIdentifier;
use crate::domain::ports::{GeolocationProvider, GeolocationStore};
use crate::domain::validation::validate;
use std::sync::Arc;

/// Resolver service - main application use case.
///
/// This service orchestrates resolution:
/// 1. Reads consult the local store first, then the external provider
/// 2. Writes are validated, checked for duplicate identity, persisted
/// 3. A store outage degrades reads to provider-only instead of failing
pub struct ResolverService {
    store: Arc<dyn GeolocationStore>,
    provider: Arc<dyn GeolocationProvider>,
}

impl ResolverService {
    /// Create a new resolver service.
    pub fn new(store: Arc<dyn GeolocationStore>, provider: Arc<dyn GeolocationProvider>) -> Self {
        Self { store, provider }
    }

    /// Resolve a geolocation for a raw identifier.
    ///
    /// The store answers first. A miss falls back to the provider; an
    /// outage also falls back, but a fruitless fallback then surfaces
    /// the outage rather than a plain not-found.
    pub async fn get(&self, raw: &str) -> Result<Geolocation, ResolveError> {
        // 1. Normalize the identifier
        let identifier = GeoIdentifier::normalize(raw)?;

        // 2. Consult the local store
        match self.store.find_by_identifier(&identifier).await {
            Ok(Some(record)) => {
                tracing::debug!("store hit for {}", identifier);
                Ok(record)
            }
            Ok(None) => {
                // 3. Store miss, fall back to the provider
                tracing::debug!("store miss for {}, consulting provider", identifier);
                match self.provider.fetch(identifier.value()).await {
                    Some(record) => Ok(record),
                    None => Err(ResolveError::NotFound),
                }
            }
            Err(err) => {
                // 4. Store down, the provider is the only source left
                tracing::warn!("store lookup failed for {}: {}", identifier, err);
                match self.provider.fetch(identifier.value()).await {
                    Some(record) => Ok(record),
                    None => Err(ResolveError::StoreUnavailable),
                }
            }
        }
    }

    /// Validate and persist a new geolocation record.
    ///
    /// Returns the record as stored, with identity fields in canonical
    /// form and nested location details as resolved by the store.
    pub async fn create(&self, record: Geolocation) -> Result<Geolocation, ResolveError> {
        // 1. Validate and canonicalize
        let record = validate(record).map_err(ResolveError::Validation)?;

        // 2. Refuse identities that are already taken
        let taken = self
            .store
            .exists(record.ip.as_deref(), record.url.as_deref())
            .await
            .map_err(|err| {
                tracing::error!("existence check failed: {}", err);
                ResolveError::CreateFailed
            })?;
        if taken {
            return Err(ResolveError::DuplicateEntry);
        }

        // 3. Persist; the store's unique indexes catch duplicates that
        //    slip past the pre-check under concurrency
        match self.store.insert(record).await {
            Ok(stored) => Ok(stored),
            Err(StoreError::Duplicate) => Err(ResolveError::DuplicateEntry),
            Err(err) => {
                tracing::error!("insert failed: {}", err);
                Err(ResolveError::CreateFailed)
            }
        }
    }

    /// Delete the record matching a raw identifier.
    ///
    /// Writes never degrade: a store outage here is an error, not a
    /// reason to fall back anywhere.
    pub async fn delete(&self, raw: &str) -> Result<(), ResolveError> {
        let identifier = GeoIdentifier::normalize(raw)?;

        match self.store.delete_by_identifier(&identifier).await {
            Ok(true) => {
                tracing::debug!("deleted geolocation for {}", identifier);
                Ok(())
            }
            Ok(false) => Err(ResolveError::NotFound),
            Err(err) => {
                tracing::error!("delete failed for {}: {}", identifier, err);
                Err(ResolveError::StoreUnavailable)
            }
        }
    }
}
