//! Geolocation Provider Port
//!
//! Defines the interface for the external geolocation source consulted
//! when the local store has no answer.

use crate::domain::entities::Geolocation;
use async_trait::async_trait;

/// External provider of geolocation data.
///
/// This is an outbound port for a best-effort fallback source: every
/// failure mode (transport error, non-success status, undecodable or
/// invalid payload, missing credentials) collapses to `None`. The
/// resolver never learns why the provider had nothing, only that it
/// did.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    /// Fetch geolocation data for a canonical identifier value.
    async fn fetch(&self, value: &str) -> Option<Geolocation>;
}
