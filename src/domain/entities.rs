//! Domain Entities - Core business objects
//!
//! These entities mirror the persisted geolocation schema and the JSON
//! wire format. They have no storage or transport dependencies.

use serde::{Deserialize, Serialize};

/// A spoken language attached to a location.
///
/// Languages are shared between locations through an association table
/// and deduplicated by their natural key `code` at the store layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Language code, 1 to 5 characters (en, pt-br)
    pub code: String,
    /// English name of the language
    pub name: String,
    /// Name of the language in the language itself
    pub native: String,
}

/// Geographic location details nested under a geolocation record.
///
/// Locations are shared between geolocation records and deduplicated by
/// their natural key `geoname_id` at the store layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// GeoNames identifier, the natural key for reuse
    pub geoname_id: i64,
    /// Capital city of the country
    pub capital: String,
    /// URL of the country flag image
    pub country_flag: String,
    /// Country flag emoji
    pub country_flag_emoji: String,
    /// Unicode code points of the flag emoji
    pub country_flag_emoji_unicode: String,
    /// International calling code
    pub calling_code: String,
    /// Whether the country is in the European Union
    pub is_eu: bool,
    /// Languages spoken at this location
    #[serde(default)]
    pub languages: Vec<Language>,
}

/// A geolocation record keyed by IP-or-URL identity.
///
/// Every valid record carries at least one of `ip` or `url`, both in
/// canonical form (see `domain::identifier`). Records are created once
/// and never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    /// Canonical IPv4/IPv6 literal, if this record is keyed by IP
    pub ip: Option<String>,
    /// Address family tag, `ipv4` or `ipv6` when present
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Canonical bare host, if this record is keyed by URL
    pub url: Option<String>,
    pub continent_code: String,
    pub continent_name: String,
    pub country_code: String,
    pub country_name: String,
    pub region_code: String,
    pub region_name: String,
    pub city: String,
    pub zip: Option<String>,
    /// Latitude in degrees, -90 to 90
    pub latitude: f64,
    /// Longitude in degrees, -180 to 180
    pub longitude: f64,
    pub msa: Option<String>,
    pub dma: Option<String>,
    pub radius: Option<String>,
    pub ip_routing_type: Option<String>,
    pub connection_type: Option<String>,
    /// Nested location details, shared by natural key
    pub location: Option<Location>,
}
