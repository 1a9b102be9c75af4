//! ipstack Provider Client
//!
//! Implements GeolocationProvider against the ipstack HTTP API.
//! The provider is strictly best-effort: any transport error, bad
//! status, undecodable body, or rule-breaking payload turns into `None`
//! and a log line, never into an error the resolver has to handle.

use crate::domain::entities::Geolocation;
use crate::domain::ports::GeolocationProvider;
use crate::domain::validation::validate;
use async_trait::async_trait;
use std::time::Duration;

/// Configuration for the ipstack client.
#[derive(Debug, Clone)]
pub struct IpstackConfig {
    /// Base URL of the ipstack API
    pub base_url: String,
    /// API access key; `None` disables the provider entirely
    pub access_key: Option<String>,
    /// Timeout for a single lookup request
    pub timeout: Duration,
}

impl Default for IpstackConfig {
    fn default() -> Self {
        Self {
            base_url: "http://api.ipstack.com".to_string(),
            access_key: None,
            timeout: Duration::from_secs(5),
        }
    }
}

/// ipstack-backed geolocation provider.
///
/// Looks up `GET {base_url}/{value}?access_key=...&output=json`. The
/// same endpoint serves IP literals and bare hosts.
pub struct IpstackClient {
    config: IpstackConfig,
    client: reqwest::Client,
}

impl IpstackClient {
    /// Create a new client with the given configuration.
    pub fn new(config: IpstackConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    async fn fetch_raw(&self, value: &str, access_key: &str) -> anyhow::Result<Geolocation> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), value);
        let response = self
            .client
            .get(&url)
            .query(&[("access_key", access_key), ("output", "json")])
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("ipstack returned status {}", response.status());
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl GeolocationProvider for IpstackClient {
    async fn fetch(&self, value: &str) -> Option<Geolocation> {
        let access_key = match &self.config.access_key {
            Some(key) => key.clone(),
            None => {
                tracing::debug!("ipstack access key not configured, skipping lookup");
                return None;
            }
        };

        let record = match self.fetch_raw(value, &access_key).await {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!("ipstack lookup failed for {}: {:?}", value, err);
                return None;
            }
        };

        // ipstack reports its own errors with a 200 and a payload that
        // carries no geolocation fields, which already fails decoding
        // above. A decodable but rule-breaking payload is dropped here.
        match validate(record) {
            Ok(record) => Some(record),
            Err(violations) => {
                tracing::warn!(
                    "ipstack payload for {} failed validation with {} violation(s)",
                    value,
                    violations.len()
                );
                None
            }
        }
    }
}
