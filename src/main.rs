//! geoStash - Geolocation Resolution Service with Hexagonal Architecture
//!
//! This is the composition root that wires together all the components.

mod adapters;
mod application;
mod config;
mod domain;

use crate::adapters::inbound::HttpServer;
use crate::adapters::outbound::{IpstackClient, IpstackConfig, SqliteGeolocationStore};
use crate::application::ResolverService;
use crate::config::load_config;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting geoStash listen={} db={} (hexagonal architecture)",
        cfg.listen_addr,
        cfg.db_path
    );

    // ===== COMPOSITION ROOT =====
    // Wire up all adapters and services

    // 1. Create outbound adapters

    // Geolocation store (SQLite)
    let store = Arc::new(SqliteGeolocationStore::open(&cfg.db_path)?);
    tracing::info!("geolocation store ready at {}", cfg.db_path);

    // External provider (ipstack)
    if cfg.provider_access_key.is_none() {
        tracing::warn!("IP_STACK_API_ACCESS_KEY not set, provider lookups are disabled");
    }
    let provider = Arc::new(IpstackClient::new(IpstackConfig {
        base_url: cfg.provider_url.clone(),
        access_key: cfg.provider_access_key.clone(),
        timeout: Duration::from_secs(cfg.provider_timeout_secs),
    })?);

    // 2. Create application service
    let resolver = Arc::new(ResolverService::new(store, provider));

    // 3. Create inbound adapter and run
    let server = HttpServer::new(cfg.listen_addr.clone(), resolver);

    server.run().await
}
