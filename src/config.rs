use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Core service settings
    pub listen_addr: String,
    pub db_path: String,
    pub debug: bool,

    // External provider settings
    pub provider_url: String,
    pub provider_access_key: Option<String>,
    pub provider_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            db_path: "geolocations.db".to_string(),
            debug: false,
            provider_url: "http://api.ipstack.com".to_string(),
            provider_access_key: None,
            provider_timeout_secs: 5,
        }
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    let listen_addr = std::env::var("GEOSTASH_LISTEN_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8000".to_string());

    let db_path = std::env::var("GEOSTASH_DB_PATH")
        .unwrap_or_else(|_| "geolocations.db".to_string());

    let debug = std::env::var("DEBUG").is_ok();

    // External provider settings
    let provider_url = std::env::var("GEOSTASH_PROVIDER_URL")
        .unwrap_or_else(|_| "http://api.ipstack.com".to_string());

    let provider_access_key = std::env::var("IP_STACK_API_ACCESS_KEY").ok();

    let provider_timeout_secs = std::env::var("GEOSTASH_PROVIDER_TIMEOUT_SECS")
        .unwrap_or_else(|_| "5".to_string())
        .parse()
        .unwrap_or(5);

    Ok(Config {
        listen_addr,
        db_path,
        debug,
        provider_url,
        provider_access_key,
        provider_timeout_secs,
    })
}
