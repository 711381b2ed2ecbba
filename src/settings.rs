use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::CacheTtl;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub base_url: Url,
    pub debug: bool,
    pub auth_token: String,
    pub enable_swagger: bool,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub cache_enabled: bool,
    pub schedule_ttl_minutes: u64,
    pub listing_ttl_minutes: u64,
    /// Shared cache server, e.g. `redis://127.0.0.1/`. Unset keeps the cache in process.
    pub redis_url: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // Load from environment variables with APP_ prefix, e.g. APP_AUTH_TOKEN
            .add_source(Environment::with_prefix("APP").prefix_separator("_").try_parsing(true))
            .set_default("base_url", "https://hmtpk.ru")?
            .set_default("debug", false)?
            .set_default("auth_token", "default-token-change-me")?
            .set_default("enable_swagger", true)?
            .set_default("port", 8080)?
            .set_default("request_timeout_secs", 30)?
            .set_default("cache_enabled", true)?
            .set_default("schedule_ttl_minutes", 5)?
            .set_default("listing_ttl_minutes", 60)?
            .build()?;

        config.try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> CacheTtl {
        CacheTtl::from_minutes(self.schedule_ttl_minutes, self.listing_ttl_minutes)
    }
}
