use std::{env, fmt::Display, fs, path::Path, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::coordinator::{RefetchPolicy, DEFAULT_LISTING_LIMIT, DEFAULT_UPCOMING_DAYS};
use crate::session::SessionOptions;
use crate::utils;

const DEFAULT_API_BASE_URL: &str = "https://videogame-events-api.vercel.app";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_PAGE_TTL_SECS: u64 = 300;
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub port: u16,
    pub revalidate_secret: Option<String>,
    pub page_ttl_secs: u64,
    pub search_debounce_ms: u64,
    pub upcoming_days: u32,
    pub listing_limit: u32,
    pub http_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            port: DEFAULT_PORT,
            revalidate_secret: None,
            page_ttl_secs: DEFAULT_PAGE_TTL_SECS,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            upcoming_days: DEFAULT_UPCOMING_DAYS,
            listing_limit: DEFAULT_LISTING_LIMIT,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Config file (if any) overlaid with environment variables.
    pub fn load() -> Self {
        let path = utils::config_path();
        let mut config = match read_config(&path) {
            Ok(config) => config,
            Err(err) => {
                warn!("ignoring unreadable config {}: {err}", path.display());
                AppConfig::default()
            }
        };
        config.apply_env(|key| env::var(key).ok());
        config
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FESTIVAL_API_URL").filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(secret) = lookup("REVALIDATE_SECRET").filter(|v| !v.is_empty()) {
            self.revalidate_secret = Some(secret);
        }
        override_parsed(&lookup, "PORT", &mut self.port);
        override_parsed(&lookup, "PAGE_TTL_SECS", &mut self.page_ttl_secs);
        override_parsed(&lookup, "SEARCH_DEBOUNCE_MS", &mut self.search_debounce_ms);
        override_parsed(&lookup, "UPCOMING_DAYS", &mut self.upcoming_days);
        override_parsed(&lookup, "LISTING_LIMIT", &mut self.listing_limit);
        override_parsed(&lookup, "HTTP_TIMEOUT_SECS", &mut self.http_timeout_secs);
    }

    pub fn policy(&self) -> RefetchPolicy {
        RefetchPolicy {
            upcoming_days: self.upcoming_days,
            listing_limit: self.listing_limit,
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            policy: self.policy(),
            search_debounce: Duration::from_millis(self.search_debounce_ms),
        }
    }

    pub fn page_ttl(&self) -> Duration {
        Duration::from_secs(self.page_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(err) => warn!("invalid {key} value {raw:?}: {err}; keeping {slot}"),
    }
}

fn read_config(path: &Path) -> Result<AppConfig, String> {
    if !path.exists() {
        info!("no config file at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|err| err.to_string())?;
    serde_json::from_str(&contents).map_err(|err| err.to_string())
}
