//! Settings loaded from the environment
//!
//! Values come from process environment variables, optionally seeded from a
//! `.env` file in the working directory or in `<config dir>/nexus/`.

use crate::scrapers::{self, FetchOptions, SiteConfig, DEFAULT_RESULT_LIMIT};
use crate::scrapers::resolver::DEFAULT_CONCURRENCY;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Sites queried concurrently during a fan-out
pub const DEFAULT_FAN_OUT: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: String, value: String },

    #[error("unknown site '{0}' in NEXUS_SITES")]
    UnknownSite(String),

    #[error("NEXUS_SITES enables no sites")]
    NoSites,
}

/// Per-site overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSettings {
    pub key: String,
    pub base_url: Option<String>,
    pub result_limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub http_proxy: Option<String>,
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
    pub detail_concurrency: usize,
    pub fan_out_concurrency: usize,
    pub result_limit: usize,
    pub sites: Vec<SiteSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        let fetch = FetchOptions::default();
        Self {
            http_proxy: None,
            request_timeout: fetch.timeout,
            probe_timeout: fetch.probe_timeout,
            detail_concurrency: DEFAULT_CONCURRENCY,
            fan_out_concurrency: DEFAULT_FAN_OUT,
            result_limit: DEFAULT_RESULT_LIMIT,
            sites: scrapers::SCRAPERS
                .iter()
                .map(|key| SiteSettings {
                    key: key.to_string(),
                    base_url: None,
                    result_limit: None,
                })
                .collect(),
        }
    }
}

impl Settings {
    /// Load `.env` and read settings from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        load_env();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build settings from any variable source; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let request_timeout = match parse_positive::<u64>(&get, "NEXUS_REQUEST_TIMEOUT_SECS")? {
            Some(secs) => Duration::from_secs(secs),
            None => defaults.request_timeout,
        };
        let probe_timeout = match parse_positive::<u64>(&get, "NEXUS_PROBE_TIMEOUT_SECS")? {
            Some(secs) => Duration::from_secs(secs),
            None => defaults.probe_timeout,
        };
        let detail_concurrency = parse_positive(&get, "NEXUS_DETAIL_CONCURRENCY")?
            .unwrap_or(defaults.detail_concurrency);
        let fan_out_concurrency = parse_positive(&get, "NEXUS_FANOUT_CONCURRENCY")?
            .unwrap_or(defaults.fan_out_concurrency);
        let result_limit =
            parse_positive(&get, "NEXUS_RESULT_LIMIT")?.unwrap_or(defaults.result_limit);

        let keys: Vec<String> = match get("NEXUS_SITES") {
            Some(list) => list
                .split(',')
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            None => scrapers::SCRAPERS.iter().map(|k| k.to_string()).collect(),
        };
        if keys.is_empty() {
            return Err(ConfigError::NoSites);
        }

        let mut sites = Vec::with_capacity(keys.len());
        for key in keys {
            if !scrapers::SCRAPERS.contains(&key.as_str()) {
                return Err(ConfigError::UnknownSite(key));
            }
            let prefix = format!("NEXUS_{}", key.to_uppercase());
            sites.push(SiteSettings {
                base_url: get(&format!("{}_URL", prefix)),
                result_limit: parse_positive(&get, &format!("{}_LIMIT", prefix))?,
                key,
            });
        }

        Ok(Self {
            http_proxy: get("HTTP_PROXY"),
            request_timeout,
            probe_timeout,
            detail_concurrency,
            fan_out_concurrency,
            result_limit,
            sites,
        })
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            proxy: self.http_proxy.clone(),
            timeout: self.request_timeout,
            probe_timeout: self.probe_timeout,
        }
    }

    /// Site defaults with this site's overrides applied
    pub fn site_config(&self, site: &SiteSettings) -> Option<SiteConfig> {
        let mut config = scrapers::default_config(&site.key)?
            .with_limit(site.result_limit.unwrap_or(self.result_limit));
        if let Some(base_url) = &site.base_url {
            config.base_url = base_url.trim_end_matches('/').to_string();
            // an explicit URL wins over mirror probing
            config.mirrors.clear();
        }
        Some(config)
    }
}

/// Load .env file - check current directory first, then config directory
pub fn load_env() {
    if dotenvy::dotenv().is_err() {
        if let Some(config_dir) = dirs::config_dir() {
            let config_env = config_dir.join("nexus").join(".env");
            dotenvy::from_path(&config_env).ok();
        }
    }
}

fn parse_positive<T>(get: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    let Some(value) = get(name) else {
        return Ok(None);
    };
    match value.parse::<T>() {
        Ok(n) if n > T::default() => Ok(Some(n)),
        _ => Err(ConfigError::InvalidNumber {
            name: name.to_string(),
            value,
        }),
    }
}
