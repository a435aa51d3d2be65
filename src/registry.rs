//! Site registry and search dispatch
//!
//! The registry owns one adapter per enabled site. Callers either address a
//! single site by key or fan a search out to all of them. Adapter failures
//! (including panics) stop at this boundary and come back as results with
//! `error` set.

use crate::config::{Settings, DEFAULT_FAN_OUT};
use crate::scrapers::{self, DetailResolver, Fetcher, Operation, ResultSet, ScrapeError, Scraper, SiteCore};
use futures::future::{join_all, FutureExt};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown site '{0}'")]
    UnknownSite(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Answer of [`Registry::dispatch`]
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Dispatch {
    Single(ResultSet),
    /// Keyed by each site's base URL
    Merged(BTreeMap<String, ResultSet>),
}

/// Set of configured site adapters
pub struct Registry {
    sites: Vec<(String, Arc<dyn Scraper>)>,
    fan_out: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_FAN_OUT)
    }
}

impl Registry {
    /// Empty registry running at most `fan_out` adapters at once
    pub fn new(fan_out: usize) -> Self {
        Self {
            sites: Vec::new(),
            fan_out: fan_out.max(1),
        }
    }

    /// Build every enabled site. Sites with mirrors are probed here, once.
    pub async fn from_settings(settings: &Settings) -> Result<Self, RegistryError> {
        let fetcher = Fetcher::new(&settings.fetch_options())?;
        let resolver = DetailResolver::new(settings.detail_concurrency);

        let configs = settings.sites.iter().filter_map(|site| settings.site_config(site));
        let cores = join_all(configs.map(|config| SiteCore::connect(config, fetcher.clone(), resolver))).await;

        let mut registry = Self::new(settings.fan_out_concurrency);
        for core in cores {
            let key = core.config().key.clone();
            if let Some(adapter) = scrapers::build(core) {
                info!(site = %key, base_url = adapter.base_url(), "site ready");
                registry.insert(key, adapter);
            }
        }
        Ok(registry)
    }

    /// Add a site, replacing any adapter already under `key`
    pub fn insert(&mut self, key: impl Into<String>, adapter: Arc<dyn Scraper>) {
        let key = key.into();
        match self.sites.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = adapter,
            None => self.sites.push((key, adapter)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Arc<dyn Scraper>> {
        self.sites.iter().find(|(k, _)| k == key).map(|(_, a)| a)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.sites.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    fn adapter(&self, key: &str) -> Result<&Arc<dyn Scraper>, RegistryError> {
        self.get(key)
            .ok_or_else(|| RegistryError::UnknownSite(key.to_string()))
    }

    /// Search one site when `site` is given, otherwise all of them
    pub async fn dispatch(
        &self,
        site: Option<&str>,
        query: &str,
        page: u32,
        limit: usize,
    ) -> Result<Dispatch, RegistryError> {
        match site {
            Some(key) => Ok(Dispatch::Single(self.search(key, query, page, limit).await?)),
            None => Ok(Dispatch::Merged(self.search_all(query, page, limit).await)),
        }
    }

    pub async fn search(
        &self,
        key: &str,
        query: &str,
        page: u32,
        limit: usize,
    ) -> Result<ResultSet, RegistryError> {
        let adapter = self.adapter(key)?;
        Ok(guarded(adapter.as_ref(), Operation::Search, query, adapter.search(query, page, limit)).await)
    }

    pub async fn recent(
        &self,
        key: &str,
        category: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<ResultSet, RegistryError> {
        let adapter = self.adapter(key)?;
        let label = category_label(category);
        Ok(guarded(adapter.as_ref(), Operation::Recent, &label, adapter.recent(category, page, limit)).await)
    }

    pub async fn trending(
        &self,
        key: &str,
        category: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<ResultSet, RegistryError> {
        let adapter = self.adapter(key)?;
        let label = category_label(category);
        Ok(guarded(adapter.as_ref(), Operation::Trending, &label, adapter.trending(category, page, limit)).await)
    }

    pub async fn category_search(
        &self,
        key: &str,
        query: &str,
        category: &str,
        page: u32,
        limit: usize,
    ) -> Result<ResultSet, RegistryError> {
        let adapter = self.adapter(key)?;
        Ok(guarded(
            adapter.as_ref(),
            Operation::CategorySearch,
            query,
            adapter.category_search(query, category, page, limit),
        )
        .await)
    }

    /// Search every site concurrently; sites with nothing to report are left out
    pub async fn search_all(&self, query: &str, page: u32, limit: usize) -> BTreeMap<String, ResultSet> {
        let results: Vec<(String, ResultSet)> = stream::iter(self.sites.iter())
            .map(|(_, adapter)| async move {
                let result = guarded(
                    adapter.as_ref(),
                    Operation::Search,
                    query,
                    adapter.search(query, page, limit),
                )
                .await;
                (adapter.base_url().to_string(), result)
            })
            .buffered(self.fan_out)
            .collect()
            .await;

        results
            .into_iter()
            .filter(|(_, result)| !result.is_empty())
            .collect()
    }
}

/// Run one adapter call, turning errors and panics into an error-tagged result
async fn guarded<F>(adapter: &dyn Scraper, operation: Operation, query: &str, call: F) -> ResultSet
where
    F: Future<Output = Result<ResultSet, ScrapeError>>,
{
    let started = Instant::now();
    let error = match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(result)) => return result,
        Ok(Err(error)) => error,
        Err(panic) => ScrapeError::Panicked {
            site: adapter.key().to_string(),
            operation,
            message: panic_message(panic.as_ref()),
        },
    };

    warn!(site = adapter.key(), %operation, %error, "adapter failed");
    ResultSet::failed(query, &error).stamp(started)
}

/// Query label for category listings, spelled the way adapters report it
fn category_label(category: Option<&str>) -> String {
    category.map(|c| c.trim().to_lowercase()).unwrap_or_default()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
