//! Torrent scrapers for various sites
//!
//! Every site is an adapter implementing [`Scraper`]. Adapters share one
//! pipeline, [`SiteCore::scrape`]: fetch a listing page, parse it into
//! entries, then resolve the entries that still need a detail page.

pub mod apibay;
pub mod fetch;
pub mod limetorrents;
pub mod mirror;
pub mod nyaa;
pub mod resolver;
pub mod torlock;
pub mod torrentproject;
pub mod x1337;
pub mod yts;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

pub use apibay::Apibay;
pub use fetch::{FetchOptions, Fetcher};
pub use limetorrents::LimeTorrents;
pub use mirror::MirrorSelector;
pub use nyaa::Nyaa;
pub use resolver::DetailResolver;
pub use torlock::Torlock;
pub use torrentproject::TorrentProject;
pub use x1337::X1337;
pub use yts::Yts;

/// Available scrapers
pub const SCRAPERS: &[&str] = &[
    "apibay",
    "limetorrents",
    "nyaa",
    "torlock",
    "torrentproject",
    "x1337",
    "yts",
];

/// Result cap used when a site has no explicit limit configured
pub const DEFAULT_RESULT_LIMIT: usize = 50;

/// One torrent found on a site.
///
/// Starts out partial (name plus the detail page URL) and becomes resolved
/// once its infohash is known. The detail URL is dropped on resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub name: String,
    #[serde(skip)]
    pub detail_url: Option<String>,
    pub infohash: Option<String>,
    pub site: Option<String>,
}

impl Entry {
    /// Entry that still needs its detail page fetched
    pub fn partial(name: impl Into<String>, detail_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detail_url: Some(detail_url.into()),
            infohash: None,
            site: None,
        }
    }

    /// Entry whose infohash was already on the listing
    pub fn resolved(name: impl Into<String>, infohash: impl Into<String>, site: &str) -> Self {
        Self {
            name: name.into(),
            detail_url: None,
            infohash: Some(infohash.into()),
            site: Some(site.to_string()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.infohash.is_some()
    }

    /// Record the infohash and forget the detail URL
    pub fn resolve(&mut self, infohash: String, site: &str) {
        self.infohash = Some(infohash);
        self.site = Some(site.to_string());
        self.detail_url = None;
    }
}

/// Page position reported by a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
}

impl Pagination {
    /// Sites sometimes report a current page past the last one; the total is
    /// raised to match.
    pub fn new(current_page: u32, total_pages: u32) -> Self {
        let current_page = current_page.max(1);
        Self {
            current_page,
            total_pages: total_pages.max(current_page),
        }
    }
}

/// Output of a listing parser
#[derive(Debug, Default)]
pub struct ParsedPage {
    pub entries: Vec<Entry>,
    pub follow_urls: Vec<String>,
    pub pagination: Option<Pagination>,
}

impl ParsedPage {
    pub fn push_partial(&mut self, name: String, detail_url: String) {
        self.follow_urls.push(detail_url.clone());
        self.entries.push(Entry::partial(name, detail_url));
    }

    pub fn push_resolved(&mut self, name: String, infohash: String, site: &str) {
        self.entries.push(Entry::resolved(name, infohash, site));
    }

    pub fn is_full(&self, limit: usize) -> bool {
        self.entries.len() >= limit
    }

    fn truncate(&mut self, limit: usize) {
        self.entries.truncate(limit);
        let kept: Vec<&str> = self
            .entries
            .iter()
            .filter_map(|e| e.detail_url.as_deref())
            .collect();
        self.follow_urls.retain(|url| kept.contains(&url.as_str()));
    }
}

/// Result of one adapter call, in the shape consumers expect on the wire
#[derive(Debug, Clone, Serialize)]
pub struct ResultSet {
    pub query: String,
    #[serde(rename = "data")]
    pub entries: Vec<Entry>,
    pub time: f64,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultSet {
    pub fn new(query: impl Into<String>, entries: Vec<Entry>, pagination: Option<Pagination>) -> Self {
        Self {
            query: query.into(),
            total: entries.len(),
            entries,
            time: 0.0,
            current_page: pagination.map(|p| p.current_page),
            total_pages: pagination.map(|p| p.total_pages),
            error: None,
        }
    }

    pub fn empty(query: impl Into<String>) -> Self {
        Self::new(query, Vec::new(), None)
    }

    /// Result carrying an adapter failure instead of entries
    pub fn failed(query: impl Into<String>, error: &ScrapeError) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::empty(query)
        }
    }

    /// Set elapsed time and total
    pub fn stamp(mut self, started: Instant) -> Self {
        self.time = started.elapsed().as_secs_f64();
        self.total = self.entries.len();
        self
    }

    /// No entries and no error to report
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.error.is_none()
    }

    pub fn resolved_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_resolved()).count()
    }
}

/// Adapter entry points, for error messages and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Search,
    Recent,
    Trending,
    CategorySearch,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Search => "search",
            Operation::Recent => "recent",
            Operation::Trending => "trending",
            Operation::CategorySearch => "category search",
        })
    }
}

/// Failures visible at the adapter boundary.
///
/// Transport and markup problems never show up here; they only shrink the
/// result.
#[derive(Debug, Clone, Error)]
pub enum ScrapeError {
    #[error("{site} does not support {operation}")]
    Unsupported { site: String, operation: Operation },

    #[error("{site} has no category '{category}'")]
    UnknownCategory { site: String, category: String },

    #[error("{site} {operation} panicked: {message}")]
    Panicked {
        site: String,
        operation: Operation,
        message: String,
    },
}

/// Static description of one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub key: String,
    pub base_url: String,
    pub result_limit: usize,
    pub supports_category: bool,
    pub categories: Vec<String>,
    pub mirrors: Vec<String>,
}

impl SiteConfig {
    pub fn new(key: &str, base_url: &str) -> Self {
        Self {
            key: key.to_string(),
            base_url: base_url.to_string(),
            result_limit: DEFAULT_RESULT_LIMIT,
            supports_category: false,
            categories: Vec::new(),
            mirrors: Vec::new(),
        }
    }

    pub fn with_categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_category_search(mut self) -> Self {
        self.supports_category = true;
        self
    }

    pub fn with_mirrors(mut self, mirrors: &[&str]) -> Self {
        self.mirrors = mirrors.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_limit(mut self, result_limit: usize) -> Self {
        self.result_limit = result_limit.max(1);
        self
    }

    /// Per-call limit capped by the site's own limit
    pub fn effective_limit(&self, limit: usize) -> usize {
        limit.min(self.result_limit).max(1)
    }

    /// Normalize a requested category and check the site knows it
    pub fn category(&self, category: Option<&str>) -> Result<Option<String>, ScrapeError> {
        let category = match category.map(|c| c.trim().to_lowercase()) {
            Some(c) if !c.is_empty() => c,
            _ => return Ok(None),
        };
        if self.categories.iter().any(|known| *known == category) {
            Ok(Some(category))
        } else {
            Err(ScrapeError::UnknownCategory {
                site: self.key.clone(),
                category,
            })
        }
    }

    /// Category for a category search, where a blank name is an error too
    pub fn required_category(&self, category: &str) -> Result<String, ScrapeError> {
        self.category(Some(category))?
            .ok_or_else(|| ScrapeError::UnknownCategory {
                site: self.key.clone(),
                category: category.to_string(),
            })
    }

    pub fn unsupported(&self, operation: Operation) -> ScrapeError {
        ScrapeError::Unsupported {
            site: self.key.clone(),
            operation,
        }
    }
}

/// Shared interface of all site adapters
#[async_trait]
pub trait Scraper: Send + Sync {
    fn config(&self) -> &SiteConfig;

    fn key(&self) -> &str {
        &self.config().key
    }

    fn base_url(&self) -> &str {
        &self.config().base_url
    }

    async fn search(&self, query: &str, page: u32, limit: usize) -> Result<ResultSet, ScrapeError>;

    async fn recent(
        &self,
        category: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<ResultSet, ScrapeError>;

    async fn trending(
        &self,
        category: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<ResultSet, ScrapeError>;

    async fn category_search(
        &self,
        _query: &str,
        _category: &str,
        _page: u32,
        _limit: usize,
    ) -> Result<ResultSet, ScrapeError> {
        Err(self.config().unsupported(Operation::CategorySearch))
    }
}

/// Parses a listing body: `(body, base_url, limit)`
pub type ListingParser = fn(&str, &str, usize) -> ParsedPage;

/// Pulls an infohash out of a detail page body
pub type HashExtractor = fn(&str) -> Option<String>;

/// Plumbing every adapter is built on
#[derive(Debug, Clone)]
pub struct SiteCore {
    config: SiteConfig,
    fetcher: Fetcher,
    resolver: DetailResolver,
}

impl SiteCore {
    pub fn new(config: SiteConfig, fetcher: Fetcher, resolver: DetailResolver) -> Self {
        Self {
            config,
            fetcher,
            resolver,
        }
    }

    /// Like [`SiteCore::new`], but first settles on a live mirror when the
    /// site lists any. The choice holds for the lifetime of the adapter.
    pub async fn connect(mut config: SiteConfig, fetcher: Fetcher, resolver: DetailResolver) -> Self {
        if !config.mirrors.is_empty() {
            let selector = MirrorSelector::new(fetcher.clone(), fetcher.probe_timeout());
            config.base_url = selector.select(&config.mirrors, &config.base_url).await;
        }
        Self::new(config, fetcher, resolver)
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Absolute URL for a path on the site
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Fetch a listing, parse it, and resolve whatever needs a detail page
    pub async fn scrape(
        &self,
        query: &str,
        url: &str,
        limit: usize,
        parse: ListingParser,
        extract: Option<HashExtractor>,
    ) -> ResultSet {
        let started = Instant::now();
        let site = self.config.key.as_str();

        debug!(site, url, "fetching listing");
        let Some(body) = self.fetcher.fetch(url).await else {
            info!(site, url, "listing unavailable");
            return ResultSet::empty(query).stamp(started);
        };

        let mut page = parse(&body, &self.config.base_url, limit);
        page.truncate(limit);

        if let Some(extract) = extract.filter(|_| !page.follow_urls.is_empty()) {
            let fetcher = &self.fetcher;
            self.resolver
                .resolve_all(
                    &mut page.entries,
                    &page.follow_urls,
                    &self.config.base_url,
                    move |detail_url: String| async move {
                        let body = fetcher.fetch(&detail_url).await?;
                        extract(&body)
                    },
                )
                .await;
        }

        let result = ResultSet::new(query, page.entries, page.pagination).stamp(started);
        info!(
            site,
            total = result.total,
            resolved = result.resolved_count(),
            elapsed = result.time,
            "scrape finished"
        );
        result
    }
}

/// Default configuration for a site key
pub fn default_config(key: &str) -> Option<SiteConfig> {
    match key {
        "apibay" => Some(apibay::default_config()),
        "limetorrents" => Some(limetorrents::default_config()),
        "nyaa" => Some(nyaa::default_config()),
        "torlock" => Some(torlock::default_config()),
        "torrentproject" => Some(torrentproject::default_config()),
        "x1337" => Some(x1337::default_config()),
        "yts" => Some(yts::default_config()),
        _ => None,
    }
}

/// Wrap a core in the adapter matching its site key
pub fn build(core: SiteCore) -> Option<Arc<dyn Scraper>> {
    let adapter: Arc<dyn Scraper> = match core.config().key.as_str() {
        "apibay" => Arc::new(Apibay::new(core)),
        "limetorrents" => Arc::new(LimeTorrents::new(core)),
        "nyaa" => Arc::new(Nyaa::new(core)),
        "torlock" => Arc::new(Torlock::new(core)),
        "torrentproject" => Arc::new(TorrentProject::new(core)),
        "x1337" => Arc::new(X1337::new(core)),
        "yts" => Arc::new(Yts::new(core)),
        _ => return None,
    };
    Some(adapter)
}

/// Clean and trim text
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Uppercase the first letter
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Join a possibly relative href onto a base URL
pub fn absolute_url(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), href)
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), href)
    }
}

/// Hex or base32 btih
static BTIH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)urn:btih:([a-f0-9]{40}|[a-z2-7]{32})").expect("btih pattern is valid")
});

/// Extract the btih infohash from a (possibly percent-encoded) magnet link
pub fn infohash_from_magnet(magnet: &str) -> Option<String> {
    let decoded = urlencoding::decode(magnet).ok()?;
    BTIH.captures(&decoded)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Leading page number in a pagination label such as "3 (current)"
pub fn page_number(text: &str) -> Option<u32> {
    text.split_whitespace().next()?.parse().ok()
}
