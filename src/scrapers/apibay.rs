//! Apibay (The Pirate Bay JSON API) scraper

use super::{ParsedPage, ResultSet, ScrapeError, Scraper, SiteConfig, SiteCore};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

const BASE_URL: &str = "https://apibay.org";

const CATEGORIES: &[&str] = &["audio", "video", "movies", "tv", "apps", "games", "other"];

/// Hash apibay returns in its "No results returned" placeholder row
const EMPTY_HASH: &str = "0000000000000000000000000000000000000000";

pub fn default_config() -> SiteConfig {
    SiteConfig::new("apibay", BASE_URL).with_categories(CATEGORIES)
}

#[derive(Debug, Deserialize)]
struct ApibayTorrent {
    name: String,
    info_hash: String,
}

/// Top-100 list code for a category
fn top100_code(category: &str) -> &'static str {
    match category {
        "audio" => "100",
        "video" => "200",
        "movies" => "201",
        "tv" => "205",
        "apps" => "300",
        "games" => "400",
        _ => "600",
    }
}

pub fn parse_listing(body: &str, base_url: &str, limit: usize) -> ParsedPage {
    let mut page = ParsedPage::default();

    let rows: Vec<Value> = match serde_json::from_str(body) {
        Ok(rows) => rows,
        Err(e) => {
            debug!(error = %e, "apibay response is not a torrent list");
            return page;
        }
    };

    // a malformed row only costs that row
    for row in rows {
        let torrent = match serde_json::from_value::<ApibayTorrent>(row) {
            Ok(t) => t,
            Err(e) => {
                debug!(error = %e, "skipping apibay row");
                continue;
            }
        };
        if torrent.info_hash == EMPTY_HASH || torrent.info_hash.is_empty() {
            continue;
        }
        page.push_resolved(torrent.name, torrent.info_hash, base_url);
        if page.is_full(limit) {
            break;
        }
    }

    page
}

pub struct Apibay {
    core: SiteCore,
}

impl Apibay {
    pub fn new(core: SiteCore) -> Self {
        Self { core }
    }

    /// Apibay has no paging; anything past the first page is empty
    async fn scrape_first_page(&self, label: &str, path: &str, page: u32, limit: usize) -> ResultSet {
        if page > 1 {
            return ResultSet::empty(label).stamp(Instant::now());
        }
        let url = self.core.url(path);
        self.core.scrape(label, &url, limit, parse_listing, None).await
    }
}

#[async_trait]
impl Scraper for Apibay {
    fn config(&self) -> &SiteConfig {
        self.core.config()
    }

    async fn search(&self, query: &str, page: u32, limit: usize) -> Result<ResultSet, ScrapeError> {
        let limit = self.config().effective_limit(limit);
        let path = format!("/q.php?q={}&cat=0", urlencoding::encode(query));
        Ok(self.scrape_first_page(query, &path, page, limit).await)
    }

    async fn recent(
        &self,
        category: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<ResultSet, ScrapeError> {
        let limit = self.config().effective_limit(limit);
        // the recent list is not split by category
        let label = self.config().category(category)?.unwrap_or_default();
        Ok(self
            .scrape_first_page(&label, "/precompiled/data_top100_recent.json", page, limit)
            .await)
    }

    async fn trending(
        &self,
        category: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<ResultSet, ScrapeError> {
        let limit = self.config().effective_limit(limit);
        let category = self.config().category(category)?;
        let path = match &category {
            None => "/precompiled/data_top100_48h.json".to_string(),
            Some(c) => format!("/precompiled/data_top100_{}.json", top100_code(c)),
        };
        Ok(self
            .scrape_first_page(&category.unwrap_or_default(), &path, page, limit)
            .await)
    }
}
