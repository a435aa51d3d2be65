//! LimeTorrents scraper

use super::{
    absolute_url, capitalize, clean_text, page_number, Pagination, ParsedPage, ResultSet,
    ScrapeError, Scraper, SiteConfig, SiteCore,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

const BASE_URL: &str = "https://www.limetorrents.lol";

const CATEGORIES: &[&str] = &["anime", "apps", "games", "movies", "music", "tv", "other"];

pub fn default_config() -> SiteConfig {
    SiteConfig::new("limetorrents", BASE_URL).with_categories(CATEGORIES)
}

/// Category name as it appears in browse URLs
fn browse_category(category: &str) -> String {
    match category {
        "apps" => "Applications".to_string(),
        "tv" => "TV-shows".to_string(),
        other => capitalize(other),
    }
}

/// Parse a listing table into partial entries
pub fn parse_listing(html: &str, base_url: &str, limit: usize) -> ParsedPage {
    let document = Html::parse_document(html);
    let mut page = ParsedPage::default();

    let (Ok(row_sel), Ok(cell_sel), Ok(link_sel)) = (
        Selector::parse("table.table2 tr"),
        Selector::parse("td"),
        Selector::parse("a"),
    ) else {
        return page;
    };

    for row in document.select(&row_sel) {
        // header rows only have <th>
        let Some(cell) = row.select(&cell_sel).next() else {
            continue;
        };
        let name = clean_text(&cell.text().collect::<String>());

        // the first link is a download icon, the last one the detail page
        let href = cell
            .select(&link_sel)
            .last()
            .and_then(|a| a.value().attr("href"))
            .unwrap_or("");

        if name.is_empty() || href.is_empty() {
            continue;
        }

        page.push_partial(name, absolute_url(base_url, href));
        if page.is_full(limit) {
            break;
        }
    }

    page.pagination = parse_pagination(&document);
    page
}

/// Read "current / last page" from the search stats block
fn parse_pagination(document: &Html) -> Option<Pagination> {
    let stat_sel = Selector::parse("div.search_stat").ok()?;
    let active_sel = Selector::parse("span.active").ok()?;
    let link_sel = Selector::parse("a").ok()?;

    let stat = document.select(&stat_sel).next()?;
    let current = page_number(&stat.select(&active_sel).next()?.text().collect::<String>())?;

    // last link is "next", the one before it is the last page
    let links: Vec<_> = stat.select(&link_sel).collect();
    let last = links.get(links.len().checked_sub(2)?)?;
    let total = page_number(&last.text().collect::<String>())?;

    Some(Pagination::new(current, total))
}

/// Torrent cache links are named after the infohash
static HEX_HASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([a-fA-F0-9]{40})\b").expect("hash pattern is valid"));

/// Pull the infohash out of the torrent download link on a detail page
pub fn extract_infohash(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let download_sel = Selector::parse("a.csprite_dltorrent").ok()?;
    let href = document
        .select(&download_sel)
        .last()?
        .value()
        .attr("href")?;

    HEX_HASH.captures(href)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub struct LimeTorrents {
    core: SiteCore,
}

impl LimeTorrents {
    pub fn new(core: SiteCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl Scraper for LimeTorrents {
    fn config(&self) -> &SiteConfig {
        self.core.config()
    }

    async fn search(&self, query: &str, page: u32, limit: usize) -> Result<ResultSet, ScrapeError> {
        let limit = self.config().effective_limit(limit);
        let url = self.core.url(&format!(
            "/search/all/{}//{}",
            urlencoding::encode(query),
            page
        ));
        Ok(self
            .core
            .scrape(query, &url, limit, parse_listing, Some(extract_infohash))
            .await)
    }

    async fn recent(
        &self,
        category: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<ResultSet, ScrapeError> {
        let limit = self.config().effective_limit(limit);
        let category = self.config().category(category)?;
        let path = match &category {
            None => "/latest100".to_string(),
            Some(c) => format!("/browse-torrents/{}/date/{}/", browse_category(c), page),
        };
        let label = category.unwrap_or_default();
        Ok(self
            .core
            .scrape(&label, &self.core.url(&path), limit, parse_listing, Some(extract_infohash))
            .await)
    }

    async fn trending(
        &self,
        category: Option<&str>,
        _page: u32,
        limit: usize,
    ) -> Result<ResultSet, ScrapeError> {
        let limit = self.config().effective_limit(limit);
        // top100 is a single page across all categories
        let label = self.config().category(category)?.unwrap_or_default();
        Ok(self
            .core
            .scrape(&label, &self.core.url("/top100"), limit, parse_listing, Some(extract_infohash))
            .await)
    }
}
