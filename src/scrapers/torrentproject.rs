//! TorrentProject scraper - search only

use super::{
    absolute_url, clean_text, infohash_from_magnet, Operation, ParsedPage, ResultSet, ScrapeError,
    Scraper, SiteConfig, SiteCore,
};
use async_trait::async_trait;
use scraper::{Html, Selector};

const BASE_URL: &str = "https://torrentproject2.com";

/// Leading rows of the results block are column headers
const HEADER_ROWS: usize = 2;

pub fn default_config() -> SiteConfig {
    SiteConfig::new("torrentproject", BASE_URL)
}

pub fn parse_listing(html: &str, base_url: &str, limit: usize) -> ParsedPage {
    let document = Html::parse_document(html);
    let mut page = ParsedPage::default();

    let (Ok(row_sel), Ok(link_sel)) = (
        Selector::parse("div#similarfiles > div"),
        Selector::parse("span a"),
    ) else {
        return page;
    };

    for row in document.select(&row_sel).skip(HEADER_ROWS) {
        let Some(link) = row.select(&link_sel).next() else {
            continue;
        };
        let name = clean_text(&link.text().collect::<String>());
        let href = link.value().attr("href").unwrap_or("");
        if name.is_empty() || href.is_empty() {
            continue;
        }

        page.push_partial(name, absolute_url(base_url, href));
        if page.is_full(limit) {
            break;
        }
    }

    page
}

/// The magnet sits behind a redirect link whose query carries it encoded
pub fn extract_infohash(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let download_sel = Selector::parse("#download > div:nth-child(2) > div > a").ok()?;
    let fallback_sel = Selector::parse("a[href*='magnet']").ok()?;

    let href = document
        .select(&download_sel)
        .next()
        .or_else(|| document.select(&fallback_sel).next())?
        .value()
        .attr("href")?;

    let start = href.find("magnet")?;
    infohash_from_magnet(&href[start..])
}

pub struct TorrentProject {
    core: SiteCore,
}

impl TorrentProject {
    pub fn new(core: SiteCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl Scraper for TorrentProject {
    fn config(&self) -> &SiteConfig {
        self.core.config()
    }

    async fn search(&self, query: &str, _page: u32, limit: usize) -> Result<ResultSet, ScrapeError> {
        let limit = self.config().effective_limit(limit);
        let terms = urlencoding::encode(query).replace("%20", "+");
        let url = self.core.url(&format!("/?t={}&orderby=seeders", terms));
        Ok(self
            .core
            .scrape(query, &url, limit, parse_listing, Some(extract_infohash))
            .await)
    }

    async fn recent(
        &self,
        _category: Option<&str>,
        _page: u32,
        _limit: usize,
    ) -> Result<ResultSet, ScrapeError> {
        Err(self.config().unsupported(Operation::Recent))
    }

    async fn trending(
        &self,
        _category: Option<&str>,
        _page: u32,
        _limit: usize,
    ) -> Result<ResultSet, ScrapeError> {
        Err(self.config().unsupported(Operation::Trending))
    }
}
