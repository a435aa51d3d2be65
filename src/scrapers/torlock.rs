//! Torlock scraper

use super::{
    absolute_url, clean_text, infohash_from_magnet, page_number, Pagination, ParsedPage,
    ResultSet, ScrapeError, Scraper, SiteConfig, SiteCore,
};
use async_trait::async_trait;
use scraper::{Html, Selector};

const BASE_URL: &str = "https://www.torlock2.com";

const CATEGORIES: &[&str] = &["anime", "music", "games", "tv", "documentaries", "movies", "books"];

pub fn default_config() -> SiteConfig {
    SiteConfig::new("torlock", BASE_URL).with_categories(CATEGORIES)
}

/// Category as spelled in Torlock paths
fn site_category(category: &str) -> &str {
    match category {
        "tv" => "television",
        "books" => "ebooks",
        other => other,
    }
}

/// Torlock puts the query into the path with dashes for spaces
fn query_slug(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| urlencoding::encode(word).into_owned())
        .collect::<Vec<_>>()
        .join("-")
}

pub fn parse_listing(html: &str, base_url: &str, limit: usize) -> ParsedPage {
    let document = Html::parse_document(html);
    let mut page = ParsedPage::default();

    let (Ok(row_sel), Ok(cell_sel), Ok(link_sel)) = (
        Selector::parse("table tr"),
        Selector::parse("td"),
        Selector::parse("a"),
    ) else {
        return page;
    };

    for row in document.select(&row_sel) {
        let Some(cell) = row.select(&cell_sel).next() else {
            continue;
        };
        let name = clean_text(&cell.text().collect::<String>());
        let href = cell
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .unwrap_or("");

        // ads and category rows share the table
        if name.is_empty() || !href.contains("/torrent/") {
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

fn parse_pagination(document: &Html) -> Option<Pagination> {
    let active_sel = Selector::parse("ul.pagination li.active").ok()?;
    let item_sel = Selector::parse("ul.pagination li a").ok()?;

    let current = page_number(&document.select(&active_sel).next()?.text().collect::<String>())?;
    let total = document
        .select(&item_sel)
        .filter_map(|a| page_number(&a.text().collect::<String>()))
        .max()
        .unwrap_or(current);

    Some(Pagination::new(current, total))
}

pub fn extract_infohash(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let magnet_sel = Selector::parse("a[href^='magnet:']").ok()?;
    document
        .select(&magnet_sel)
        .filter_map(|el| el.value().attr("href"))
        .find_map(infohash_from_magnet)
}

pub struct Torlock {
    core: SiteCore,
}

impl Torlock {
    pub fn new(core: SiteCore) -> Self {
        Self { core }
    }

    async fn scrape_path(&self, label: &str, path: &str, limit: usize) -> ResultSet {
        let url = self.core.url(path);
        self.core
            .scrape(label, &url, limit, parse_listing, Some(extract_infohash))
            .await
    }
}

#[async_trait]
impl Scraper for Torlock {
    fn config(&self) -> &SiteConfig {
        self.core.config()
    }

    async fn search(&self, query: &str, page: u32, limit: usize) -> Result<ResultSet, ScrapeError> {
        let limit = self.config().effective_limit(limit);
        let path = format!("/all/torrents/{}.html?sort=seeds&page={}", query_slug(query), page);
        Ok(self.scrape_path(query, &path, limit).await)
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
            None => "/fresh.html".to_string(),
            Some(c) => format!("/{}/{}/added/desc.html", site_category(c), page),
        };
        Ok(self
            .scrape_path(&category.unwrap_or_default(), &path, limit)
            .await)
    }

    async fn trending(
        &self,
        category: Option<&str>,
        _page: u32,
        limit: usize,
    ) -> Result<ResultSet, ScrapeError> {
        let limit = self.config().effective_limit(limit);
        let category = self.config().category(category)?;
        let path = match &category {
            None => "/top100.html".to_string(),
            Some(c) => format!("/{}/top100.html", site_category(c)),
        };
        Ok(self
            .scrape_path(&category.unwrap_or_default(), &path, limit)
            .await)
    }
}
