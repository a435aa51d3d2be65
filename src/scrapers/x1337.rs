//! 1337x scraper

use super::{
    absolute_url, capitalize, clean_text, infohash_from_magnet, page_number, Pagination,
    ParsedPage, ResultSet, ScrapeError, Scraper, SiteConfig, SiteCore,
};
use async_trait::async_trait;
use scraper::{Html, Selector};

const BASE_URL: &str = "https://1337xx.to";

const CATEGORIES: &[&str] = &["anime", "music", "games", "tv", "documentaries", "movies"];

pub fn default_config() -> SiteConfig {
    SiteConfig::new("x1337", BASE_URL)
        .with_categories(CATEGORIES)
        .with_category_search()
}

/// Category as spelled in 1337x paths
fn site_category(category: &str) -> String {
    match category {
        "tv" => "TV".to_string(),
        other => capitalize(other),
    }
}

/// Parse a result table (search, category and trending pages share it)
pub fn parse_listing(html: &str, base_url: &str, limit: usize) -> ParsedPage {
    let document = Html::parse_document(html);
    let mut page = ParsedPage::default();

    let (Ok(row_sel), Ok(name_sel)) = (
        Selector::parse("table.table-list tbody tr"),
        Selector::parse("td.name a:nth-of-type(2)"),
    ) else {
        return page;
    };

    for row in document.select(&row_sel) {
        let Some(name_el) = row.select(&name_sel).next() else {
            continue;
        };
        let name = clean_text(&name_el.text().collect::<String>());
        let href = name_el.value().attr("href").unwrap_or("");
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

fn parse_pagination(document: &Html) -> Option<Pagination> {
    let active_sel = Selector::parse("div.pagination li.active").ok()?;
    let item_sel = Selector::parse("div.pagination li a").ok()?;
    let last_sel = Selector::parse("div.pagination li.last a").ok()?;

    let current = page_number(&document.select(&active_sel).next()?.text().collect::<String>())?;

    // "Last" links to e.g. /search/ubuntu/34/
    let from_last = document
        .select(&last_sel)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| href.trim_end_matches('/').rsplit('/').next())
        .and_then(|n| n.parse::<u32>().ok());

    let total = from_last.or_else(|| {
        document
            .select(&item_sel)
            .filter_map(|a| page_number(&a.text().collect::<String>()))
            .max()
    })?;

    Some(Pagination::new(current, total))
}

/// Magnet link from a detail page, falling back to the infohash box
pub fn extract_infohash(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let magnet_sel = Selector::parse("a[href^='magnet:']").ok()?;
    let from_magnet = document
        .select(&magnet_sel)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(infohash_from_magnet);
    if from_magnet.is_some() {
        return from_magnet;
    }

    let box_sel = Selector::parse("div.infohash-box span").ok()?;
    document
        .select(&box_sel)
        .next()
        .map(|el| clean_text(&el.text().collect::<String>()))
        .filter(|hash| hash.len() == 40 && hash.chars().all(|c| c.is_ascii_hexdigit()))
}

pub struct X1337 {
    core: SiteCore,
}

impl X1337 {
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
impl Scraper for X1337 {
    fn config(&self) -> &SiteConfig {
        self.core.config()
    }

    async fn search(&self, query: &str, page: u32, limit: usize) -> Result<ResultSet, ScrapeError> {
        let limit = self.config().effective_limit(limit);
        let path = format!("/search/{}/{}/", urlencoding::encode(query), page);
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
            None => "/home/".to_string(),
            Some(c) => format!("/cat/{}/{}/", site_category(c), page),
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
            None => "/trending".to_string(),
            Some(c) => format!("/trending/w/{}/", c),
        };
        Ok(self
            .scrape_path(&category.unwrap_or_default(), &path, limit)
            .await)
    }

    async fn category_search(
        &self,
        query: &str,
        category: &str,
        page: u32,
        limit: usize,
    ) -> Result<ResultSet, ScrapeError> {
        let limit = self.config().effective_limit(limit);
        let category = self.config().required_category(category)?;
        let path = format!(
            "/category-search/{}/{}/{}/",
            urlencoding::encode(query),
            site_category(&category),
            page
        );
        Ok(self.scrape_path(query, &path, limit).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, href: &str) -> String {
        format!(
            r#"<tr><td class="coll-1 name"><a href="/sub/1/0/" class="icon"><i></i></a><a href="{href}">{name}</a></td><td class="coll-2 seeds">10</td></tr>"#
        )
    }

    fn listing(rows: &[String], pagination: &str) -> String {
        format!(
            r#"<table class="table-list"><thead><tr><th>name</th></tr></thead><tbody>{}</tbody></table>{}"#,
            rows.join(""),
            pagination
        )
    }

    #[test]
    fn parses_name_from_second_link() {
        let html = listing(&[row("Ubuntu 24.04 LTS", "/torrent/1/ubuntu/")], "");
        let page = parse_listing(&html, "https://x.test", 10);
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].name, "Ubuntu 24.04 LTS");
        assert_eq!(page.follow_urls[0], "https://x.test/torrent/1/ubuntu/");
    }

    #[test]
    fn pagination_uses_last_link() {
        let pagination = r#"<div class="pagination"><ul><li class="active"><a href="/search/u/1/">1</a></li><li><a href="/search/u/2/">2</a></li><li class="last"><a href="/search/u/34/">Last</a></li></ul></div>"#;
        let page = parse_listing(&listing(&[row("a", "/torrent/1/a/")], pagination), "https://x.test", 10);
        assert_eq!(page.pagination, Some(Pagination::new(1, 34)));
    }

    #[test]
    fn pagination_falls_back_to_highest_number() {
        let pagination = r#"<div class="pagination"><ul><li><a href="/search/u/1/">1</a></li><li class="active"><a href="/search/u/2/">2</a></li><li><a href="/search/u/3/">3</a></li></ul></div>"#;
        let page = parse_listing(&listing(&[row("a", "/torrent/1/a/")], pagination), "https://x.test", 10);
        assert_eq!(page.pagination, Some(Pagination::new(2, 3)));
    }

    #[test]
    fn extracts_hash_from_magnet_or_box() {
        let hash = "0123456789ABCDEF0123456789ABCDEF01234567";
        let magnet = format!(r#"<a href="magnet:?xt=urn:btih:{hash}&amp;dn=x">Magnet Download</a>"#);
        assert_eq!(extract_infohash(&magnet).as_deref(), Some(hash));

        let boxed = format!(r#"<div class="infohash-box"><p>Infohash : <span>{hash}</span></p></div>"#);
        assert_eq!(extract_infohash(&boxed).as_deref(), Some(hash));

        assert_eq!(extract_infohash("<p>removed</p>"), None);
    }

    #[test]
    fn category_names() {
        assert_eq!(site_category("tv"), "TV");
        assert_eq!(site_category("documentaries"), "Documentaries");
    }
}
