//! Nyaa scraper - magnets are on the listing, no detail pages needed
//!
//! The main domain is often blocked, so the base URL is picked from a mirror
//! list when the adapter is built.

use super::{
    clean_text, infohash_from_magnet, page_number, Pagination, ParsedPage, ResultSet,
    ScrapeError, Scraper, SiteConfig, SiteCore,
};
use async_trait::async_trait;
use scraper::{Html, Selector};

const BASE_URL: &str = "https://nyaa.si";

const MIRRORS: &[&str] = &["https://nyaa.si", "https://nyaadotsi.netlify.app"];

const CATEGORIES: &[&str] = &[
    "anime",
    "audio",
    "literature",
    "live_action",
    "pictures",
    "software",
];

pub fn default_config() -> SiteConfig {
    SiteConfig::new("nyaa", BASE_URL)
        .with_categories(CATEGORIES)
        .with_category_search()
        .with_mirrors(MIRRORS)
}

/// Nyaa category filter code
fn category_code(category: Option<&str>) -> &'static str {
    match category {
        Some("anime") => "1_0",
        Some("audio") => "2_0",
        Some("literature") => "3_0",
        Some("live_action") => "4_0",
        Some("pictures") => "5_0",
        Some("software") => "6_0",
        _ => "0_0",
    }
}

pub fn parse_listing(html: &str, base_url: &str, limit: usize) -> ParsedPage {
    let document = Html::parse_document(html);
    let mut page = ParsedPage::default();

    let (Ok(row_sel), Ok(title_sel), Ok(magnet_sel)) = (
        Selector::parse("table.torrent-list tbody tr"),
        Selector::parse("td:nth-child(2) a:not(.comments)"),
        Selector::parse("a[href^='magnet:']"),
    ) else {
        return page;
    };

    for row in document.select(&row_sel) {
        let Some(title) = row.select(&title_sel).last() else {
            continue;
        };
        let name = title
            .value()
            .attr("title")
            .map(clean_text)
            .unwrap_or_else(|| clean_text(&title.text().collect::<String>()));

        let infohash = row
            .select(&magnet_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(infohash_from_magnet);

        let Some(infohash) = infohash.filter(|_| !name.is_empty()) else {
            continue;
        };

        page.push_resolved(name, infohash, base_url);
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

pub struct Nyaa {
    core: SiteCore,
}

impl Nyaa {
    pub fn new(core: SiteCore) -> Self {
        Self { core }
    }

    async fn scrape_query(&self, label: &str, params: &str, limit: usize) -> ResultSet {
        let url = self.core.url(&format!("/?{}", params));
        self.core.scrape(label, &url, limit, parse_listing, None).await
    }
}

#[async_trait]
impl Scraper for Nyaa {
    fn config(&self) -> &SiteConfig {
        self.core.config()
    }

    async fn search(&self, query: &str, page: u32, limit: usize) -> Result<ResultSet, ScrapeError> {
        let limit = self.config().effective_limit(limit);
        let params = format!("f=0&c=0_0&q={}&p={}", urlencoding::encode(query), page);
        Ok(self.scrape_query(query, &params, limit).await)
    }

    async fn recent(
        &self,
        category: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<ResultSet, ScrapeError> {
        let limit = self.config().effective_limit(limit);
        let category = self.config().category(category)?;
        let params = format!("c={}&p={}", category_code(category.as_deref()), page);
        Ok(self
            .scrape_query(&category.unwrap_or_default(), &params, limit)
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
        let params = format!(
            "c={}&s=seeders&o=desc&p={}",
            category_code(category.as_deref()),
            page
        );
        Ok(self
            .scrape_query(&category.unwrap_or_default(), &params, limit)
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
        let params = format!(
            "f=0&c={}&q={}&p={}",
            category_code(Some(&category)),
            urlencoding::encode(query),
            page
        );
        Ok(self.scrape_query(query, &params, limit).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(title: &str, hash: Option<&str>) -> String {
        let magnet = hash
            .map(|h| format!(r#"<a href="magnet:?xt=urn:btih:{h}&amp;dn=x"><i class="fa fa-magnet"></i></a>"#))
            .unwrap_or_default();
        format!(
            r#"<tr class="default"><td><a href="/?c=1_2">Anime</a></td><td colspan="2"><a href="/view/1#comments" class="comments">3</a><a href="/view/1" title="{title}">{title}</a></td><td class="text-center"><a href="/download/1.torrent"></a>{magnet}</td></tr>"#
        )
    }

    fn listing(rows: &[String]) -> String {
        format!(
            r#"<table class="torrent-list"><thead><tr><th>Category</th></tr></thead><tbody>{}</tbody></table>
            <ul class="pagination"><li><a href="/?p=1">1</a></li><li class="active"><a href="/?p=2">2 <span class="sr-only">(current)</span></a></li><li><a href="/?p=3">3</a></li><li><a href="/?p=3">»</a></li></ul>"#,
            rows.join("")
        )
    }

    #[test]
    fn entries_come_back_resolved() {
        let hash = "0123456789abcdef0123456789abcdef01234567";
        let html = listing(&[row("[Sub] Show - 01", Some(hash))]);
        let page = parse_listing(&html, "https://nyaa.test", 10);

        assert!(page.follow_urls.is_empty());
        assert_eq!(page.entries.len(), 1);
        let entry = &page.entries[0];
        assert_eq!(entry.name, "[Sub] Show - 01");
        assert_eq!(entry.infohash.as_deref(), Some(hash));
        assert_eq!(entry.site.as_deref(), Some("https://nyaa.test"));
        assert_eq!(page.pagination, Some(Pagination::new(2, 3)));
    }

    #[test]
    fn rows_without_magnet_are_skipped() {
        let hash = "0123456789abcdef0123456789abcdef01234567";
        let html = listing(&[row("no magnet", None), row("ok", Some(hash))]);
        let page = parse_listing(&html, "https://nyaa.test", 10);
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].name, "ok");
    }

    #[test]
    fn category_codes() {
        assert_eq!(category_code(Some("anime")), "1_0");
        assert_eq!(category_code(Some("software")), "6_0");
        assert_eq!(category_code(None), "0_0");
    }
}
