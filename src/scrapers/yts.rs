//! YTS scraper using the list_movies JSON API

use super::{Pagination, ParsedPage, ResultSet, ScrapeError, Scraper, SiteConfig, SiteCore};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const BASE_URL: &str = "https://yts.mx";

/// Genres accepted by the API's `genre` filter
const CATEGORIES: &[&str] = &[
    "action",
    "animation",
    "comedy",
    "documentary",
    "drama",
    "horror",
    "sci-fi",
    "thriller",
];

/// The API refuses larger pages
const MAX_PAGE_SIZE: usize = 50;

pub fn default_config() -> SiteConfig {
    SiteConfig::new("yts", BASE_URL).with_categories(CATEGORIES)
}

#[derive(Debug, Deserialize)]
struct ListMoviesResponse {
    data: Option<ListMoviesData>,
}

#[derive(Debug, Deserialize)]
struct ListMoviesData {
    #[serde(default)]
    movie_count: u32,
    #[serde(default)]
    limit: u32,
    #[serde(default)]
    page_number: u32,
    #[serde(default)]
    movies: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Movie {
    title_long: String,
    #[serde(default)]
    torrents: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct MovieTorrent {
    hash: String,
    quality: String,
    #[serde(rename = "type", default)]
    kind: String,
}

impl MovieTorrent {
    fn label(&self) -> String {
        if self.kind.is_empty() {
            self.quality.clone()
        } else {
            format!("{} {}", self.quality, self.kind)
        }
    }
}

/// One entry per torrent: every movie comes in several qualities
pub fn parse_listing(body: &str, base_url: &str, limit: usize) -> ParsedPage {
    let mut page = ParsedPage::default();

    let data = match serde_json::from_str::<ListMoviesResponse>(body) {
        Ok(ListMoviesResponse { data: Some(data) }) => data,
        Ok(_) => return page,
        Err(e) => {
            debug!(error = %e, "unexpected yts response");
            return page;
        }
    };

    // a malformed movie or torrent only costs itself
    'movies: for movie in data.movies.into_iter().filter_map(decode::<Movie>) {
        for torrent in movie.torrents.into_iter().filter_map(decode::<MovieTorrent>) {
            if torrent.hash.is_empty() {
                continue;
            }
            let name = format!("{} [{}]", movie.title_long, torrent.label());
            page.push_resolved(name, torrent.hash, base_url);
            if page.is_full(limit) {
                break 'movies;
            }
        }
    }

    if data.limit > 0 && data.page_number > 0 {
        let total_pages = data.movie_count.div_ceil(data.limit);
        page.pagination = Some(Pagination::new(data.page_number, total_pages));
    }
    page
}

fn decode<T: DeserializeOwned>(value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(item) => Some(item),
        Err(e) => {
            debug!(error = %e, "skipping malformed yts item");
            None
        }
    }
}

pub struct Yts {
    core: SiteCore,
}

impl Yts {
    pub fn new(core: SiteCore) -> Self {
        Self { core }
    }

    async fn list_movies(&self, label: &str, params: &str, page: u32, limit: usize) -> ResultSet {
        let url = self.core.url(&format!(
            "/api/v2/list_movies.json?{}&page={}&limit={}",
            params,
            page,
            limit.min(MAX_PAGE_SIZE)
        ));
        self.core.scrape(label, &url, limit, parse_listing, None).await
    }
}

#[async_trait]
impl Scraper for Yts {
    fn config(&self) -> &SiteConfig {
        self.core.config()
    }

    async fn search(&self, query: &str, page: u32, limit: usize) -> Result<ResultSet, ScrapeError> {
        let limit = self.config().effective_limit(limit);
        let params = format!("query_term={}", urlencoding::encode(query));
        Ok(self.list_movies(query, &params, page, limit).await)
    }

    async fn recent(
        &self,
        category: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<ResultSet, ScrapeError> {
        let limit = self.config().effective_limit(limit);
        let category = self.config().category(category)?;
        let mut params = "sort_by=date_added".to_string();
        if let Some(genre) = &category {
            params.push_str(&format!("&genre={}", genre));
        }
        Ok(self
            .list_movies(&category.unwrap_or_default(), &params, page, limit)
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
        let mut params = "sort_by=download_count".to_string();
        if let Some(genre) = &category {
            params.push_str(&format!("&genre={}", genre));
        }
        Ok(self
            .list_movies(&category.unwrap_or_default(), &params, page, limit)
            .await)
    }
}
