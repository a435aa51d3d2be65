//! HTTP client with standard headers

use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{Client, Proxy, StatusCode};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36 Edg/114.0.1823.67";

/// Some listings hide results from clients without it
const SITE_COOKIE: &str = "fencekey=8e5j3p61b3k0a9b0e44c5bbcecafaa5a2";

/// Connection settings for [`Fetcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub proxy: Option<String>,
    pub timeout: Duration,
    pub probe_timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Duration::from_secs(15),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// GET-only client that reports failures as missing data
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    probe_timeout: Duration,
}

impl Fetcher {
    pub fn new(options: &FetchOptions) -> reqwest::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static(SITE_COOKIE));

        let mut builder = Client::builder()
            .timeout(options.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers);
        if let Some(proxy) = &options.proxy {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            probe_timeout: options.probe_timeout,
        })
    }

    /// Fetch URL and return the body, or `None` on any failure
    pub async fn fetch(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(url, error = %e, "request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!(url, %status, "unexpected status");
            return None;
        }

        match response.text().await {
            Ok(text) => Some(text),
            Err(e) => {
                debug!(url, error = %e, "failed to read body");
                None
            }
        }
    }

    /// Whether `url` answers 200 within `timeout`
    pub async fn probe(&self, url: &str, timeout: Duration) -> bool {
        match self.client.get(url).timeout(timeout).send().await {
            Ok(resp) => resp.status() == StatusCode::OK,
            Err(e) => {
                debug!(url, error = %e, "probe failed");
                false
            }
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }
}
