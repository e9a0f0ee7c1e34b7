//! HTTP transport
//!
//! This module issues every request the crawler makes:
//! - Building the HTTP client with the configured user agent and timeout
//! - Building listing page and detail page URLs
//! - GET requests with error classification
//!
//! The transport never retries; see `retry` for that.

use crate::config::{CrawlerConfig, ID_PLACEHOLDER};
use crate::HarvestError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use std::time::Duration;
use url::Url;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,\
     image/avif,image/webp,image/apng,*/*;q=0.8";

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(config.request_timeout())
        .connect_timeout(config.request_timeout())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Shared HTTP transport
///
/// Cloning is cheap: clones share the underlying connection pool, so one
/// transport is built per run and handed to every worker.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    request_delay: Duration,
}

impl Transport {
    /// Creates a transport from the crawler configuration
    pub fn new(config: &CrawlerConfig) -> Result<Self, HarvestError> {
        let client = build_http_client(config)?;
        Ok(Self::with_client(client, config.request_delay()))
    }

    /// Wraps an existing client
    pub fn with_client(client: Client, request_delay: Duration) -> Self {
        Self {
            client,
            request_delay,
        }
    }

    /// Fetches a URL and returns the response body
    ///
    /// Connection failures, timeouts and non-2xx statuses are all reported
    /// as retryable errors.
    pub async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        tracing::trace!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| classify_error(url, e))
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> HarvestError {
    if error.is_timeout() {
        HarvestError::Timeout {
            url: url.to_string(),
        }
    } else {
        HarvestError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

/// Builds the URL of a listing page
///
/// Page 1 is the base URL itself; later pages carry the fixed filter
/// parameters followed by the page number.
pub fn listing_url(config: &CrawlerConfig, page: u32) -> Result<String, HarvestError> {
    let mut url = Url::parse(&config.base_url)?;
    if page > 1 {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in url::form_urlencoded::parse(config.page_query.as_bytes()) {
            pairs.append_pair(&key, &value);
        }
        pairs.append_pair(&config.page_param, &page.to_string());
    }
    Ok(url.to_string())
}

/// Builds the URL of an item's detail page
pub fn detail_url(config: &CrawlerConfig, id: &str) -> Result<String, HarvestError> {
    let url = config.detail_template().replace(ID_PLACEHOLDER, id);
    Ok(Url::parse(&url)?.to_string())
}

/// Path prefix shared by every detail page URL
///
/// The default template `{base}/{id}` over `https://host/appcontrol` gives
/// `/appcontrol/`. Listing rows are only recognised when they navigate
/// below this prefix.
pub fn detail_path_prefix(config: &CrawlerConfig) -> Result<String, HarvestError> {
    let template = config.detail_template();
    let prefix = template.split(ID_PLACEHOLDER).next().unwrap_or_default();
    Ok(Url::parse(prefix)?.path().to_string())
}
