use serde::Deserialize;
use std::time::Duration;

/// Default catalog location
pub const DEFAULT_BASE_URL: &str = "https://www.fortiguard.com/appcontrol";

/// Default browser-like user agent; the catalog rejects obvious bots
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36";

/// Placeholder substituted with the item identifier in detail URLs
pub const ID_PLACEHOLDER: &str = "{id}";

/// Main configuration structure for Appid-Harvest
///
/// Built once per run and shared read-only (as `Arc<Config>`) by every
/// component. All fields have defaults, so an empty TOML document is valid.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CrawlerConfig {
    /// Listing endpoint; page 1 is fetched from this URL unchanged
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Detail page URL with an `{id}` placeholder; defaults to `<base-url>/{id}`
    #[serde(rename = "detail-url-template")]
    pub detail_url_template: Option<String>,

    /// Filter parameters sent along with every page after the first
    #[serde(rename = "page-query")]
    pub page_query: String,

    /// Name of the page-number query parameter
    #[serde(rename = "page-param")]
    pub page_param: String,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout")]
    pub request_timeout: f64,

    /// Pause before every request (seconds)
    #[serde(rename = "request-delay")]
    pub request_delay: f64,

    /// Fixed pause between attempts of a failed fetch (seconds)
    #[serde(rename = "retry-delay")]
    pub retry_delay: f64,

    /// Retries after the first attempt before a task is given up
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Maximum number of fetches in flight at once
    pub concurrency: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            detail_url_template: None,
            page_query: "category=&popularity=&risk=".to_string(),
            page_param: "page".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: 10.0,
            request_delay: 1.0,
            retry_delay: 2.0,
            max_retries: 5,
            concurrency: 1,
        }
    }
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_secs_f64(self.request_delay)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs_f64(self.retry_delay)
    }

    /// The detail URL template with the default filled in
    pub fn detail_template(&self) -> String {
        match &self.detail_url_template {
            Some(template) => template.clone(),
            None => format!("{}/{}", self.base_url.trim_end_matches('/'), ID_PLACEHOLDER),
        }
    }
}

/// Export format of the harvested records
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Path of the exported file
    pub path: String,

    /// Export format
    pub format: OutputFormat,

    /// Whether the binary renders a progress bar
    #[serde(rename = "show-progress")]
    pub show_progress: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "appid.csv".to_string(),
            format: OutputFormat::Csv,
            show_progress: true,
        }
    }
}
