//! Appid-Harvest: an application-signature catalog crawler
//!
//! This crate walks a paginated application-control catalog, fetches every
//! entry's detail page with bounded concurrency, and merges the results into
//! a flat, ordered record set ready for tabular export.

pub mod config;
pub mod crawler;
pub mod output;

use thiserror::Error;

/// Main error type for Appid-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Listing parse error for {url}: {message}")]
    ListingParse { url: String, message: String },

    #[error("Detail parse error for {url}: {message}")]
    DetailParse { url: String, message: String },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Failed to fetch the first listing page after {attempts} attempts: {reason}")]
    Bootstrap { attempts: u32, reason: String },

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Whether a fresh attempt at the same fetch+parse unit may succeed
    ///
    /// Transport failures and structural parse failures are retried; anything
    /// caused by our own configuration, URL construction or HTTP client setup
    /// is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HarvestError::Http { .. }
                | HarvestError::Timeout { .. }
                | HarvestError::Status { .. }
                | HarvestError::ListingParse { .. }
                | HarvestError::DetailParse { .. }
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Appid-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, CrawlReport, Crawler, ItemDetail, ItemStub, PageInfo, Record};
