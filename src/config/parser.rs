//! TOML loading for harvest configuration files
//!
//! A configuration file has two optional tables with kebab-case keys:
//!
//! ```toml
//! [crawler]
//! base-url = "https://www.fortiguard.com/appcontrol"
//! detail-url-template = "https://www.fortiguard.com/appcontrol/{id}"
//! page-query = "category=&popularity=&risk="
//! page-param = "page"
//! user-agent = "Mozilla/5.0 ..."
//! request-timeout = 10.0   # seconds
//! request-delay = 1.0      # seconds, before every request
//! retry-delay = 2.0        # seconds, between attempts
//! max-retries = 5          # retries after the first attempt
//! concurrency = 1
//!
//! [output]
//! path = "appid.csv"
//! format = "csv"           # or "json"
//! show-progress = true
//! ```
//!
//! Every key may be omitted. Unknown keys are rejected so a misspelt
//! setting (say `max_retries`) cannot silently fall back to its default.

use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Reads, parses and validates a harvest configuration file
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use appid_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Concurrency: {}", config.crawler.concurrency);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_config_with_hash(path).map(|(config, _)| config)
}

/// Parses configuration from a TOML string without validating it
///
/// Command-line overrides are applied between parsing and validation, so
/// the two steps are exposed separately.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// SHA-256 of a configuration file, hex encoded
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

/// Loads a configuration together with the hash of the exact bytes parsed
///
/// The hash is logged at start-up so an exported file can be traced back
/// to the settings that produced it.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    validate(&config)?;
    Ok((config, hash_content(&content)))
}

fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
