use crate::config::types::{Config, CrawlerConfig, OutputConfig, ID_PLACEHOLDER};
use crate::ConfigError;
use url::Url;

/// Upper bound on concurrent fetches; the catalog is a shared public service
pub const MAX_CONCURRENCY: usize = 64;

/// Upper bound on retries per task
pub const MAX_RETRIES: u32 = 20;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_http_url("base_url", &config.base_url)?;

    let template = config.detail_template();
    if !template.contains(ID_PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "detail_url_template must contain '{}', got '{}'",
            ID_PLACEHOLDER, template
        )));
    }
    validate_http_url("detail_url_template", &template.replace(ID_PLACEHOLDER, "0"))?;

    // Listing rows are matched against the part before the identifier.
    let prefix = template.split(ID_PLACEHOLDER).next().unwrap_or_default();
    if prefix.contains(['?', '#']) || Url::parse(prefix).is_err() {
        return Err(ConfigError::Validation(format!(
            "detail_url_template must place '{}' in the URL path, got '{}'",
            ID_PLACEHOLDER, template
        )));
    }

    if config.page_param.is_empty() {
        return Err(ConfigError::Validation(
            "page_param cannot be empty".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if !config.request_timeout.is_finite() || config.request_timeout <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be > 0 seconds, got {}",
            config.request_timeout
        )));
    }

    validate_delay("request_delay", config.request_delay)?;
    validate_delay("retry_delay", config.retry_delay)?;

    if config.max_retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= {}, got {}",
            MAX_RETRIES, config.max_retries
        )));
    }

    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }
    Ok(())
}

fn validate_delay(field: &str, seconds: f64) -> Result<(), ConfigError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{} must be a non-negative number of seconds, got {}",
            field, seconds
        )));
    }
    Ok(())
}
