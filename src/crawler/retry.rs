//! Fixed-delay retry wrapper
//!
//! Wraps one fetch+parse unit and re-runs it on retryable failures, pausing
//! a fixed delay between attempts. The policy holds no per-call state, so a
//! single instance is shared by every worker.

use crate::config::CrawlerConfig;
use crate::HarvestError;
use std::future::Future;
use std::time::Duration;

/// Outcome of a retried fetch
#[derive(Debug)]
pub enum FetchResult<T> {
    /// The operation succeeded on attempt number `attempts`
    Success { value: T, attempts: u32 },

    /// The operation failed terminally after `attempts` attempts
    Failure { reason: String, attempts: u32 },
}

impl<T> FetchResult<T> {
    /// Number of attempts made, including the first
    pub fn attempts(&self) -> u32 {
        match self {
            FetchResult::Success { attempts, .. } | FetchResult::Failure { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success { .. })
    }

    /// Converts into a `Result`, dropping the attempt count on success
    pub fn into_result(self) -> Result<T, (String, u32)> {
        match self {
            FetchResult::Success { value, .. } => Ok(value),
            FetchResult::Failure { reason, attempts } => Err((reason, attempts)),
        }
    }
}

/// Retry policy: at most `max_retries` retries, `delay` apart, no jitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay())
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `operation` until it succeeds, fails fatally, or retries run out
    ///
    /// An operation that fails `k <= max_retries` times before succeeding
    /// sleeps exactly `k` times. An operation that never succeeds sleeps
    /// `max_retries` times and is attempted `max_retries + 1` times.
    ///
    /// # Arguments
    ///
    /// * `label` - Short description of the unit, used in log lines
    /// * `operation` - Produces a fresh attempt each time it is called
    pub async fn attempt<T, F, Fut>(&self, label: &str, mut operation: F) -> FetchResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HarvestError>>,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match operation().await {
                Ok(value) => {
                    if attempts > 1 {
                        tracing::debug!("{} succeeded on attempt {}", label, attempts);
                    }
                    return FetchResult::Success { value, attempts };
                }
                Err(e) if !e.is_retryable() => {
                    tracing::warn!("{} failed with a non-retryable error: {}", label, e);
                    return FetchResult::Failure {
                        reason: e.to_string(),
                        attempts,
                    };
                }
                Err(e) if attempts > self.max_retries => {
                    tracing::warn!("{} gave up after {} attempts: {}", label, attempts, e);
                    return FetchResult::Failure {
                        reason: e.to_string(),
                        attempts,
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                        label,
                        attempts,
                        self.max_retries + 1,
                        e,
                        self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}
