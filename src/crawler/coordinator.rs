//! Crawl coordinator - main harvest orchestration logic
//!
//! This module drives a complete run:
//! - Bootstrapping pagination from the first listing page
//! - Fanning out over every listing page through the worker pool
//! - Fanning out over every discovered item's detail page
//! - Merging stubs and details into the final record set

use crate::config::{validate, Config};
use crate::crawler::aggregator::{dedup_stubs, merge, Record};
use crate::crawler::fetcher::{detail_path_prefix, detail_url, listing_url, Transport};
use crate::crawler::parser::{
    parse_detail, parse_listing, ItemDetail, ItemStub, PageInfo, ParsedListing,
};
use crate::crawler::progress::{Phase, ProgressEvent, ProgressObserver, TaskOutcome};
use crate::crawler::retry::{FetchResult, RetryPolicy};
use crate::crawler::scheduler::WorkerPool;
use crate::output::CrawlStats;
use crate::HarvestError;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// One record per distinct identifier, in listing order
    pub records: Vec<Record>,

    /// Counters describing the run
    pub stats: CrawlStats,
}

/// Main crawler structure
///
/// Owns the shared transport and the immutable configuration; every worker
/// borrows both for the duration of a run.
pub struct Crawler {
    config: Arc<Config>,
    transport: Transport,
    retry: RetryPolicy,
    pool: WorkerPool,
    observer: Arc<dyn ProgressObserver>,
}

impl Crawler {
    /// Creates a crawler, validating the configuration and building the transport
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(HarvestError)` - Invalid configuration or HTTP client setup failure
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        validate(&config)?;
        let transport = Transport::new(&config.crawler)?;
        Ok(Self::with_transport(Arc::new(config), transport))
    }

    /// Creates a crawler around an existing transport
    pub fn with_transport(config: Arc<Config>, transport: Transport) -> Self {
        let retry = RetryPolicy::from_config(&config.crawler);
        let pool = WorkerPool::new(config.crawler.concurrency);

        Self {
            config,
            transport,
            retry,
            pool,
            observer: Arc::new(()),
        }
    }

    /// Attaches a progress observer
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs a complete harvest
    ///
    /// Only a failure to read the first listing page aborts the run. Any
    /// other page or detail that cannot be fetched is logged, reported to
    /// the observer, and degrades into partial data.
    pub async fn run(&self) -> Result<CrawlReport, HarvestError> {
        let start_time = Instant::now();
        tracing::info!("Starting harvest of {}", self.config.crawler.base_url);

        let page_info = self.bootstrap().await?;
        let page_count = page_info.page_count();
        tracing::info!(
            "Catalog reports {} items, {} per page, {} pages",
            page_info.total_count,
            page_info.items_per_page,
            page_count
        );

        let pages = self.scrape_pages(page_info).await;
        let pages_failed = pages.iter().filter(|page| page.is_none()).count();

        let stubs = dedup_stubs(pages.into_iter().flatten().flatten());
        tracing::info!(
            "Collected {} distinct items from {} pages ({} failed)",
            stubs.len(),
            page_count,
            pages_failed
        );

        let details = self.scrape_details(&stubs).await;
        let records = merge(&stubs, &details);

        let stats = CrawlStats {
            total_reported: page_info.total_count,
            pages_planned: page_count as usize,
            pages_failed,
            details_planned: stubs.len(),
            details_failed: stubs.len().saturating_sub(details.len()),
            records: records.len(),
            elapsed: start_time.elapsed(),
        };

        tracing::info!(
            "Harvest completed: {} records in {:?} ({} detail pages failed)",
            stats.records,
            stats.elapsed,
            stats.details_failed
        );

        Ok(CrawlReport { records, stats })
    }

    /// Fetches the first listing page to learn the pagination
    ///
    /// This is the only fetch whose terminal failure is fatal.
    pub async fn bootstrap(&self) -> Result<PageInfo, HarvestError> {
        let url = listing_url(&self.config.crawler, 1)?;
        let url = url.as_str();

        let result = self
            .retry
            .attempt("bootstrap page", move || self.fetch_listing(url, 1))
            .await;

        match result {
            FetchResult::Success { value, .. } => {
                value.page_info.ok_or_else(|| HarvestError::ListingParse {
                    url: url.to_string(),
                    message: "first page carried no pagination data".to_string(),
                })
            }
            FetchResult::Failure { reason, attempts } => {
                tracing::error!("Could not read the first listing page: {}", reason);
                Err(HarvestError::Bootstrap { attempts, reason })
            }
        }
    }

    /// Fetches and parses every listing page
    ///
    /// The result holds one slot per page in page order; `None` marks a page
    /// that failed terminally.
    async fn scrape_pages(&self, page_info: PageInfo) -> Vec<Option<Vec<ItemStub>>> {
        let page_count = page_info.page_count();
        let pages: Vec<u32> = (1..=page_count).collect();

        self.observer.on_event(&ProgressEvent::PhaseStarted {
            phase: Phase::Page,
            total: pages.len(),
        });

        self.pool
            .run_many(pages, move |page| async move {
                let stubs = self
                    .fetch_with_retry(Phase::Page, page.to_string(), move || async move {
                        let url = listing_url(&self.config.crawler, page)?;
                        self.fetch_listing(&url, page).await
                    })
                    .await?
                    .stubs;

                if page < page_count && stubs.len() != page_info.items_per_page {
                    tracing::warn!(
                        "Page {} has {} items, expected {}",
                        page,
                        stubs.len(),
                        page_info.items_per_page
                    );
                }
                Some(stubs)
            })
            .await
    }

    /// Fetches and parses the detail page of every stub
    ///
    /// Returns details keyed by identifier; failed items are absent.
    async fn scrape_details(&self, stubs: &[ItemStub]) -> HashMap<String, ItemDetail> {
        let ids: Vec<&str> = stubs.iter().map(|stub| stub.id.as_str()).collect();

        self.observer.on_event(&ProgressEvent::PhaseStarted {
            phase: Phase::Detail,
            total: ids.len(),
        });

        let results = self
            .pool
            .run_many(ids, move |id| async move {
                let detail = self
                    .fetch_with_retry(Phase::Detail, id.to_string(), move || async move {
                        let url = detail_url(&self.config.crawler, id)?;
                        self.fetch_detail(&url).await
                    })
                    .await;
                (id, detail)
            })
            .await;

        results
            .into_iter()
            .filter_map(|(id, detail)| detail.map(|detail| (id.to_string(), detail)))
            .collect()
    }

    /// Runs one task under the retry policy and reports how it ended
    async fn fetch_with_retry<T, F, Fut>(&self, phase: Phase, key: String, operation: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HarvestError>>,
    {
        let label = match phase {
            Phase::Page => format!("page {}", key),
            Phase::Detail => format!("item {}", key),
        };

        let result = self.retry.attempt(&label, operation).await;
        let outcome = match &result {
            FetchResult::Success { attempts, .. } => TaskOutcome::Succeeded {
                attempts: *attempts,
            },
            FetchResult::Failure { reason, attempts } => {
                tracing::warn!("Skipping {} after {} attempts: {}", label, attempts, reason);
                TaskOutcome::Failed {
                    attempts: *attempts,
                    reason: reason.clone(),
                }
            }
        };

        tracing::debug!("Finished {}", label);
        self.observer.on_event(&ProgressEvent::TaskFinished {
            phase,
            key,
            outcome,
        });

        result.into_result().ok()
    }

    /// One listing fetch+parse unit
    async fn fetch_listing(&self, url: &str, page: u32) -> Result<ParsedListing, HarvestError> {
        let detail_path = detail_path_prefix(&self.config.crawler)?;
        let body = self.transport.fetch(url).await?;
        parse_listing(&body, page, &detail_path).map_err(|message| HarvestError::ListingParse {
            url: url.to_string(),
            message,
        })
    }

    /// One detail fetch+parse unit
    async fn fetch_detail(&self, url: &str) -> Result<ItemDetail, HarvestError> {
        let body = self.transport.fetch(url).await?;
        parse_detail(&body).map_err(|message| HarvestError::DetailParse {
            url: url.to_string(),
            message,
        })
    }
}

/// Runs a complete harvest with the given configuration
///
/// # Example
///
/// ```no_run
/// use appid_harvest::config::Config;
/// use appid_harvest::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = run_crawl(Config::default()).await?;
/// println!("{} records", report.records.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlReport, HarvestError> {
    Crawler::new(config)?.run().await
}
