//! Crawler module for catalog harvesting
//!
//! This module contains the core harvesting logic, including:
//! - HTTP transport shared by all workers
//! - Fixed-delay retries around each fetch+parse unit
//! - Listing and detail page parsing
//! - A bounded worker pool for the two fan-out phases
//! - Aggregation of stubs and details into records
//! - Overall run coordination and progress events

mod aggregator;
mod coordinator;
mod fetcher;
mod parser;
mod progress;
mod retry;
mod scheduler;

pub use aggregator::{dedup_stubs, merge, Record, PORT_SEPARATOR};
pub use coordinator::{run_crawl, CrawlReport, Crawler};
pub use fetcher::{build_http_client, detail_path_prefix, detail_url, listing_url, Transport};
pub use parser::{parse_detail, parse_listing, ItemDetail, ItemStub, PageInfo, ParsedListing};
pub use progress::{Phase, ProgressEvent, ProgressObserver, TaskOutcome};
pub use retry::{FetchResult, RetryPolicy};
pub use scheduler::WorkerPool;
