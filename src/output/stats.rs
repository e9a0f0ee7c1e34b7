//! Run statistics
//!
//! Counters collected by the coordinator and a plain-text rendering of them.

use std::time::Duration;

/// Harvest statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Item count the catalog itself reports
    pub total_reported: usize,

    /// Listing pages dispatched
    pub pages_planned: usize,

    /// Listing pages that failed after all retries
    pub pages_failed: usize,

    /// Detail pages dispatched (one per distinct item)
    pub details_planned: usize,

    /// Detail pages that failed after all retries
    pub details_failed: usize,

    /// Records produced
    pub records: usize,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl CrawlStats {
    /// Percentage of detail pages fetched successfully
    pub fn detail_success_rate(&self) -> f64 {
        if self.details_planned == 0 {
            return 100.0;
        }
        let succeeded = self.details_planned - self.details_failed.min(self.details_planned);
        succeeded as f64 / self.details_planned as f64 * 100.0
    }

    /// Whether anything was lost along the way
    pub fn is_partial(&self) -> bool {
        self.pages_failed > 0 || self.details_failed > 0 || self.records < self.total_reported
    }
}

/// Formats statistics as a plain-text block
pub fn format_statistics(stats: &CrawlStats) -> String {
    let mut out = String::new();

    out.push_str("=== Harvest Statistics ===\n\n");
    out.push_str(&format!("  Items reported by catalog: {}\n", stats.total_reported));
    out.push_str(&format!(
        "  Listing pages: {} ({} failed)\n",
        stats.pages_planned, stats.pages_failed
    ));
    out.push_str(&format!(
        "  Detail pages: {} ({} failed)\n",
        stats.details_planned, stats.details_failed
    ));
    out.push_str(&format!("  Records written: {}\n", stats.records));
    out.push_str(&format!(
        "  Detail success rate: {:.1}%\n",
        stats.detail_success_rate()
    ));
    out.push_str(&format!("  Elapsed: {:.1}s\n", stats.elapsed.as_secs_f64()));

    if stats.is_partial() {
        out.push_str("\n  Some data could not be fetched; affected rows are incomplete.\n");
    }

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &CrawlStats) {
    print!("{}", format_statistics(stats));
}
