//! Link discovery and page bookkeeping for a crawler restricted to a set of domains.
//!
//! [`LinkScraper::scrape`] takes one fetched page and returns the canonical outlinks that
//! pass the [`TrapFilter`], recording the page in a shared [`StatsAggregator`] on the way.
//! The aggregated [`CrawlStatistics`] become a [`Report`] once the crawl ends.

pub mod canonical;
pub mod error;
pub mod filter;
pub mod frontier;
pub mod html;
pub mod links;
pub mod page_log;
pub mod report;
pub mod response;
pub mod stats;
pub mod stopwords;
pub mod text;

pub use canonical::{canonicalize, CanonicalUrl};
pub use error::{Error, Result};
pub use filter::{FilterConfig, Rule, TrapFilter, Verdict};
pub use frontier::Frontier;
pub use html::{ExtractedPage, HtmlExtractor, ScraperExtractor};
pub use links::LinkScraper;
pub use page_log::PageLog;
pub use report::Report;
pub use response::{is_likely_html_content, FetchResponse};
pub use stats::{CrawlStatistics, LongestPage, StatsAggregator};
pub use text::{analyze, PageText, TokenFrequency};

/// Format a byte count for log lines.
pub fn format_bytes(bytes: usize) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1_024 {
        format!("{:.1} KB", bytes as f64 / 1_024.0)
    } else {
        format!("{} B", bytes)
    }
}

/// Format elapsed seconds as `HH:MM:SS`.
pub fn format_duration(seconds: u64) -> String {
    let (hours, rem) = (seconds / 3600, seconds % 3600);
    let (minutes, secs) = (rem / 60, rem % 60);
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}
