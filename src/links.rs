//! Per-page link extraction: turns one fetch response into the outlinks worth crawling
//! and records the page in the crawl statistics on the way.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use crate::canonical::{canonicalize, CanonicalUrl};
use crate::error::Error;
use crate::filter::{TrapFilter, Verdict};
use crate::html::{HtmlExtractor, ScraperExtractor};
use crate::page_log::PageLog;
use crate::response::FetchResponse;
use crate::stats::StatsAggregator;
use crate::text::analyze;

pub struct LinkScraper<E = ScraperExtractor> {
    filter: TrapFilter,
    stats: Arc<StatsAggregator>,
    extractor: E,
    page_log: Option<PageLog>,
}

impl LinkScraper<ScraperExtractor> {
    pub fn new(filter: TrapFilter, stats: Arc<StatsAggregator>) -> LinkScraper<ScraperExtractor> {
        LinkScraper::with_extractor(filter, stats, ScraperExtractor)
    }
}

impl<E: HtmlExtractor> LinkScraper<E> {
    pub fn with_extractor(filter: TrapFilter, stats: Arc<StatsAggregator>, extractor: E) -> LinkScraper<E> {
        LinkScraper {
            filter,
            stats,
            extractor,
            page_log: None,
        }
    }

    pub fn with_page_log(mut self, page_log: PageLog) -> LinkScraper<E> {
        self.page_log = Some(page_log);
        self
    }

    pub fn stats(&self) -> &Arc<StatsAggregator> {
        &self.stats
    }

    pub fn filter(&self) -> &TrapFilter {
        &self.filter
    }

    /// Outlinks of the page that pass every trap and validity rule.
    pub fn scrape(&self, url: &str, response: Option<&FetchResponse>) -> Vec<CanonicalUrl> {
        self.extract_next_links(url, response)
            .into_iter()
            .filter(|link| match self.filter.evaluate(link.as_str()) {
                Ok(Verdict::Accept) => true,
                Ok(Verdict::Reject(rule)) => {
                    debug!(%link, %rule, "rejected link");
                    false
                }
                Err(err) => {
                    warn!(%link, error = %err, "canonical link failed to parse in filter");
                    false
                }
            })
            .collect()
    }

    /// Every distinct canonical outlink of the page, unfiltered.
    ///
    /// Any HTML response with a body is recorded in the statistics, whatever its status;
    /// links are only extracted from 200 responses.
    pub fn extract_next_links(&self, url: &str, response: Option<&FetchResponse>) -> Vec<CanonicalUrl> {
        let Some(response) = response else {
            debug!(url, "no response");
            return Vec::new();
        };
        let Some(body) = response.content() else {
            debug!(url, status = response.status, "empty body");
            return Vec::new();
        };

        let page_url = match page_identity(url, response) {
            Ok(page_url) => page_url,
            Err(err) => {
                warn!(url, error = %err, "cannot canonicalize page url");
                return Vec::new();
            }
        };
        if !response.is_html(page_url.as_url()) {
            debug!(%page_url, content_type = ?response.content_type(), "skipping non-html response");
            return Vec::new();
        }

        let page = self.extractor.extract(body);
        let text = analyze(&page.text);

        if let Some(page_log) = &self.page_log {
            if let Err(err) = page_log.append(&page_url, &text.frequencies) {
                warn!(%page_url, error = %err, "failed to write page log");
            }
        }
        self.stats.record_page(&page_url, text.countable_frequencies());

        if response.status != 200 {
            warn!(
                %page_url,
                status = response.status,
                error = response.error.as_deref().unwrap_or("none"),
                "non-200 response"
            );
            return Vec::new();
        }

        let base_url = resolve_base(page_url.as_url(), page.base_href.as_deref());
        let mut links = BTreeSet::new();
        for href in &page.hrefs {
            match canonicalize(&base_url, href) {
                Ok(link) => {
                    links.insert(link);
                }
                Err(err @ Error::UnsupportedScheme { .. }) => {
                    debug!(%page_url, %href, error = %err, "ignored link");
                }
                Err(err) => {
                    warn!(%page_url, %href, error = %err, "ignored unparsable link");
                }
            }
        }
        debug!(%page_url, links = links.len(), words = text.word_count(), "parsed page");
        links.into_iter().collect()
    }
}

fn page_identity(url: &str, response: &FetchResponse) -> Result<CanonicalUrl, Error> {
    let reported = response.page_url();
    if reported.trim().is_empty() {
        CanonicalUrl::parse(url)
    } else {
        CanonicalUrl::parse(reported)
    }
}

/// The URL relative links resolve against: `<base href>` when present and valid,
/// the page URL otherwise.
fn resolve_base(page_url: &Url, base_href: Option<&str>) -> Url {
    let Some(base_href) = base_href else {
        return page_url.clone();
    };
    match page_url.join(base_href) {
        Ok(resolved) => resolved,
        Err(err) => {
            debug!(%page_url, base_href, error = %err, "ignored invalid base href");
            page_url.clone()
        }
    }
}
