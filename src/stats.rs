//! Crawl-wide statistics shared by every worker.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use crate::canonical::CanonicalUrl;
use crate::text::TokenFrequency;

/// Longest page seen so far, by filtered word count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongestPage {
    pub url: CanonicalUrl,
    pub word_count: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    pub unique_urls: HashSet<CanonicalUrl>,
    pub subdomain_counts: HashMap<String, u64>,
    pub word_frequencies: HashMap<String, u64>,
    pub longest_page: Option<LongestPage>,
}

impl CrawlStatistics {
    /// Fold one page into the statistics. Returns true when the page was new.
    fn record_page(&mut self, page_url: &CanonicalUrl, frequencies: Option<&TokenFrequency>) -> bool {
        let is_new = self.unique_urls.insert(page_url.clone());
        if is_new {
            *self
                .subdomain_counts
                .entry(page_url.host().to_string())
                .or_insert(0) += 1;
        }

        if let Some(frequencies) = frequencies {
            let mut word_count = 0;
            for (word, count) in frequencies {
                *self.word_frequencies.entry(word.clone()).or_insert(0) += count;
                word_count += count;
            }

            let longest = self.longest_page.as_ref().map_or(0, |page| page.word_count);
            if word_count > longest {
                self.longest_page = Some(LongestPage {
                    url: page_url.clone(),
                    word_count,
                });
            }
        }

        is_new
    }

    pub fn unique_count(&self) -> usize {
        self.unique_urls.len()
    }

    /// Subdomains in lexicographic order with their page counts.
    pub fn sorted_subdomains(&self) -> Vec<(&str, u64)> {
        let mut subdomains: Vec<(&str, u64)> = self
            .subdomain_counts
            .iter()
            .map(|(host, count)| (host.as_str(), *count))
            .collect();
        subdomains.sort_unstable_by(|a, b| a.0.cmp(b.0));
        subdomains
    }

    /// The `n` most frequent words; equal counts are ordered alphabetically.
    pub fn top_words(&self, n: usize) -> Vec<(&str, u64)> {
        let mut words: Vec<(&str, u64)> = self
            .word_frequencies
            .iter()
            .map(|(word, count)| (word.as_str(), *count))
            .collect();
        words.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        words.truncate(n);
        words
    }
}

/// Thread-safe owner of the [`CrawlStatistics`].
///
/// A single lock guards all four fields, so the membership check, insert and counter
/// updates of one page are never interleaved with another page's.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    inner: Mutex<CrawlStatistics>,
}

impl StatsAggregator {
    pub fn new() -> StatsAggregator {
        StatsAggregator::default()
    }

    /// Record a processed page. Pass `None` for low-text pages: they still count as
    /// unique pages but leave word statistics untouched.
    pub fn record_page(&self, page_url: &CanonicalUrl, frequencies: Option<&TokenFrequency>) -> bool {
        self.inner.lock().record_page(page_url, frequencies)
    }

    pub fn unique_count(&self) -> usize {
        self.inner.lock().unique_count()
    }

    pub fn snapshot(&self) -> CrawlStatistics {
        self.inner.lock().clone()
    }

    /// Take the final statistics once no worker holds a reference any more.
    pub fn into_statistics(self) -> CrawlStatistics {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::text::analyze;

    fn url(s: &str) -> CanonicalUrl {
        CanonicalUrl::parse(s).unwrap()
    }

    #[test]
    fn test_record_same_page_twice() {
        let stats = StatsAggregator::new();
        let page = url("https://www.ics.uci.edu/a");

        assert!(stats.record_page(&page, None));
        assert!(!stats.record_page(&page, None));
        assert!(!stats.record_page(&url("https://www.ics.uci.edu:443/a#top"), None));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.unique_count(), 1);
        assert_eq!(snapshot.subdomain_counts.get("www.ics.uci.edu"), Some(&1));
    }

    #[test]
    fn test_subdomain_counts() {
        let stats = StatsAggregator::new();
        stats.record_page(&url("https://www.ics.uci.edu/a"), None);
        stats.record_page(&url("https://www.ics.uci.edu:8443/b"), None);
        stats.record_page(&url("http://vision.ics.uci.edu/"), None);
        stats.record_page(&url("https://cs.uci.edu/"), None);

        let snapshot = stats.into_statistics();
        assert_eq!(
            snapshot.sorted_subdomains(),
            vec![("cs.uci.edu", 1), ("vision.ics.uci.edu", 1), ("www.ics.uci.edu", 2)]
        );
    }

    #[test]
    fn test_word_frequencies_accumulate() {
        let stats = StatsAggregator::new();
        let first = analyze(&"kernel scheduler ".repeat(60));
        let second = analyze(&"kernel compiler ".repeat(50));

        stats.record_page(&url("https://www.ics.uci.edu/1"), first.countable_frequencies());
        stats.record_page(&url("https://www.ics.uci.edu/2"), second.countable_frequencies());

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.word_frequencies.get("kernel"), Some(&110));
        assert_eq!(snapshot.word_frequencies.get("scheduler"), Some(&60));
        assert_eq!(snapshot.word_frequencies.get("compiler"), Some(&50));
        assert_eq!(
            snapshot.longest_page,
            Some(LongestPage {
                url: url("https://www.ics.uci.edu/1"),
                word_count: 120,
            })
        );
    }

    #[test]
    fn test_low_text_page_leaves_words_untouched() {
        let stats = StatsAggregator::new();
        let short = analyze("kernel scheduler compiler");
        assert!(short.is_low_text());

        stats.record_page(&url("https://www.ics.uci.edu/short"), short.countable_frequencies());

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.unique_count(), 1);
        assert!(snapshot.word_frequencies.is_empty());
        assert!(snapshot.longest_page.is_none());
    }

    #[test]
    fn test_longest_page_needs_strictly_more_words() {
        let stats = StatsAggregator::new();
        let page = analyze(&"kernel ".repeat(150));
        stats.record_page(&url("https://www.ics.uci.edu/first"), page.countable_frequencies());
        stats.record_page(&url("https://www.ics.uci.edu/second"), page.countable_frequencies());

        let longest = stats.snapshot().longest_page.unwrap();
        assert_eq!(longest.url, url("https://www.ics.uci.edu/first"));
        assert_eq!(longest.word_count, 150);
    }

    #[test]
    fn test_top_words_ordering() {
        let mut stats = CrawlStatistics::default();
        stats.word_frequencies.insert("beta".to_string(), 5);
        stats.word_frequencies.insert("alpha".to_string(), 5);
        stats.word_frequencies.insert("gamma".to_string(), 9);
        stats.word_frequencies.insert("delta".to_string(), 1);

        assert_eq!(stats.top_words(3), vec![("gamma", 9), ("alpha", 5), ("beta", 5)]);
        assert_eq!(stats.top_words(50).len(), 4);
    }

    #[test]
    fn test_concurrent_recording_counts_each_page_once() {
        let stats = Arc::new(StatsAggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        let page = url(&format!("https://www.ics.uci.edu/p{}", i));
                        stats.record_page(&page, None);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = Arc::try_unwrap(stats).unwrap().into_statistics();
        assert_eq!(stats.unique_count(), 100);
        assert_eq!(stats.subdomain_counts.get("www.ics.uci.edu"), Some(&100));
    }
}
