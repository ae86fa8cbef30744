use std::collections::HashSet;

use crate::canonical::CanonicalUrl;

/// In-memory record of what the crawler has already queued.
pub struct Frontier {
    max_pages: Option<usize>,
    queued: HashSet<CanonicalUrl>,
}

impl Frontier {
    pub fn new(max_pages: Option<usize>) -> Frontier {
        Frontier {
            max_pages,
            queued: HashSet::new(),
        }
    }

    /// Mark the given page as queued, returning false if it was queued before
    /// or the page limit has been reached.
    pub fn mark_queued(&mut self, url: &CanonicalUrl) -> bool {
        if !self.has_capacity() || self.queued.contains(url) {
            return false;
        }
        self.queued.insert(url.clone())
    }

    pub fn has_capacity(&self) -> bool {
        self.max_pages.map_or(true, |max| self.queued.len() < max)
    }

    pub fn queued_count(&self) -> usize {
        self.queued.len()
    }
}
