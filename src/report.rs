//! End-of-crawl report.

use std::fmt;
use std::fs::{self, File};
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::stats::CrawlStatistics;

pub const TOP_WORDS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LongestPageEntry {
    pub url: String,
    pub word_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubdomainEntry {
    pub subdomain: String,
    pub pages: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordEntry {
    pub word: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub unique_pages: usize,
    pub longest_page: Option<LongestPageEntry>,
    pub subdomains: Vec<SubdomainEntry>,
    pub top_words: Vec<WordEntry>,
}

impl Report {
    pub fn from_statistics(stats: &CrawlStatistics) -> Report {
        Report {
            unique_pages: stats.unique_count(),
            longest_page: stats.longest_page.as_ref().map(|page| LongestPageEntry {
                url: page.url.to_string(),
                word_count: page.word_count,
            }),
            subdomains: stats
                .sorted_subdomains()
                .into_iter()
                .map(|(subdomain, pages)| SubdomainEntry {
                    subdomain: subdomain.to_string(),
                    pages,
                })
                .collect(),
            top_words: stats
                .top_words(TOP_WORDS)
                .into_iter()
                .map(|(word, count)| WordEntry {
                    word: word.to_string(),
                    count,
                })
                .collect(),
        }
    }

    pub fn write_text(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_string())?;
        Ok(())
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Unique pages: {}", self.unique_pages)?;
        match &self.longest_page {
            Some(page) => writeln!(f, "Longest page: {} ({} words)", page.url, page.word_count)?,
            None => writeln!(f, "Longest page: none")?,
        }

        writeln!(f)?;
        writeln!(f, "Subdomains ({}):", self.subdomains.len())?;
        for entry in &self.subdomains {
            writeln!(f, "{}, {}", entry.subdomain, entry.pages)?;
        }

        writeln!(f)?;
        writeln!(f, "Top {} words:", TOP_WORDS)?;
        for entry in &self.top_words {
            writeln!(f, "{}: {}", entry.word, entry.count)?;
        }
        Ok(())
    }
}
