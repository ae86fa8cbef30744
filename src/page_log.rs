//! Append-only log of every parsed page and its word frequencies.

use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use parking_lot::Mutex;

use crate::canonical::CanonicalUrl;
use crate::error::Result;
use crate::text::TokenFrequency;

#[derive(Debug)]
pub struct PageLog {
    file: Mutex<File>,
}

impl PageLog {
    pub fn open(path: &Path) -> Result<PageLog> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(PageLog {
            file: Mutex::new(file),
        })
    }

    /// Write one block for `url`. Blocks from concurrent workers never interleave.
    pub fn append(&self, url: &CanonicalUrl, frequencies: &TokenFrequency) -> Result<()> {
        let entry = format_entry(url, frequencies);
        self.file.lock().write_all(entry.as_bytes())?;
        Ok(())
    }
}

fn format_entry(url: &CanonicalUrl, frequencies: &TokenFrequency) -> String {
    let mut words: Vec<(&String, &u64)> = frequencies.iter().collect();
    words.sort_unstable_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let mut entry = format!("{}\nWord frequencies:\n", url);
    for (word, count) in words {
        let _ = writeln!(entry, "{}: {}", word, count);
    }
    entry.push_str("\n\n");
    entry
}
