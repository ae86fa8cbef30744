//! Tokenizing and word counting for extracted page text.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::stopwords::is_stop_word;

/// Pages with fewer filtered tokens than this are left out of word statistics.
pub const LOW_TEXT_THRESHOLD: usize = 100;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-z]{2,}\b").expect("static regex"));

/// Per-page word counts.
pub type TokenFrequency = HashMap<String, u64>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageText {
    pub tokens: Vec<String>,
    pub frequencies: TokenFrequency,
}

impl PageText {
    pub fn word_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_low_text(&self) -> bool {
        self.word_count() < LOW_TEXT_THRESHOLD
    }

    /// The frequencies to record for this page, or `None` for a low-text page.
    pub fn countable_frequencies(&self) -> Option<&TokenFrequency> {
        (!self.is_low_text()).then_some(&self.frequencies)
    }
}

/// Lowercased runs of at least two ASCII letters, with stop words removed.
///
/// A run glued to digits or underscores (`abc123`) has no word boundary and is skipped.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD.find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|word| !is_stop_word(word))
        .map(str::to_string)
        .collect()
}

pub fn compute_word_frequencies(tokens: &[String]) -> TokenFrequency {
    let mut frequencies = TokenFrequency::new();
    for token in tokens {
        *frequencies.entry(token.clone()).or_insert(0) += 1;
    }
    frequencies
}

pub fn analyze(text: &str) -> PageText {
    let tokens = tokenize(text);
    let frequencies = compute_word_frequencies(&tokens);
    PageText {
        tokens,
        frequencies,
    }
}
