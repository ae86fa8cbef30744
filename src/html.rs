//! Visible text and anchor extraction from raw HTML bytes.

use once_cell::sync::Lazy;
use scraper::{Html, Node, Selector};

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("static selector"));
static BASE: Lazy<Selector> = Lazy::new(|| Selector::parse("base[href]").expect("static selector"));

/// Elements whose text never reaches the reader.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedPage {
    /// Visible text, one space between text nodes
    pub text: String,
    /// Raw `href` values of every anchor, in document order
    pub hrefs: Vec<String>,
    /// `href` of the first `<base>` element, if any
    pub base_href: Option<String>,
}

pub trait HtmlExtractor: Send + Sync {
    fn extract(&self, raw: &[u8]) -> ExtractedPage;
}

/// [`HtmlExtractor`] backed by the `scraper` HTML parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScraperExtractor;

impl HtmlExtractor for ScraperExtractor {
    fn extract(&self, raw: &[u8]) -> ExtractedPage {
        let source = String::from_utf8_lossy(raw);
        let document = Html::parse_document(&source);

        let base_href = document
            .select(&BASE)
            .next()
            .and_then(|element| element.value().attr("href"))
            .map(str::to_string);

        let hrefs = document
            .select(&ANCHOR)
            .filter_map(|element| element.value().attr("href"))
            .map(str::to_string)
            .collect();

        ExtractedPage {
            text: visible_text(&document),
            hrefs,
            base_href,
        }
    }
}

fn visible_text(document: &Html) -> String {
    let mut text = String::new();
    for node in document.root_element().descendants() {
        let Node::Text(text_node) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if hidden {
            continue;
        }
        let t = text_node.trim();
        if !t.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(t);
        }
    }
    text
}
