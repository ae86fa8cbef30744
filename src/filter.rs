//! Crawl validity and trap filtering.
//!
//! A URL is crawlable only when every [`Rule`] accepts it. Rules are independent
//! predicates over [`UrlParts`]; their order only decides which rule gets reported when
//! several would reject the same URL. The file-extension rule always runs last.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

static PAGINATION_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/page/\d+(?:/|$)").expect("static regex"));

static DATE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\d{4}-\d{2}(?:-\d{2})?").expect("static regex"));

/// Extensions that never lead to an HTML page worth crawling.
pub const BLOCKED_EXTENSIONS: &[&str] = &[
    "css", "js", "bmp", "gif", "jpg", "jpeg", "ico", "png", "tif", "tiff", "mid", "mp2",
    "mp3", "mp4", "wav", "avi", "mov", "mpeg", "ram", "m4v", "mkv", "ogg", "ogv", "pdf",
    "ps", "eps", "tex", "ppt", "pptx", "doc", "docx", "xls", "xlsx", "names", "data", "dat",
    "exe", "bz2", "tar", "msi", "bin", "7z", "psd", "dmg", "iso", "epub", "dll", "cnf", "tgz",
    "sha1", "thmx", "mso", "arff", "rtf", "jar", "csv", "rm", "smil", "wmv", "swf", "wma",
    "zip", "rar", "gz",
];

/// Tunable inputs of the filter. Every field has a default so a partial JSON file works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Domains a host must equal or be a subdomain of
    pub allowed_domains: Vec<String>,
    /// UI-heavy hosts with nothing worth indexing
    pub blocked_hosts: Vec<String>,
    /// Hosts serving endless revision histories
    pub trap_hosts: Vec<String>,
    /// Query keys used for pagination
    pub pagination_keys: Vec<String>,
    /// Query keys of calendars, file tabs, revisions and login state
    pub blocked_query_keys: Vec<String>,
    /// Longest query string still accepted
    pub max_query_len: usize,
    /// Most `/` characters a path may contain
    pub max_path_depth: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        fn strings(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            allowed_domains: strings(&[
                "ics.uci.edu",
                "cs.uci.edu",
                "informatics.uci.edu",
                "stat.uci.edu",
            ]),
            blocked_hosts: strings(&["gitlab.ics.uci.edu"]),
            trap_hosts: strings(&["wiki.ics.uci.edu"]),
            pagination_keys: strings(&["paged"]),
            blocked_query_keys: strings(&[
                "ical",
                "outlook-ical",
                "tribe-bar-date",
                "tribe_event_display",
                "eventdisplay",
                "event_id",
                "calendar",
                "tab_files",
                "tab_details",
                "do",
                "image",
                "rev",
                "rev2",
                "difftype",
                "date",
                "year",
                "month",
                "day",
                "redirect_to",
                "action",
                "loggedout",
                "reauth",
                "share",
            ]),
            max_query_len: 100,
            max_path_depth: 10,
        }
    }
}

impl FilterConfig {
    /// Load a JSON config file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<FilterConfig> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// The parsed pieces of a URL the rules look at.
#[derive(Debug, Clone)]
pub struct UrlParts {
    scheme: String,
    host: String,
    path: String,
    query: Option<String>,
    query_keys: Vec<String>,
}

impl UrlParts {
    pub fn parse(input: &str) -> Result<UrlParts> {
        let url = Url::parse(input).map_err(|err| Error::url(input, err))?;
        Ok(UrlParts::from_url(&url))
    }

    pub fn from_url(url: &Url) -> UrlParts {
        UrlParts {
            scheme: url.scheme().to_ascii_lowercase(),
            host: url.host_str().unwrap_or_default().to_ascii_lowercase(),
            path: url.path().to_string(),
            query: url.query().map(str::to_string),
            query_keys: url
                .query_pairs()
                .map(|(key, _)| key.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }
}

/// One independent validity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Scheme,
    AllowedDomain,
    BlockedHost,
    PaginationPath,
    PaginationQuery,
    WordPressAdmin,
    TrapQueryParam,
    LongQuery,
    DatePath,
    PathDepth,
    WikiHost,
    GalleryDirectory,
    RepeatedSegments,
    FileExtension,
}

impl Rule {
    /// Every rule, cheapest host checks first and the extension check last.
    pub const ALL: [Rule; 14] = [
        Rule::Scheme,
        Rule::AllowedDomain,
        Rule::BlockedHost,
        Rule::WikiHost,
        Rule::PaginationPath,
        Rule::PaginationQuery,
        Rule::WordPressAdmin,
        Rule::TrapQueryParam,
        Rule::LongQuery,
        Rule::DatePath,
        Rule::PathDepth,
        Rule::GalleryDirectory,
        Rule::RepeatedSegments,
        Rule::FileExtension,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Rule::Scheme => "scheme",
            Rule::AllowedDomain => "allowed-domain",
            Rule::BlockedHost => "blocked-host",
            Rule::PaginationPath => "pagination-path",
            Rule::PaginationQuery => "pagination-query",
            Rule::WordPressAdmin => "wordpress-admin",
            Rule::TrapQueryParam => "trap-query-param",
            Rule::LongQuery => "long-query",
            Rule::DatePath => "date-path",
            Rule::PathDepth => "path-depth",
            Rule::WikiHost => "wiki-host",
            Rule::GalleryDirectory => "gallery-directory",
            Rule::RepeatedSegments => "repeated-segments",
            Rule::FileExtension => "file-extension",
        }
    }

    /// True when this rule rejects the URL.
    pub fn rejects(&self, parts: &UrlParts, config: &FilterConfig) -> bool {
        match self {
            Rule::Scheme => !matches!(parts.scheme.as_str(), "http" | "https"),
            Rule::AllowedDomain => !config
                .allowed_domains
                .iter()
                .any(|domain| host_within(&parts.host, domain)),
            Rule::BlockedHost => config
                .blocked_hosts
                .iter()
                .any(|host| host_within(&parts.host, host)),
            Rule::WikiHost => config
                .trap_hosts
                .iter()
                .any(|host| host_within(&parts.host, host)),
            Rule::PaginationPath => PAGINATION_PATH.is_match(&parts.path),
            Rule::PaginationQuery => has_any_key(parts, &config.pagination_keys),
            Rule::WordPressAdmin => {
                let path = parts.path.to_ascii_lowercase();
                path.contains("/wp-login") || path.contains("/wp-admin")
            }
            Rule::TrapQueryParam => has_any_key(parts, &config.blocked_query_keys),
            Rule::LongQuery => parts
                .query
                .as_ref()
                .is_some_and(|query| query.len() > config.max_query_len),
            Rule::DatePath => DATE_PATH.is_match(&parts.path),
            Rule::PathDepth => parts.path.matches('/').count() > config.max_path_depth,
            Rule::GalleryDirectory => parts.path.to_ascii_lowercase().contains("/pix/"),
            Rule::RepeatedSegments => {
                let segments = parts.segments();
                has_doubled_segment(&segments) || has_doubled_run(&segments)
            }
            Rule::FileExtension => has_blocked_extension(&parts.path),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(Rule),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

/// Ordered chain of [`Rule`]s with their configuration.
#[derive(Debug, Clone)]
pub struct TrapFilter {
    config: FilterConfig,
    rules: Vec<Rule>,
}

impl Default for TrapFilter {
    fn default() -> Self {
        TrapFilter::new(FilterConfig::default())
    }
}

impl TrapFilter {
    pub fn new(config: FilterConfig) -> TrapFilter {
        TrapFilter {
            config,
            rules: Rule::ALL.to_vec(),
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Run the chain and report the first rule that rejects the URL.
    ///
    /// A URL that does not parse is an error, never a verdict.
    pub fn evaluate(&self, url: &str) -> Result<Verdict> {
        let parts = UrlParts::parse(url)?;
        Ok(self.evaluate_parts(&parts))
    }

    pub fn evaluate_parts(&self, parts: &UrlParts) -> Verdict {
        self.rules
            .iter()
            .find(|rule| rule.rejects(parts, &self.config))
            .map_or(Verdict::Accept, |rule| Verdict::Reject(*rule))
    }

    pub fn is_valid(&self, url: &str) -> Result<bool> {
        Ok(self.evaluate(url)?.is_accept())
    }
}

fn host_within(host: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    host == domain
        || host
            .strip_suffix(domain.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn has_any_key(parts: &UrlParts, keys: &[String]) -> bool {
    if parts.query_keys.is_empty() {
        return false;
    }
    let blocked: HashSet<String> = keys.iter().map(|k| k.to_ascii_lowercase()).collect();
    parts.query_keys.iter().any(|key| blocked.contains(key))
}

/// `/a/a`: one segment directly followed by itself.
fn has_doubled_segment(segments: &[&str]) -> bool {
    segments.windows(2).any(|pair| pair[0] == pair[1])
}

/// `/a/b/a/b`: a run of two or more segments directly followed by itself.
fn has_doubled_run(segments: &[&str]) -> bool {
    let len = segments.len();
    (2..=len / 2).any(|run| {
        (0..=len - 2 * run).any(|start| {
            segments[start..start + run] == segments[start + run..start + 2 * run]
        })
    })
}

fn has_blocked_extension(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or_default();
    match last.rsplit_once('.') {
        Some((_, extension)) => {
            let extension = extension.to_ascii_lowercase();
            BLOCKED_EXTENSIONS.contains(&extension.as_str())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(url: &str) -> Verdict {
        TrapFilter::default().evaluate(url).unwrap()
    }

    fn rejects(rule: Rule, url: &str) -> bool {
        rule.rejects(&UrlParts::parse(url).unwrap(), &FilterConfig::default())
    }

    #[test]
    fn test_plain_pages_are_accepted() {
        let urls = vec![
            "https://www.ics.uci.edu/",
            "https://www.ics.uci.edu/about/index.html",
            "http://cs.uci.edu/people?id=4",
            "https://www.stat.uci.edu/a/b/c",
            "https://informatics.uci.edu/research/",
        ];

        for url in urls {
            assert_eq!(verdict(url), Verdict::Accept, "Should accept {}", url);
        }
    }

    #[test]
    fn test_scheme_rule() {
        assert!(rejects(Rule::Scheme, "ftp://www.ics.uci.edu/file"));
        assert!(!rejects(Rule::Scheme, "https://www.ics.uci.edu/"));
    }

    #[test]
    fn test_domain_rules() {
        assert_eq!(verdict("https://example.com/"), Verdict::Reject(Rule::AllowedDomain));
        assert_eq!(
            verdict("https://ics.uci.edu.evil.com/about"),
            Verdict::Reject(Rule::AllowedDomain)
        );
        assert_eq!(
            verdict("https://physics.uci.edu/"),
            Verdict::Reject(Rule::AllowedDomain)
        );
        assert_eq!(
            verdict("https://gitlab.ics.uci.edu/group/project"),
            Verdict::Reject(Rule::BlockedHost)
        );
        assert_eq!(
            verdict("https://wiki.ics.uci.edu/doku.php/start"),
            Verdict::Reject(Rule::WikiHost)
        );
    }

    #[test]
    fn test_pagination_rules() {
        assert!(rejects(Rule::PaginationPath, "https://www.ics.uci.edu/news/page/40"));
        assert!(rejects(Rule::PaginationPath, "https://www.ics.uci.edu/news/page/2/"));
        assert!(!rejects(Rule::PaginationPath, "https://www.ics.uci.edu/news/page/about"));
        assert!(rejects(Rule::PaginationQuery, "https://www.ics.uci.edu/news?paged=3"));
        assert!(!rejects(Rule::PaginationQuery, "https://www.ics.uci.edu/news?id=3"));
        assert!(TrapFilter::default().is_valid("https://www.ics.uci.edu/news").unwrap());
    }

    #[test]
    fn test_wordpress_admin_rule() {
        assert!(rejects(Rule::WordPressAdmin, "https://www.ics.uci.edu/wp-login.php"));
        assert!(rejects(Rule::WordPressAdmin, "https://www.ics.uci.edu/blog/wp-admin/x"));
        assert!(!rejects(Rule::WordPressAdmin, "https://www.ics.uci.edu/blog/wp-content/"));
    }

    #[test]
    fn test_query_rules() {
        assert!(rejects(Rule::TrapQueryParam, "https://www.ics.uci.edu/events?ical=1"));
        assert!(rejects(
            Rule::TrapQueryParam,
            "https://www.ics.uci.edu/events?tribe-bar-date=2020-01"
        ));
        assert!(rejects(Rule::TrapQueryParam, "https://www.ics.uci.edu/x?DO=media"));
        assert!(!rejects(Rule::TrapQueryParam, "https://www.ics.uci.edu/x?q=do"));

        let long = format!("https://www.ics.uci.edu/search?q={}", "a".repeat(99));
        assert!(rejects(Rule::LongQuery, &long));
        let short = format!("https://www.ics.uci.edu/search?q={}", "a".repeat(98));
        assert!(!rejects(Rule::LongQuery, &short));
    }

    #[test]
    fn test_date_path_rule() {
        assert!(rejects(Rule::DatePath, "https://www.ics.uci.edu/events/2019-05"));
        assert!(rejects(Rule::DatePath, "https://www.ics.uci.edu/events/2019-05-21/"));
        assert!(!rejects(Rule::DatePath, "https://www.ics.uci.edu/events/2019/"));
    }

    #[test]
    fn test_path_depth_rule() {
        assert!(!rejects(Rule::PathDepth, "https://www.ics.uci.edu/1/2/3/4/5/6/7/8/9/10"));
        assert!(rejects(Rule::PathDepth, "https://www.ics.uci.edu/1/2/3/4/5/6/7/8/9/10/11"));
    }

    #[test]
    fn test_gallery_rule() {
        assert!(rejects(Rule::GalleryDirectory, "https://www.ics.uci.edu/~x/pix/trip/"));
        assert!(!rejects(Rule::GalleryDirectory, "https://www.ics.uci.edu/~x/pixels"));
    }

    #[test]
    fn test_repeated_segments_rule() {
        assert!(rejects(Rule::RepeatedSegments, "https://www.ics.uci.edu/a/a"));
        assert!(rejects(Rule::RepeatedSegments, "https://www.ics.uci.edu/a/b/a/b"));
        assert!(rejects(Rule::RepeatedSegments, "https://www.ics.uci.edu/x/a/b/c/a/b/c/y"));
        assert!(!rejects(Rule::RepeatedSegments, "https://www.ics.uci.edu/a/b/c"));
        assert!(!rejects(Rule::RepeatedSegments, "https://www.ics.uci.edu/a/b/a"));
        assert!(!rejects(Rule::RepeatedSegments, "https://www.ics.uci.edu//a"));

        assert!(has_doubled_segment(&["x", "y", "y"]));
        assert!(!has_doubled_run(&["x", "y", "y"]));
        assert!(has_doubled_run(&["a", "b", "a", "b"]));
        assert!(!has_doubled_segment(&["a", "b", "a", "b"]));
    }

    #[test]
    fn test_extension_rule_is_case_insensitive() {
        let rejected = vec![
            "https://www.ics.uci.edu/paper.pdf",
            "https://www.ics.uci.edu/paper.PDF",
            "https://www.ics.uci.edu/code.zip",
            "https://www.ics.uci.edu/style.css",
            "https://www.ics.uci.edu/photo.JPeG",
            "https://www.ics.uci.edu/archive.tar.gz",
        ];
        for url in rejected {
            assert_eq!(verdict(url), Verdict::Reject(Rule::FileExtension), "{}", url);
        }

        assert_eq!(verdict("https://www.ics.uci.edu/index.html"), Verdict::Accept);
        assert_eq!(verdict("https://www.ics.uci.edu/v1.2/notes"), Verdict::Accept);
    }

    #[test]
    fn test_extension_rule_runs_last() {
        // pagination wins over extension when both apply
        assert_eq!(
            verdict("https://www.ics.uci.edu/page/3/file.pdf"),
            Verdict::Reject(Rule::PaginationPath)
        );
        assert_eq!(Rule::ALL.last(), Some(&Rule::FileExtension));
    }

    #[test]
    fn test_unparsable_url_is_an_error() {
        let filter = TrapFilter::default();
        assert!(matches!(
            filter.is_valid("www.ics.uci.edu/no-scheme"),
            Err(Error::UrlError { .. })
        ));
        assert!(filter.is_valid("").is_err());
    }

    #[test]
    fn test_custom_config() {
        let config = FilterConfig {
            allowed_domains: vec!["example.com".to_string()],
            max_path_depth: 2,
            ..Default::default()
        };
        let filter = TrapFilter::new(config);
        assert!(filter.is_valid("https://docs.example.com/a").unwrap());
        assert!(!filter.is_valid("https://www.ics.uci.edu/").unwrap());
        assert_eq!(
            filter.evaluate("https://example.com/a/b/c").unwrap(),
            Verdict::Reject(Rule::PathDepth)
        );
    }

    #[test]
    fn test_partial_json_config_keeps_defaults() {
        let config: FilterConfig =
            serde_json::from_str(r#"{"allowed_domains": ["example.org"]}"#).unwrap();
        assert_eq!(config.allowed_domains, vec!["example.org".to_string()]);
        assert_eq!(config.max_query_len, 100);
        assert_eq!(config.blocked_hosts, FilterConfig::default().blocked_hosts);
    }
}
