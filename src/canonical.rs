//! URL canonicalization.
//!
//! Every URL the crawler stores or compares goes through [`canonicalize`] (for hrefs found
//! on a page) or [`CanonicalUrl::parse`] (for already-absolute URLs such as the page's own
//! address), so both call sites agree on one form.

use std::fmt;

use url::Url;

use crate::error::{Error, Result};

/// A normalized absolute http(s) URL with no fragment and no explicit default port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalUrl(Url);

impl CanonicalUrl {
    /// Canonicalize an absolute URL string.
    pub fn parse(input: &str) -> Result<CanonicalUrl> {
        let url = Url::parse(input.trim()).map_err(|err| Error::url(input, err))?;
        normalize(url)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Host without the port; this is what the statistics call a subdomain.
    pub fn host(&self) -> &str {
        // normalize() refuses URLs without a host
        self.0.host_str().unwrap_or_default()
    }

    pub fn into_string(self) -> String {
        self.0.into()
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Resolve `raw_href` against `base` and normalize the result.
///
/// Relative paths, protocol-relative links (`//host/path`) and absolute links all resolve
/// with standard URL semantics. Links with a non-http(s) scheme (`mailto:`, `javascript:`)
/// are reported as [`Error::UnsupportedScheme`] so callers can skip them.
pub fn canonicalize(base: &Url, raw_href: &str) -> Result<CanonicalUrl> {
    let resolved = base
        .join(raw_href.trim())
        .map_err(|err| Error::url(raw_href, err))?;
    normalize(resolved)
}

fn normalize(mut url: Url) -> Result<CanonicalUrl> {
    url.set_fragment(None);

    // The parser already lowercases the scheme; anything left over is not crawlable.
    let scheme = url.scheme().to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(Error::UnsupportedScheme {
            scheme,
            url: url.to_string(),
        });
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::MissingHost(url.to_string()));
    }

    strip_default_port(&mut url);
    Ok(CanonicalUrl(url))
}

fn strip_default_port(url: &mut Url) {
    let default = match url.scheme() {
        "http" => 80,
        "https" => 443,
        _ => return,
    };
    if url.port() == Some(default) {
        // only fails for cannot-be-a-base urls, which have no host and were rejected above
        let _ = url.set_port(None);
    }
}
