use std::collections::HashMap;

use url::Url;

/// What the fetch layer hands over for one URL.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    /// The URL that was requested
    pub requested_url: String,
    /// The URL after redirects
    pub final_url: String,
    pub status: u16,
    /// Set when the fetch failed or the server answered with an error
    pub error: Option<String>,
    pub body: Option<Vec<u8>>,
    pub headers: HashMap<String, String>,
}

impl FetchResponse {
    /// Header lookup ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// The body, unless it is missing or empty.
    pub fn content(&self) -> Option<&[u8]> {
        self.body.as_deref().filter(|body| !body.is_empty())
    }

    /// The address the page is recorded under: the final URL, or the requested one when
    /// the fetch layer did not report a final URL.
    pub fn page_url(&self) -> &str {
        if self.final_url.trim().is_empty() {
            &self.requested_url
        } else {
            &self.final_url
        }
    }

    /// Whether the body should be parsed as HTML. Without a declared content type the
    /// URL's extension decides.
    pub fn is_html(&self, url: &Url) -> bool {
        match self.content_type() {
            Some(content_type) => is_html_content_type(content_type),
            None => is_likely_html_content(url),
        }
    }
}

pub fn is_html_content_type(content_type: &str) -> bool {
    let lower = content_type.trim().to_ascii_lowercase();
    lower.starts_with("text/html") || lower.starts_with("application/xhtml+xml")
}

pub fn is_likely_html_content(url: &Url) -> bool {
    let path = url.path().to_lowercase();

    // If no extension or ends with /, assume it's HTML
    if path.is_empty() || path.ends_with('/') {
        return true;
    }

    let last_segment = path.rsplit('/').next().unwrap_or_default();
    match last_segment.rsplit_once('.') {
        Some((_, extension)) => matches!(
            extension,
            "html" | "htm" | "xhtml" | "php" | "asp" | "aspx" | "jsp" | "cfm" | "cgi" | "pl" | "py" | "rb"
        ),
        // No extension, likely HTML (like /~user/about or /people)
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with(headers: &[(&str, &str)]) -> FetchResponse {
        FetchResponse {
            requested_url: "https://www.ics.uci.edu/".to_string(),
            final_url: "https://www.ics.uci.edu/".to_string(),
            status: 200,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let response = response_with(&[("Content-Type", "text/html; charset=utf-8")]);
        assert_eq!(response.content_type(), Some("text/html; charset=utf-8"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("text/html; charset=utf-8"));
        assert_eq!(response.header("content-length"), None);
    }

    #[test]
    fn test_is_html() {
        let url = Url::parse("https://www.ics.uci.edu/paper.pdf").unwrap();
        assert!(response_with(&[("content-type", "text/html")]).is_html(&url));
        assert!(response_with(&[("content-type", "application/xhtml+xml")]).is_html(&url));
        assert!(!response_with(&[("content-type", "application/pdf")]).is_html(&url));
        // no declared type: fall back to the extension
        assert!(!response_with(&[]).is_html(&url));
        let page = Url::parse("https://www.ics.uci.edu/about").unwrap();
        assert!(response_with(&[]).is_html(&page));
    }

    #[test]
    fn test_content_and_page_url() {
        let mut response = response_with(&[]);
        assert_eq!(response.content(), None);
        response.body = Some(Vec::new());
        assert_eq!(response.content(), None);
        response.body = Some(b"<html></html>".to_vec());
        assert!(response.content().is_some());

        response.final_url = String::new();
        response.requested_url = "https://cs.uci.edu/x".to_string();
        assert_eq!(response.page_url(), "https://cs.uci.edu/x");
    }

    #[test]
    fn test_is_likely_html_content() {
        let html_urls = vec![
            "https://example.com/",
            "https://example.com/dir/",
            "https://example.com/page.html",
            "https://example.com/page.htm",
            "https://example.com/page.php",
            "https://example.com/~user/about",
        ];

        for url_str in html_urls {
            let url = Url::parse(url_str).unwrap();
            assert!(is_likely_html_content(&url), "Should detect {} as HTML", url_str);
        }

        let non_html_urls = vec![
            "https://example.com/image.jpg",
            "https://example.com/document.pdf",
            "https://example.com/archive.zip",
            "https://example.com/style.css",
            "https://example.com/data.json",
        ];

        for url_str in non_html_urls {
            let url = Url::parse(url_str).unwrap();
            assert!(!is_likely_html_content(&url), "Should NOT detect {} as HTML", url_str);
        }
    }
}
