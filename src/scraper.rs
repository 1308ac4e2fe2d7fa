//! Web scraping module for content extraction.
//!
//! Uses reqwest for fetching and scraper for HTML parsing.

use crate::config::FetchConfig;
use crate::error::{Classify, ErrorKind};
use async_trait::async_trait;
use lazy_static::lazy_static;
use reqwest::{header, Client};
use scraper::{ElementRef, Html, Node, Selector};
use std::time::Duration;
use thiserror::Error;
use url::Url;

lazy_static! {
    static ref TITLE: Selector = Selector::parse("title").expect("valid selector");
    static ref H1: Selector = Selector::parse("h1").expect("valid selector");
    static ref BODY: Selector = Selector::parse("body").expect("valid selector");
}

/// Containers tried, in order, before falling back to the whole body
const MAIN_SELECTORS: [&str; 5] = ["article", "main", "[role='main']", ".content", "#content"];

/// Elements whose subtree never holds visible text
const SKIP_TAGS: [&str; 5] = ["script", "style", "noscript", "svg", "template"];

/// Elements that end a line of text
const BLOCK_TAGS: [&str; 16] = [
    "p", "div", "section", "article", "li", "ul", "ol", "br", "h1", "h2", "h3", "h4", "h5",
    "h6", "tr", "blockquote",
];

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("no extractable text found at {0}")]
    NoContent(String),
}

impl Classify for FetchError {
    fn kind(&self) -> ErrorKind {
        match self {
            FetchError::NoContent(_) => ErrorKind::Content,
            _ => ErrorKind::Network,
        }
    }
}

/// Extracted content from a webpage
#[derive(Debug, Clone)]
pub struct WebContent {
    /// The original URL
    pub url: String,
    /// Page title
    pub title: Option<String>,
    /// Main text content, already truncated to the character ceiling
    pub text: String,
    /// Characters extracted before truncation
    pub original_chars: usize,
    pub truncated: bool,
}

/// Anything that can turn a URL into page text
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<WebContent, FetchError>;
}

/// HTTP page fetcher
pub struct Fetcher {
    client: Client,
    max_chars: usize,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.5"),
        );

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            max_chars: config.max_chars,
        })
    }
}

#[async_trait]
impl PageSource for Fetcher {
    async fn fetch(&self, url: &str) -> Result<WebContent, FetchError> {
        let parsed = validate_url(url)?;
        tracing::debug!(url = %parsed, "fetching page");

        let network = |source: reqwest::Error| FetchError::Network {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(parsed).send().await.map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let body = response.text().await.map_err(network)?;

        let (title, text) = if content_type.is_empty() || content_type.contains("html") {
            let document = Html::parse_document(&body);
            (extract_title(&document), extract_text(&document))
        } else {
            (None, normalize_whitespace(&body))
        };

        if text.trim().is_empty() {
            return Err(FetchError::NoContent(url.to_string()));
        }

        let original_chars = text.chars().count();
        let text = truncate_chars(&text, self.max_chars).to_string();
        let truncated = original_chars > self.max_chars;
        if truncated {
            tracing::debug!(original_chars, max_chars = self.max_chars, "page text truncated");
        }

        Ok(WebContent {
            url: url.to_string(),
            title,
            text,
            original_chars,
            truncated,
        })
    }
}

/// Accept only absolute http(s) URLs with a host
pub fn validate_url(url: &str) -> Result<Url, FetchError> {
    let invalid = |reason: &str| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(url.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("only http and https are supported"));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(parsed)
}

/// Cut `text` to at most `max_chars` characters, on a character boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Extract the page title from <title> or <h1>
fn extract_title(document: &Html) -> Option<String> {
    [&*TITLE, &*H1].into_iter().find_map(|selector| {
        document
            .select(selector)
            .next()
            .map(|element| normalize_whitespace(&element.text().collect::<String>()))
            .filter(|title| !title.is_empty())
    })
}

/// Extract readable text content from the page
fn extract_text(document: &Html) -> String {
    // Try to find main content areas first
    for selector_str in MAIN_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                let text = element_text(element);
                if !text.is_empty() {
                    return text;
                }
            }
        }
    }

    // Fall back to the body, then the whole document
    match document.select(&BODY).next() {
        Some(body) => element_text(body),
        None => element_text(document.root_element()),
    }
}

fn element_text(element: ElementRef) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    normalize_whitespace(&raw)
}

/// Walk the subtree, skipping invisible elements and breaking lines at blocks
fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) => {
                if SKIP_TAGS.contains(&el.name()) {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
                if BLOCK_TAGS.contains(&el.name()) {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Collapse runs of spaces and drop blank lines
fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_never_exceeds_ceiling() {
        let text = "héllo wörld, ünïcode";
        for max in 0..30 {
            let cut = truncate_chars(text, max);
            assert!(cut.chars().count() <= max);
            assert!(text.starts_with(cut));
        }
        assert_eq!(truncate_chars(text, 5), "héllo");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://groq.com/").is_ok());
        assert!(validate_url("  http://example.com/page  ").is_ok());

        let err = validate_url("not a url").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
        assert!(validate_url("ftp://example.com/file").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_extract_strips_script_and_style() {
        let html = r#"
        <html><head><title> Test  Page </title><style>.x { color: red; }</style></head>
        <body>
            <script>var hidden = 1;</script>
            <h1>Heading</h1>
            <p>Visible   paragraph text.</p>
            <noscript>Enable JS</noscript>
        </body></html>
        "#;
        let document = Html::parse_document(html);
        assert_eq!(extract_title(&document).as_deref(), Some("Test Page"));

        let text = extract_text(&document);
        assert!(text.contains("Heading"));
        assert!(text.contains("Visible paragraph text."));
        assert!(!text.contains("hidden"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains("Enable JS"));
    }

    #[test]
    fn test_extract_prefers_main_content() {
        let html = r#"
        <html><body>
            <nav>Home About Contact</nav>
            <article><p>The article body.</p><p>Second paragraph.</p></article>
            <footer>Copyright</footer>
        </body></html>
        "#;
        let text = extract_text(&Html::parse_document(html));
        assert_eq!(text, "The article body.\nSecond paragraph.");
    }

    #[test]
    fn test_title_falls_back_to_h1() {
        let html = "<html><head><title>  </title></head><body><h1>Only Heading</h1></body></html>";
        let document = Html::parse_document(html);
        assert_eq!(extract_title(&document).as_deref(), Some("Only Heading"));
    }

    #[test]
    fn test_empty_document_has_no_text() {
        let html = "<html><body><script>only();</script></body></html>";
        assert!(extract_text(&Html::parse_document(html)).is_empty());
    }
}
