//! Page fetching and title/text extraction for the ingestion fallback.
//!
//! When the indexing backend cannot derive text from a submitted page
//! itself, the bot fetches the page and extracts a title and the visible
//! body text. The fetch asks for markdown first and falls back to HTML;
//! script, style, and noscript content is dropped before text extraction.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::error::{BotError, Result};

/// Fetched bodies larger than this are rejected.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

const ACCEPT_MARKDOWN: &str = "text/markdown";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml";

/// Title and visible text extracted from a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub text: String,
}

/// Fetches pages and extracts their readable content.
pub struct PageExtractor {
    http: reqwest::Client,
}

impl PageExtractor {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("selkie/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BotError::Extractor(format!("build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Fetch `url` and extract its title and visible text.
    pub async fn extract_page(&self, url: &str) -> Result<Page> {
        let url = url.trim();
        if url.is_empty() {
            return Err(BotError::Extractor("empty URL".into()));
        }
        let body = match self.fetch(url, ACCEPT_MARKDOWN).await {
            Ok(body) => body,
            Err(_) => self.fetch(url, ACCEPT_HTML).await?,
        };
        Ok(parse_page(&body))
    }

    async fn fetch(&self, url: &str, accept: &str) -> Result<String> {
        let mut response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await
            .map_err(|e| BotError::Extractor(format!("fetch {url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Extractor(format!(
                "fetch {url}: status {status}"
            )));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| BotError::Extractor(format!("read {url}: {e}")))?
        {
            if body.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(BotError::Extractor("response body too large".into()));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl selkie_index::ContentSource for PageExtractor {
    async fn extract(&self, url: &str) -> anyhow::Result<(String, String)> {
        let page = self.extract_page(url).await?;
        Ok((page.title, page.text))
    }
}

fn parse_page(html: &str) -> Page {
    let stripped = strip_hidden_elements(html);
    let document = Html::parse_document(&stripped);
    Page {
        title: element_text(&document, "title"),
        text: element_text(&document, "body"),
    }
}

/// First matching element's text with whitespace collapsed.
fn element_text(document: &Html, selector: &str) -> String {
    let Ok(selector) = Selector::parse(selector) else {
        return String::new();
    };
    let raw = document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop `<script>`, `<style>`, and `<noscript>` elements with their
/// content. The parser's text traversal would otherwise include them.
fn strip_hidden_elements(html: &str) -> String {
    let mut result = html.to_owned();
    for tag in ["script", "style", "noscript"] {
        result = strip_element(&result, tag);
    }
    result
}

fn strip_element(html: &str, tag: &str) -> String {
    let lower = html.to_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let mut kept = String::with_capacity(html.len());
    let mut pos = 0;
    while let Some(offset) = lower[pos..].find(&open) {
        let start = pos + offset;
        let after = start + open.len();
        // Reject prefix matches like <style> vs <styles>.
        let is_tag = lower[after..]
            .chars()
            .next()
            .is_some_and(|c| c.is_whitespace() || c == '>' || c == '/');
        if !is_tag {
            kept.push_str(&html[pos..after]);
            pos = after;
            continue;
        }
        kept.push_str(&html[pos..start]);
        pos = match lower[start..].find(&close) {
            Some(end) => start + end + close.len(),
            None => match lower[start..].find('>') {
                Some(end) => start + end + 1,
                None => html.len(),
            },
        };
    }
    kept.push_str(&html[pos..]);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, headers, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn title_and_body_text_are_extracted() {
        let page = parse_page(
            "<html><head><title> A  Title </title></head><body><p>Hello</p> <p>world</p></body></html>",
        );
        assert_eq!(page.title, "A Title");
        assert_eq!(page.text, "Hello world");
    }

    #[test]
    fn missing_elements_yield_empty_fields() {
        let page = parse_page("<p>fragment</p>");
        assert_eq!(page.title, "");
        // html5ever wraps fragments in an implied body.
        assert_eq!(page.text, "fragment");
    }

    #[test]
    fn script_style_noscript_are_stripped() {
        let page = parse_page(
            r#"<html><body>
                <p>Visible</p>
                <script>alert("hi")</script>
                <style>.x { color: red }</style>
                <noscript>Enable JS</noscript>
            </body></html>"#,
        );
        assert_eq!(page.text, "Visible");
    }

    #[test]
    fn strip_does_not_eat_similarly_named_tags() {
        let page = parse_page("<body><styles>kept</styles><style>gone</style></body>");
        assert_eq!(page.text, "kept");
    }

    #[test]
    fn whitespace_is_collapsed() {
        let page = parse_page("<body>one\n\n   two\t three</body>");
        assert_eq!(page.text, "one two three");
    }

    #[tokio::test]
    async fn markdown_rejection_falls_back_to_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("accept", ACCEPT_MARKDOWN))
            .respond_with(ResponseTemplate::new(406))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(headers("accept", ACCEPT_HTML.split(',').collect()))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><head><title>T</title></head><body>B</body></html>",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let extractor = PageExtractor::new(Duration::from_secs(5)).unwrap();
        let page = extractor
            .extract_page(&format!("{}/page", server.uri()))
            .await
            .unwrap();
        assert_eq!(page.title, "T");
        assert_eq!(page.text, "B");
    }

    #[tokio::test]
    async fn oversized_bodies_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("x".repeat(MAX_BODY_BYTES + 1)),
            )
            .mount(&server)
            .await;

        let extractor = PageExtractor::new(Duration::from_secs(5)).unwrap();
        let err = extractor
            .extract_page(&format!("{}/big", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn http_error_on_both_accepts_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .expect(2)
            .mount(&server)
            .await;

        let extractor = PageExtractor::new(Duration::from_secs(5)).unwrap();
        let err = extractor
            .extract_page(&format!("{}/gone", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("status"));
    }
}
