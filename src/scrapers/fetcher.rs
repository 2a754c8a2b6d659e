//! Article page download and body extraction.
//!
//! Downloading goes through the [`PageSource`] trait so the extraction logic
//! and the ingestion pipeline can run against in-memory pages. The production
//! source is [`HttpPageSource`], a single GET per article with no retry.

use super::registry::ExtractionRule;
use crate::config::FetchConfig;
use crate::error::{Error, Result};
use reqwest::Client;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument};

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// Anything that can turn a URL into an HTML document.
pub trait PageSource {
    /// Download the page at `url`, failing with [`Error::FetchFailed`].
    async fn fetch_page(&self, url: &str) -> Result<String>;
}

/// [`PageSource`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
}

/// Client with the configured user agent and per-request timeout.
pub fn build_client(config: &FetchConfig) -> Result<Client> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| Error::config(format!("cannot build HTTP client: {e}")))
}

impl HttpPageSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl PageSource for HttpPageSource {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(url, format!("HTTP {status}")));
        }

        let body = response.text().await.map_err(|e| Error::fetch(url, e))?;
        debug!(bytes = body.len(), "Downloaded page");
        Ok(body)
    }
}

/// Fetches article pages and extracts their body text.
#[derive(Debug, Clone)]
pub struct ArticleFetcher<S> {
    pages: S,
}

impl<S: PageSource> ArticleFetcher<S> {
    pub fn new(pages: S) -> Self {
        Self { pages }
    }

    /// Download `url` and extract the text held by the container `rule` names.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn fetch(&self, url: &str, rule: &ExtractionRule) -> Result<String> {
        let html = self.pages.fetch_page(url).await?;
        let body = extract_body(&html, rule, url)?;
        info!(bytes = body.len(), "Parsed article");
        Ok(body)
    }
}

/// Text of every `<p>` under the first element matching `rule`.
///
/// Each paragraph is preceded by a newline, so two paragraphs `Hello.` and
/// `World.` give `"\nHello.\nWorld."`. A container without paragraphs yields
/// an empty string; a missing container is [`Error::ExtractionFailed`].
pub fn extract_body(html: &str, rule: &ExtractionRule, url: &str) -> Result<String> {
    let document = Html::parse_document(html);

    let container = document.select(rule.selector()).next().ok_or_else(|| {
        Error::extraction(
            url,
            format!("no <{}> element with class `{}`", rule.tag(), rule.class_name()),
        )
    })?;

    let mut text = String::new();
    for p in container.select(&PARAGRAPH) {
        text.push('\n');
        text.extend(p.text());
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StaticPages(HashMap<String, String>);

    impl PageSource for StaticPages {
        async fn fetch_page(&self, url: &str) -> Result<String> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| Error::fetch(url, "HTTP 404 Not Found"))
        }
    }

    fn caas_rule() -> ExtractionRule {
        ExtractionRule::new("div", "caas-body").unwrap()
    }

    #[test]
    fn test_extract_two_paragraphs() {
        let html = r#"<html><body>
            <div class="caas-body"><p>Hello.</p><p>World.</p></div>
        </body></html>"#;
        let body = extract_body(html, &caas_rule(), "u").unwrap();
        assert_eq!(body, "\nHello.\nWorld.");
    }

    #[test]
    fn test_extract_uses_first_container_and_nested_paragraphs() {
        let html = r#"
            <p>Outside.</p>
            <div class="caas-body">
                <section><p>Deep <b>bold</b> text.</p></section>
                <span>not a paragraph</span>
            </div>
            <div class="caas-body"><p>Second container.</p></div>"#;
        let body = extract_body(html, &caas_rule(), "u").unwrap();
        assert_eq!(body, "\nDeep bold text.");
    }

    #[test]
    fn test_extract_container_without_paragraphs() {
        let html = r#"<div class="caas-body">just text</div>"#;
        assert_eq!(extract_body(html, &caas_rule(), "u").unwrap(), "");
    }

    #[test]
    fn test_extract_missing_container() {
        let html = r#"<div class="other"><p>Hello.</p></div>"#;
        let err = extract_body(html, &caas_rule(), "https://yahoo.com/news/x").unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed { ref url, .. } if url == "https://yahoo.com/news/x"));
    }

    #[tokio::test]
    async fn test_fetcher_propagates_fetch_failure() {
        let fetcher = ArticleFetcher::new(StaticPages(HashMap::new()));
        let err = fetcher.fetch("https://yahoo.com/missing", &caas_rule()).await.unwrap_err();
        assert!(matches!(err, Error::FetchFailed { .. }));
    }

    #[tokio::test]
    async fn test_fetcher_extracts_from_page() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://yahoo.com/news/x".to_string(),
            r#"<div class="caas-body"><p>Hi.</p></div>"#.to_string(),
        );
        let fetcher = ArticleFetcher::new(StaticPages(pages));
        let body = fetcher.fetch("https://yahoo.com/news/x", &caas_rule()).await.unwrap();
        assert_eq!(body, "\nHi.");
    }

    #[test]
    fn test_http_source_builds_from_defaults() {
        assert!(build_client(&FetchConfig::default()).is_ok());
    }
}
