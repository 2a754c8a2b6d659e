//! Snippet → [`RawArticle`] ingestion.
//!
//! For every snippet in the target language: pull its URL, find the
//! publisher's extraction rule, pull its title, fetch the page body. The URL
//! and title field names come from the feed's [`SnippetFields`]. Each
//! snippet is its own failure scope: an error is logged with the offending URL
//! and the batch moves on, and a snippet never yields a half-filled article.

use crate::config::FeedConfig;
use crate::error::Error;
use crate::models::RawArticle;
use crate::scrapers::{ArticleFetcher, ExtractionRule, PageSource, SourceRegistry};
use crate::snippet;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

/// One snippet that could not be turned into an article.
#[derive(Debug)]
pub struct IngestFailure {
    /// URL of the snippet, when it had one.
    pub url: Option<String>,
    pub error: Error,
}

/// Result of one ingestion batch.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Successfully scraped articles, in snippet order.
    pub articles: Vec<RawArticle>,
    pub failures: Vec<IngestFailure>,
    /// Snippets whose publisher has no extraction rule.
    pub unsupported: usize,
    /// Snippets dropped by the language filter.
    pub filtered: usize,
}

/// Names of the snippet fields holding the article URL and title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetFields {
    pub url: String,
    pub title: String,
}

impl Default for SnippetFields {
    fn default() -> Self {
        Self {
            url: "url".to_string(),
            title: "title".to_string(),
        }
    }
}

impl From<&FeedConfig> for SnippetFields {
    fn from(feed: &FeedConfig) -> Self {
        Self {
            url: feed.article_url.clone(),
            title: feed.article_title.clone(),
        }
    }
}

enum Outcome {
    Scraped(RawArticle),
    Unsupported,
    Failed(IngestFailure),
}

/// Drives the registry and fetcher over a batch of snippets.
pub struct Ingestor<'a, S> {
    registry: &'a SourceRegistry,
    fetcher: &'a ArticleFetcher<S>,
    concurrency: usize,
}

impl<'a, S: PageSource> Ingestor<'a, S> {
    pub fn new(registry: &'a SourceRegistry, fetcher: &'a ArticleFetcher<S>) -> Self {
        Self {
            registry,
            fetcher,
            concurrency: 1,
        }
    }

    /// Number of article pages fetched at the same time (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Scrape every snippet whose top-level `language` equals `target_language`.
    ///
    /// # Arguments
    ///
    /// * `snippets` - Snippet objects as read from a feed's staging file
    /// * `fields` - Names of the URL and title fields inside each snippet
    /// * `target_language` - Language code to keep; `None` disables the filter
    ///
    /// # Returns
    ///
    /// An [`IngestReport`] with the scraped articles in snippet order, one
    /// failure per snippet that could not be scraped, and the skip counts.
    /// Per-snippet errors never abort the batch.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let ingestor = Ingestor::new(&registry, &fetcher).with_concurrency(4);
    /// let report = ingestor
    ///     .ingest(&snippets, &SnippetFields::from(feed), feed.language.as_deref())
    ///     .await;
    /// store.insert_articles(&report.articles).await?;
    /// ```
    #[instrument(level = "info", skip_all, fields(snippets = snippets.len(), language = ?target_language))]
    pub async fn ingest(
        &self,
        snippets: &[Value],
        fields: &SnippetFields,
        target_language: Option<&str>,
    ) -> IngestReport {
        let kept: Vec<&Value> = snippets
            .iter()
            .filter(|s| match target_language {
                Some(lang) => snippet::language(s) == Some(lang),
                None => true,
            })
            .collect();

        let mut report = IngestReport {
            filtered: snippets.len() - kept.len(),
            ..Default::default()
        };

        let outcomes: Vec<Outcome> = stream::iter(kept)
            .map(|s| self.ingest_one(s, fields))
            .buffered(self.concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Outcome::Scraped(article) => report.articles.push(article),
                Outcome::Unsupported => report.unsupported += 1,
                Outcome::Failed(failure) => report.failures.push(failure),
            }
        }

        info!(
            scraped = report.articles.len(),
            failed = report.failures.len(),
            unsupported = report.unsupported,
            filtered = report.filtered,
            "Ingestion batch complete"
        );
        report
    }

    async fn ingest_one(&self, snippet: &Value, fields: &SnippetFields) -> Outcome {
        let url = match snippet::extract_str(snippet, &fields.url) {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, "Snippet has no usable url; skipping");
                return Outcome::Failed(IngestFailure { url: None, error: e });
            }
        };

        let Ok(rule) = self.registry.resolve(url) else {
            debug!(%url, "Publisher not supported; skipping");
            return Outcome::Unsupported;
        };

        match self.scrape(snippet, &fields.title, url, rule).await {
            Ok(article) => Outcome::Scraped(article),
            Err(e) => {
                error!(%url, error = %e, "Could not retrieve article");
                Outcome::Failed(IngestFailure {
                    url: Some(url.to_string()),
                    error: e,
                })
            }
        }
    }

    async fn scrape(
        &self,
        snippet: &Value,
        title_field: &str,
        url: &str,
        rule: &ExtractionRule,
    ) -> crate::error::Result<RawArticle> {
        let title = snippet::extract_str(snippet, title_field)?.to_string();
        let body_text = self.fetcher.fetch(url, rule).await?;
        Ok(RawArticle { title, body_text })
    }
}
