//! News API downloads and the staging files they land in.
//!
//! `fetch` writes each feed's raw response as one compact JSON line to the
//! feed's staging file; `scrape` later reads those files back with
//! [`read_snippets`]. The staging files are kept between runs, so a scrape can
//! be repeated without calling the API again.
//!
//! # Retry Strategy
//!
//! Downloads go through [`RetryDownload`], which retries a failing
//! [`Download`] with exponential backoff. Only transient failures are retried
//! (network errors, 5xx and 429); any other 4xx is [`Error::FetchRejected`]
//! and returned at once:
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use crate::config::FeedConfig;
use crate::error::{Error, Result};
use crate::utils::{ensure_parent_dir, truncate_for_log};
use rand::{Rng, rng};
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Something that can GET a URL and hand back the decoded body.
pub trait Download {
    async fn download(&self, url: &str, encoding: &str) -> Result<String>;
}

/// [`Download`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpDownload {
    client: reqwest::Client,
}

impl HttpDownload {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Download for HttpDownload {
    async fn download(&self, url: &str, encoding: &str) -> Result<String> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::fetch(redact(url), e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, elapsed_ms = t0.elapsed().as_millis() as u64, "Feed request rejected");
            let message = format!("HTTP {status}");
            return Err(
                if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
                    Error::rejected(redact(url), message)
                } else {
                    Error::fetch(redact(url), message)
                },
            );
        }

        response
            .text_with_charset(encoding)
            .await
            .map_err(|e| Error::fetch(redact(url), e))
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Download`].
pub struct RetryDownload<T> {
    inner: T,
    /// Attempts after the first one.
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T: Download> RetryDownload<T> {
    /// Wrap `inner` with up to `max_retries` extra attempts.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let downloader = RetryDownload::new(HttpDownload::new(client), 2, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryDownload<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryDownload")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T: Download> Download for RetryDownload<T> {
    #[instrument(level = "info", skip_all)]
    async fn download(&self, url: &str, encoding: &str) -> Result<String> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.download(url, encoding).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if !e.is_retryable() {
                        error!(
                            attempt,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "download() failed permanently; not retrying"
                        );
                        return Err(e);
                    }
                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "download() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self
                        .base_delay
                        .saturating_mul(1 << (attempt - 1).min(16))
                        .min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "download() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Query string for `feed`: configured params plus the API key, sorted by name.
pub fn build_query(feed: &FeedConfig) -> Result<String> {
    let mut params: BTreeMap<&str, String> = BTreeMap::new();
    for (name, value) in &feed.params {
        let value = match value {
            serde_yaml::Value::String(s) => s.clone(),
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            _ => {
                return Err(Error::config(format!(
                    "feed `{}`: parameter `{name}` must be a scalar",
                    feed.name
                )));
            }
        };
        params.insert(name, value);
    }

    if let Some(var) = &feed.api_key_env {
        let key = std::env::var(var).map_err(|_| {
            Error::config(format!("feed `{}`: environment variable {var} is not set", feed.name))
        })?;
        params.insert(&feed.api_key_param, key);
    }

    Ok(params
        .iter()
        .map(|(name, value)| format!("{}={}", urlencoding::encode(name), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&"))
}

/// Full request URL: endpoint + path template with `{}` replaced by the query.
pub fn feed_url(feed: &FeedConfig) -> Result<String> {
    let query = build_query(feed)?;
    Ok(format!(
        "{}{}",
        feed.endpoint.trim_end_matches('/'),
        feed.path.replacen("{}", &query, 1)
    ))
}

/// Download one feed into its staging file.
///
/// The staging file is overwritten with the whole response as a single JSON
/// line, even when the response holds no snippets.
///
/// # Arguments
///
/// * `source` - Transport used for the request, usually a [`RetryDownload`]
/// * `feed` - The feed to query; its params and API key build the URL
///
/// # Returns
///
/// The number of snippets under the feed's `article_list` field. Fails when
/// the API key variable is unset, the request fails, the body is not JSON or
/// the staging file cannot be written.
///
/// # Example
///
/// ```ignore
/// let downloader = RetryDownload::new(HttpDownload::new(client), 2, Duration::from_secs(1));
/// let count = download_feed(&downloader, &config.feeds[0]).await?;
/// ```
#[instrument(level = "info", skip_all, fields(feed = %feed.name))]
pub async fn download_feed<D: Download>(source: &D, feed: &FeedConfig) -> Result<usize> {
    let t0 = Instant::now();
    let url = feed_url(feed)?;
    debug!(url = %redact(&url), "Requesting feed");

    let body = source.download(&url, &feed.encoding).await?;
    let document: Value = serde_json::from_str(&body).map_err(|e| {
        Error::fetch(
            redact(&url),
            format!("response is not JSON ({e}): {}", truncate_for_log(&body, 120)),
        )
    })?;

    let snippets = document
        .get(&feed.article_list)
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    if snippets == 0 {
        warn!(article_list = %feed.article_list, "Feed response holds no snippets");
    }

    write_staging(&feed.output, &document).await?;
    info!(
        snippets,
        output = %feed.output.display(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Feed downloaded"
    );
    Ok(snippets)
}

async fn write_staging(path: &Path, document: &Value) -> Result<()> {
    ensure_parent_dir(path).await?;
    let mut line = serde_json::to_string(document)?;
    line.push('\n');
    tokio::fs::write(path, line)
        .await
        .map_err(|e| Error::io(path, e))
}

/// Every snippet of every line of the feed's staging file, in file order.
#[instrument(level = "info", skip_all, fields(feed = %feed.name))]
pub async fn read_snippets(feed: &FeedConfig) -> Result<Vec<Value>> {
    let text = tokio::fs::read_to_string(&feed.output)
        .await
        .map_err(|e| Error::io(&feed.output, e))?;

    let mut snippets = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut document: Value = serde_json::from_str(line)?;
        match document.get_mut(&feed.article_list).map(Value::take) {
            Some(Value::Array(items)) => snippets.extend(items),
            _ => warn!(
                line = index + 1,
                article_list = %feed.article_list,
                "Staging line has no snippet array; skipping"
            ),
        }
    }

    info!(count = snippets.len(), "Read snippets");
    Ok(snippets)
}

/// Hide the value of any `access_key`-like parameter before logging a URL.
fn redact(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.query().is_some() => {
            let pairs: Vec<(String, String)> = parsed
                .query_pairs()
                .map(|(k, v)| {
                    let hidden = k.contains("key") || k.contains("token");
                    (k.into_owned(), if hidden { "***".to_string() } else { v.into_owned() })
                })
                .collect();
            parsed.query_pairs_mut().clear().extend_pairs(pairs);
            parsed.into()
        }
        _ => url.to_string(),
    }
}
