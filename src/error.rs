//! Error taxonomy for the scrape → normalize → classify pipeline.
//!
//! Per-article failures ([`Error::FetchFailed`], [`Error::ExtractionFailed`],
//! [`Error::UnknownSource`], [`Error::FieldNotFound`]) are caught by the
//! ingestion pipeline and logged against the offending URL. Everything else is
//! fatal to the current run and bubbles up to `main`.

use std::path::PathBuf;

/// Every failure the crate can report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network error, non-success HTTP status or timeout.
    #[error("fetch failed for {url}: {message}")]
    FetchFailed { url: String, message: String },

    /// The server refused the request itself (a 4xx other than 429); asking
    /// again cannot succeed.
    #[error("request rejected for {url}: {message}")]
    FetchRejected { url: String, message: String },

    /// The page was fetched but its HTML does not contain the expected container.
    #[error("extraction failed for {url}: {message}")]
    ExtractionFailed { url: String, message: String },

    /// No registered publisher domain is a substring of the URL.
    #[error("no extraction rule registered for {0}")]
    UnknownSource(String),

    /// A snippet lacks a field the pipeline needs.
    #[error("field `{0}` not found in snippet")]
    FieldNotFound(String),

    /// Connection or query failure in the article store.
    #[error("storage failed during {operation}: {message}")]
    StorageFailed { operation: String, message: String },

    /// Invalid or missing configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Unreadable or inconsistent frozen model artifacts.
    #[error("model error: {0}")]
    Model(String),

    /// Filesystem I/O with the path that caused it.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn fetch(url: impl Into<String>, message: impl ToString) -> Self {
        Self::FetchFailed {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn rejected(url: impl Into<String>, message: impl ToString) -> Self {
        Self::FetchRejected {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Whether the same request may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchFailed { .. })
    }

    pub fn extraction(url: impl Into<String>, message: impl ToString) -> Self {
        Self::ExtractionFailed {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Wrap any storage backend error, naming the operation that failed.
    pub fn storage(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::StorageFailed {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::fetch("https://yahoo.com/x", "HTTP 503");
        assert_eq!(err.to_string(), "fetch failed for https://yahoo.com/x: HTTP 503");

        let err = Error::FieldNotFound("url".to_string());
        assert_eq!(err.to_string(), "field `url` not found in snippet");

        let err = Error::storage("insert", "database is locked");
        assert!(err.to_string().contains("insert"));
    }

    #[test]
    fn test_only_transient_fetch_errors_are_retryable() {
        assert!(Error::fetch("http://x", "HTTP 503 Service Unavailable").is_retryable());
        assert!(!Error::rejected("http://x", "HTTP 401 Unauthorized").is_retryable());
        assert!(!Error::config("missing key").is_retryable());
    }
}
