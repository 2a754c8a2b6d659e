//! Data models flowing through the pipeline.
//!
//! - [`RawArticle`]: title and body text as extracted from a publisher page
//! - [`StoredArticle`]: a row waiting for a verdict in the article store
//! - [`NormalizedArticle`]: a stored row whose text went through the normalizer
//! - [`Verdict`]: the binary label assigned to one stored row

use serde::{Deserialize, Serialize};
use std::fmt;

/// An article as scraped from a publisher page.
///
/// Produced by the ingestion pipeline only when every step for the snippet
/// succeeded, so both fields are always populated from real data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawArticle {
    /// Headline taken from the API snippet.
    pub title: String,
    /// Paragraph text of the article container, each paragraph preceded by `\n`.
    pub body_text: String,
}

/// A row of the article store that has no verdict yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArticle {
    pub pk: i64,
    pub title: String,
    pub article: String,
}

/// A stored article with its text reduced to model-ready form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedArticle {
    pub pk: i64,
    pub title: String,
    /// Output of the last normalization stage.
    pub text: String,
}

/// Label assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerdictLabel {
    LikelyTrue,
    LikelyFalse,
}

impl VerdictLabel {
    /// Collapse a decoded classifier label into the binary verdict.
    ///
    /// Only the exact label `"REAL"` counts as true; every other label,
    /// including ones the system has never seen, is false.
    pub fn from_decoded(label: &str) -> Self {
        if label == "REAL" {
            Self::LikelyTrue
        } else {
            Self::LikelyFalse
        }
    }

    /// Text written to the verdict column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LikelyTrue => "Likely True",
            Self::LikelyFalse => "Likely False",
        }
    }
}

impl fmt::Display for VerdictLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final classification of one stored article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub pk: i64,
    pub label: VerdictLabel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_maps_to_likely_true() {
        assert_eq!(VerdictLabel::from_decoded("REAL"), VerdictLabel::LikelyTrue);
        assert_eq!(VerdictLabel::LikelyTrue.to_string(), "Likely True");
    }

    #[test]
    fn test_everything_else_maps_to_likely_false() {
        for label in ["FAKE", "real", "SATIRE", ""] {
            assert_eq!(VerdictLabel::from_decoded(label), VerdictLabel::LikelyFalse);
        }
        assert_eq!(VerdictLabel::LikelyFalse.as_str(), "Likely False");
    }

    #[test]
    fn test_raw_article_serialization() {
        let article = RawArticle {
            title: "T".to_string(),
            body_text: "\nHello.\nWorld.".to_string(),
        };
        let json = serde_json::to_string(&article).unwrap();
        let back: RawArticle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, article);
    }
}
