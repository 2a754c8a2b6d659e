//! Publisher registry: which HTML container holds the article body.
//!
//! Keys are plain substrings tested against the article URL, in configuration
//! order. The first key contained in the URL wins, so keys must be chosen so
//! that one is never a substring of a URL meant for another (`news.com` would
//! shadow `foxnews.com` if listed first).

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use scraper::Selector;
use std::fmt;
use tracing::debug;

/// Tag name plus class attribute locating the article body on one publisher.
#[derive(Clone)]
pub struct ExtractionRule {
    tag: String,
    class_name: String,
    selector: Selector,
}

impl ExtractionRule {
    /// Build a rule, compiling it to the CSS selector `tag.class`.
    ///
    /// A class attribute listing several classes (`"caas-body wide"`) requires
    /// the element to carry all of them.
    pub fn new(tag: &str, class_name: &str) -> Result<Self> {
        let tag = tag.trim();
        let class_name = class_name.trim();
        if tag.is_empty() || class_name.is_empty() {
            return Err(Error::config(format!(
                "extraction rule needs both a tag and a class (got tag `{tag}`, class `{class_name}`)"
            )));
        }

        let mut css = tag.to_string();
        for class in class_name.split_whitespace() {
            css.push('.');
            css.push_str(class);
        }
        let selector = Selector::parse(&css)
            .map_err(|e| Error::config(format!("invalid selector `{css}`: {e}")))?;

        Ok(Self {
            tag: tag.to_string(),
            class_name: class_name.to_string(),
            selector,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

impl fmt::Debug for ExtractionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionRule")
            .field("tag", &self.tag)
            .field("class_name", &self.class_name)
            .finish()
    }
}

impl PartialEq for ExtractionRule {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.class_name == other.class_name
    }
}

/// Ordered mapping from domain substring to [`ExtractionRule`].
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    entries: Vec<(String, ExtractionRule)>,
}

impl SourceRegistry {
    /// Build the registry from configuration, validating every rule.
    ///
    /// An empty registry could never resolve a URL, so it is a config error.
    pub fn from_config(sources: &[SourceConfig]) -> Result<Self> {
        let mut registry = Self::default();
        for source in sources {
            let rule = ExtractionRule::new(&source.tag, &source.class_name)?;
            registry.register(&source.domain, rule)?;
        }
        if registry.is_empty() {
            return Err(Error::config("at least one source must be registered"));
        }
        Ok(registry)
    }

    /// Append a rule; duplicate or empty domain keys are rejected.
    pub fn register(&mut self, domain: &str, rule: ExtractionRule) -> Result<()> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(Error::config("source domain must not be empty"));
        }
        if self.entries.iter().any(|(d, _)| d == domain) {
            return Err(Error::config(format!("source `{domain}` registered twice")));
        }
        self.entries.push((domain.to_string(), rule));
        Ok(())
    }

    /// Rule of the first registered domain contained in `url`.
    pub fn resolve(&self, url: &str) -> Result<&ExtractionRule> {
        match self.entries.iter().find(|(domain, _)| url.contains(domain.as_str())) {
            Some((domain, rule)) => {
                debug!(%url, %domain, "Resolved source");
                Ok(rule)
            }
            None => Err(Error::UnknownSource(url.to_string())),
        }
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(d, _)| d.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
