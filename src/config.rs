//! Runtime configuration, loaded once from a YAML file.
//!
//! The loaded [`Config`] is immutable and handed by reference to every stage.
//! Relative paths inside the file resolve against the directory holding the
//! file, so a project can be moved around as a unit.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

static TABLE_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "news_verdict.yaml";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// News API endpoints to download snippets from.
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
    /// Publisher extraction rules, matched in order.
    pub sources: Vec<SourceConfig>,
    pub storage: StorageConfig,
    /// Frozen model artifacts; only required by the `classify` stage.
    #[serde(default)]
    pub model: Option<ModelConfig>,
    #[serde(default)]
    pub nlp: NlpConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// One news API endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    /// Scheme and host, e.g. `http://api.mediastack.com`.
    pub endpoint: String,
    /// Path template; `{}` is replaced by the encoded query string.
    pub path: String,
    #[serde(default)]
    pub params: BTreeMap<String, serde_yaml::Value>,
    /// Environment variable holding the API key, if the API needs one.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_api_key_param")]
    pub api_key_param: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// Staging file the raw response is written to, one JSON document per line.
    pub output: PathBuf,
    /// Field of the response holding the snippet array.
    #[serde(default = "default_article_list")]
    pub article_list: String,
    /// Snippet field holding the article URL.
    #[serde(default = "default_article_url")]
    pub article_url: String,
    /// Snippet field holding the article title.
    #[serde(default = "default_article_title")]
    pub article_title: String,
    /// Only snippets in this language are ingested; `None` keeps everything.
    #[serde(default)]
    pub language: Option<String>,
}

fn default_api_key_param() -> String {
    "access_key".into()
}
fn default_encoding() -> String {
    "utf-8".into()
}
fn default_article_list() -> String {
    "data".into()
}
fn default_article_url() -> String {
    "url".into()
}
fn default_article_title() -> String {
    "title".into()
}

/// Where the article body lives on one publisher's pages.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    /// Substring matched against article URLs.
    pub domain: String,
    pub tag: String,
    #[serde(rename = "class")]
    pub class_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub database: PathBuf,
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_table() -> String {
    "news_articles".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub vectorizer: PathBuf,
    pub classifier: PathBuf,
    pub encoder: PathBuf,
}

/// Resources for the text normalizer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NlpConfig {
    /// Supplementary stopwords, one per line.
    #[serde(default)]
    pub stopwords: Option<PathBuf>,
    /// Lemma lookup table, `form<TAB>lemma` per line.
    #[serde(default)]
    pub lemmas: Option<PathBuf>,
}

/// HTTP behaviour shared by feed downloads and article fetches.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Article pages fetched at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Extra attempts for a failing feed download.
    #[serde(default = "default_feed_retries")]
    pub feed_retries: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            feed_retries: default_feed_retries(),
        }
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0".into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_concurrency() -> usize {
    1
}
fn default_feed_retries() -> usize {
    2
}

impl Config {
    /// Read, parse and validate the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml_str(&text, base_dir)
    }

    /// Parse YAML text, then validate it and resolve relative paths against `base_dir`.
    pub fn from_yaml_str(text: &str, base_dir: &Path) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(text)
            .map_err(|e| Error::config(format!("invalid YAML: {e}")))?;
        config.validate()?;
        config.resolve_paths(base_dir);
        Ok(config)
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base_dir.join(&*p);
            }
        };

        for feed in &mut self.feeds {
            resolve(&mut feed.output);
        }
        resolve(&mut self.storage.database);
        if let Some(model) = &mut self.model {
            resolve(&mut model.vectorizer);
            resolve(&mut model.classifier);
            resolve(&mut model.encoder);
        }
        if let Some(p) = &mut self.nlp.stopwords {
            resolve(p);
        }
        if let Some(p) = &mut self.nlp.lemmas {
            resolve(p);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(Error::config("at least one source must be registered"));
        }
        for feed in &self.feeds {
            if feed.name.trim().is_empty() {
                return Err(Error::config("feed name must not be empty"));
            }
            if !feed.path.contains("{}") {
                return Err(Error::config(format!(
                    "feed `{}`: path template must contain a `{{}}` placeholder",
                    feed.name
                )));
            }
            if feed.output.as_os_str().is_empty() {
                return Err(Error::config(format!(
                    "feed `{}`: output must name a staging file",
                    feed.name
                )));
            }
            for (key, value) in [
                ("article_list", &feed.article_list),
                ("article_url", &feed.article_url),
                ("article_title", &feed.article_title),
            ] {
                if value.is_empty() {
                    return Err(Error::config(format!(
                        "feed `{}`: {key} must not be empty",
                        feed.name
                    )));
                }
            }
        }
        validate_table_name(&self.storage.table)?;
        if self.fetch.concurrency == 0 {
            return Err(Error::config("fetch.concurrency must be at least 1"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(Error::config("fetch.timeout_secs must be at least 1"));
        }
        Ok(())
    }

    /// The model section, or a config error naming the stage that needs it.
    pub fn require_model(&self) -> Result<&ModelConfig> {
        self.model
            .as_ref()
            .ok_or_else(|| Error::config("the classify stage needs a `model` section"))
    }
}

/// Table names are spliced into SQL, so only plain identifiers are allowed.
pub fn validate_table_name(table: &str) -> Result<()> {
    if TABLE_IDENT.is_match(table) {
        Ok(())
    } else {
        Err(Error::config(format!("invalid table name `{table}`")))
    }
}
