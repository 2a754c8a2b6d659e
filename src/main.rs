//! # News Verdict
//!
//! Scrapes the articles linked from a news API, reduces their text to a
//! normalized bag of lemmas and labels each one "Likely True" or
//! "Likely False" with a frozen classifier.
//!
//! ## Usage
//!
//! ```sh
//! news_verdict --config news_verdict.yaml run
//! ```
//!
//! ## Architecture
//!
//! The application runs as three stages that can also be invoked one by one:
//! 1. **Fetch**: Download every configured feed into its staging file
//! 2. **Scrape**: Turn staged snippets into articles and insert them in SQLite
//! 3. **Classify**: Normalize every unlabelled row and write its verdict

use clap::Parser;
use std::error::Error as StdError;
use std::time::{Duration as StdDuration, Instant};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod classifier;
mod cli;
mod config;
mod error;
mod feeds;
mod ingest;
mod models;
mod normalize;
mod scrapers;
mod snippet;
mod storage;
mod utils;

use classifier::{Classifier, FrozenModel, LinearTextModel};
use cli::Cli;
use config::Config;
use error::Result;
use feeds::{HttpDownload, RetryDownload};
use ingest::{Ingestor, SnippetFields};
use normalize::{Lemmatizer, Normalizer, RuleLemmatizer, StopwordSet};
use scrapers::{ArticleFetcher, HttpPageSource, PageSource, SourceRegistry, build_client};
use storage::ArticleStore;
use utils::truncate_for_log;

#[tokio::main]
#[instrument]
async fn main() -> std::result::Result<(), Box<dyn StdError>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("news_verdict starting up");

    let args = Cli::parse();
    debug!(config = %args.config.display(), command = ?args.command, "Parsed CLI arguments");

    let config = Config::load(&args.config).inspect_err(|e| {
        error!(path = %args.config.display(), error = %e, "Could not load configuration");
    })?;
    info!(
        feeds = config.feeds.len(),
        sources = config.sources.len(),
        "Loaded configuration"
    );

    if let Err(e) = run(&config, args.command).await {
        error!(error = %e, "Run aborted");
        return Err(e.into());
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

async fn run(config: &Config, command: cli::Command) -> Result<()> {
    let client = build_client(&config.fetch)?;

    if command.fetches() {
        fetch_stage(config, &client).await;
    }
    if !command.scrapes() && !command.classifies() {
        return Ok(());
    }

    let store = ArticleStore::open(&config.storage.database, &config.storage.table).await?;
    if command.scrapes() {
        let registry = SourceRegistry::from_config(&config.sources)?;
        debug!(sources = registry.len(), domains = ?registry.domains().collect::<Vec<_>>(), "Source registry ready");
        let fetcher = ArticleFetcher::new(HttpPageSource::new(client));
        scrape_stage(config, &registry, &fetcher, &store).await?;
    }
    if command.classifies() {
        let model = LinearTextModel::load(config.require_model()?)?;
        let normalizer = Normalizer::new(
            StopwordSet::load(config.nlp.stopwords.as_deref())?,
            RuleLemmatizer::load(config.nlp.lemmas.as_deref())?,
        );
        classify_stage(&store, &normalizer, &model).await?;
    }
    store.close().await;
    Ok(())
}

/// Download every feed; a failing feed is logged and the others still run.
#[instrument(level = "info", skip_all)]
async fn fetch_stage(config: &Config, client: &reqwest::Client) -> usize {
    let t0 = Instant::now();
    let downloader = RetryDownload::new(
        HttpDownload::new(client.clone()),
        config.fetch.feed_retries,
        StdDuration::from_secs(1),
    );

    let mut fetched = 0;
    let mut failed = 0;
    for feed in &config.feeds {
        match feeds::download_feed(&downloader, feed).await {
            Ok(count) => fetched += count,
            Err(e) => {
                failed += 1;
                error!(feed = %feed.name, error = %e, "Feed download failed; continuing");
            }
        }
    }

    info!(
        feeds = config.feeds.len(),
        snippets = fetched,
        failed,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Fetch stage complete"
    );
    fetched
}

/// Ingest every staged feed and insert the scraped articles.
#[instrument(level = "info", skip_all)]
async fn scrape_stage<S: PageSource>(
    config: &Config,
    registry: &SourceRegistry,
    fetcher: &ArticleFetcher<S>,
    store: &ArticleStore,
) -> Result<u64> {
    let t0 = Instant::now();
    let ingestor = Ingestor::new(registry, fetcher).with_concurrency(config.fetch.concurrency);

    let mut inserted = 0;
    let mut failed = 0;
    let mut skipped = 0;
    for feed in &config.feeds {
        if !feed.output.exists() {
            warn!(feed = %feed.name, output = %feed.output.display(), "Feed was never fetched; skipping");
            continue;
        }
        let snippets = feeds::read_snippets(feed).await?;
        let report = ingestor
            .ingest(&snippets, &SnippetFields::from(feed), feed.language.as_deref())
            .await;

        for failure in &report.failures {
            debug!(
                url = failure.url.as_deref().unwrap_or("<unknown>"),
                error = %truncate_for_log(&failure.error.to_string(), 200),
                "Failed snippet"
            );
        }
        failed += report.failures.len();
        skipped += report.unsupported + report.filtered;
        inserted += store.insert_articles(&report.articles).await?;
    }

    info!(
        inserted,
        failed,
        skipped,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Scrape stage complete"
    );
    Ok(inserted)
}

/// Label every stored article that has no verdict yet.
#[instrument(level = "info", skip_all)]
async fn classify_stage<M: FrozenModel, L: Lemmatizer>(
    store: &ArticleStore,
    normalizer: &Normalizer<L>,
    model: &M,
) -> Result<usize> {
    let t0 = Instant::now();
    let classifier = Classifier::new(model);

    let pending = store.unclassified().await?;
    let total = pending.len();
    let mut likely_true = 0;
    for article in pending {
        let normalized = normalizer.normalize_article(article);
        let verdict = classifier.verdict(&normalized);
        debug!(pk = verdict.pk, title = %normalized.title, label = %verdict.label, "Classified article");
        if verdict.label == models::VerdictLabel::LikelyTrue {
            likely_true += 1;
        }
        store.set_verdict(&verdict).await?;
    }

    info!(
        classified = total,
        likely_true,
        likely_false = total - likely_true,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Classify stage complete"
    );
    Ok(total)
}
