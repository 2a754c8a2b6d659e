//! Command-line interface definitions for News Verdict.
//!
//! This module defines the CLI arguments using the `clap` crate. The config
//! path can come from a flag or the `NEWS_VERDICT_CONFIG` environment variable.

use crate::config::DEFAULT_CONFIG_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the News Verdict application.
///
/// # Examples
///
/// ```sh
/// # Download feeds, scrape the linked articles and classify them
/// news_verdict run
///
/// # Only classify rows already in the database, with another config
/// news_verdict --config /etc/news_verdict.yaml classify
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "NEWS_VERDICT_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Download every configured feed into its staging file
    Fetch,
    /// Scrape the articles linked from the staging files into the database
    Scrape,
    /// Normalize and classify every article without a verdict
    Classify,
    /// Fetch, scrape and classify in sequence
    Run,
}

impl Command {
    pub fn fetches(self) -> bool {
        matches!(self, Command::Fetch | Command::Run)
    }

    pub fn scrapes(self) -> bool {
        matches!(self, Command::Scrape | Command::Run)
    }

    pub fn classifies(self) -> bool {
        matches!(self, Command::Classify | Command::Run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["news_verdict", "--config", "./conf/news.yaml", "scrape"]);

        assert_eq!(cli.config, PathBuf::from("./conf/news.yaml"));
        assert_eq!(cli.command, Command::Scrape);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["news_verdict", "-c", "/tmp/news.yaml", "classify"]);

        assert_eq!(cli.config, PathBuf::from("/tmp/news.yaml"));
        assert_eq!(cli.command, Command::Classify);
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["news_verdict"]).is_err());
    }

    #[test]
    fn test_run_covers_every_stage() {
        let run = Command::Run;
        assert!(run.fetches() && run.scrapes() && run.classifies());

        let fetch = Command::Fetch;
        assert!(fetch.fetches());
        assert!(!fetch.scrapes());
        assert!(!fetch.classifies());
    }
}
