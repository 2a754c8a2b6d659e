//! SQLite article store.
//!
//! Scraped articles are inserted without a verdict; the classify stage reads
//! every row whose verdict column is still `NULL` and fills it in by primary
//! key. Any error here is fatal to the run and is never retried.

use crate::config::validate_table_name;
use crate::error::{Error, Result};
use crate::models::{RawArticle, StoredArticle, Verdict};
use crate::utils::ensure_parent_dir;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Handle on the article table.
#[derive(Debug, Clone)]
pub struct ArticleStore {
    pool: SqlitePool,
    table: String,
}

impl ArticleStore {
    /// Open (creating if needed) the database at `path` and ensure `table` exists.
    ///
    /// # Arguments
    ///
    /// * `path` - SQLite file; missing parent directories are created
    /// * `table` - Article table name, a plain SQL identifier
    ///
    /// # Returns
    ///
    /// A ready store, [`Error::Config`] for an unsafe table name, or
    /// [`Error::StorageFailed`] when the database cannot be opened.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = ArticleStore::open(&config.storage.database, &config.storage.table).await?;
    /// ```
    #[instrument(level = "info", skip_all, fields(path = %path.display(), %table))]
    pub async fn open(path: &Path, table: &str) -> Result<Self> {
        validate_table_name(table)?;

        ensure_parent_dir(path).await?;

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| Error::storage("connect", e))?;

        let store = Self {
            pool,
            table: table.to_string(),
        };
        store.ensure_table().await?;
        info!("Article store ready");
        Ok(store)
    }

    async fn ensure_table(&self) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                pk INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                article TEXT NOT NULL,
                TrueOrFalse TEXT,
                scraped_at TEXT NOT NULL
            )",
            self.table
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage("create table", e))?;
        Ok(())
    }

    /// Insert every article in one transaction, without a verdict.
    ///
    /// # Arguments
    ///
    /// * `articles` - Scraped articles; all share the same `scraped_at` time
    ///
    /// # Returns
    ///
    /// The number of rows inserted. On error nothing is committed.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let inserted = store.insert_articles(&report.articles).await?;
    /// ```
    #[instrument(level = "info", skip_all, fields(count = articles.len()))]
    pub async fn insert_articles(&self, articles: &[RawArticle]) -> Result<u64> {
        let sql = format!(
            "INSERT INTO {} (title, article, scraped_at) VALUES (?, ?, ?)",
            self.table
        );
        let scraped_at = Utc::now().to_rfc3339();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::storage("begin insert", e))?;
        let mut inserted = 0;
        for article in articles {
            let result = sqlx::query(&sql)
                .bind(article.title.as_str())
                .bind(article.body_text.as_str())
                .bind(scraped_at.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::storage("insert", e))?;
            inserted += result.rows_affected();
        }
        tx.commit()
            .await
            .map_err(|e| Error::storage("commit insert", e))?;

        info!(inserted, "Saved articles");
        Ok(inserted)
    }

    /// Rows still waiting for a verdict, oldest first.
    ///
    /// # Returns
    ///
    /// Every row whose verdict column is `NULL`, ordered by primary key.
    ///
    /// # Example
    ///
    /// ```ignore
    /// for article in store.unclassified().await? {
    ///     let verdict = classifier.verdict(&normalizer.normalize_article(article));
    ///     store.set_verdict(&verdict).await?;
    /// }
    /// ```
    pub async fn unclassified(&self) -> Result<Vec<StoredArticle>> {
        let sql = format!(
            "SELECT pk, title, article FROM {} WHERE TrueOrFalse IS NULL ORDER BY pk",
            self.table
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::storage("select unclassified", e))?;

        let articles = rows
            .iter()
            .map(|row| -> std::result::Result<StoredArticle, sqlx::Error> {
                Ok(StoredArticle {
                    pk: row.try_get("pk")?,
                    title: row.try_get("title")?,
                    article: row.try_get("article")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::storage("decode row", e))?;

        debug!(count = articles.len(), "Fetched unclassified articles");
        Ok(articles)
    }

    /// Write the verdict of one row.
    ///
    /// # Arguments
    ///
    /// * `verdict` - Label and primary key of the row to update
    ///
    /// # Returns
    ///
    /// [`Error::StorageFailed`] when the update fails or no row has that key.
    pub async fn set_verdict(&self, verdict: &Verdict) -> Result<()> {
        let sql = format!("UPDATE {} SET TrueOrFalse = ? WHERE pk = ?", self.table);
        let result = sqlx::query(&sql)
            .bind(verdict.label.as_str())
            .bind(verdict.pk)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage("update verdict", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::storage(
                "update verdict",
                format!("no row with pk {}", verdict.pk),
            ));
        }
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
