use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Row};
use tokio_rusqlite::Connection;

use crate::dates::{self, DateRange};
use crate::error::Result;
use crate::models::{Article, RawArticle, Sentiment, UnscoredRow};

use super::schema::SCHEMA;

/// Outcome of one [`Repository::save`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Newly stored rows.
    pub inserted: usize,
    /// Rows whose url was already stored.
    pub ignored: usize,
    /// Rows without a url or with an unparseable publish date.
    pub rejected: usize,
}

impl SaveReport {
    pub fn merge(&mut self, other: SaveReport) {
        self.inserted += other.inserted;
        self.ignored += other.ignored;
        self.rejected += other.rejected;
    }
}

struct NewRow {
    source: Option<String>,
    title: Option<String>,
    url: String,
    published_at: String,
    content: Option<String>,
    author: Option<String>,
}

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).await?;
        let repo = Self { conn };
        repo.ensure_schema().await?;
        Ok(repo)
    }

    #[allow(dead_code)]
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        let repo = Self { conn };
        repo.ensure_schema().await?;
        Ok(repo)
    }

    /// Creates the tables and indexes if absent. Safe to call repeatedly.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Stores `rows` under `category` in one transaction. Rows whose url is
    /// already present are skipped; rows without a url or a parseable
    /// publish date are rejected and never written.
    pub async fn save(&self, rows: Vec<RawArticle>, category: &str) -> Result<SaveReport> {
        if rows.is_empty() {
            return Ok(SaveReport::default());
        }

        let mut report = SaveReport::default();
        let mut prepared = Vec::with_capacity(rows.len());

        for row in rows {
            let url = row.url.trim().to_string();
            if url.is_empty() {
                tracing::warn!(category, title = ?row.title, "rejecting article without url");
                report.rejected += 1;
                continue;
            }
            let published_at = match dates::normalize(row.published.as_deref().unwrap_or_default()) {
                Ok(dt) => dates::format(&dt),
                Err(e) => {
                    tracing::warn!(category, url = %url, error = %e, "rejecting article with bad publish date");
                    report.rejected += 1;
                    continue;
                }
            };
            prepared.push(NewRow {
                source: Some(row.source).filter(|s| !s.trim().is_empty()),
                title: row.title,
                url,
                published_at,
                content: row.content,
                author: row.author,
            });
        }

        let attempted = prepared.len();
        let category = category.to_string();
        let inserted = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut inserted = 0;
                {
                    let mut stmt = tx.prepare_cached(
                        r#"INSERT OR IGNORE INTO news
                               (source, title, url, published_at, content, author, politician)
                           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                    )?;
                    for row in &prepared {
                        inserted += stmt.execute(params![
                            row.source,
                            row.title,
                            row.url,
                            row.published_at,
                            row.content,
                            row.author,
                            category,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(inserted)
            })
            .await?;

        report.inserted = inserted;
        report.ignored = attempted - inserted;
        tracing::info!(
            inserted = report.inserted,
            ignored = report.ignored,
            rejected = report.rejected,
            "saved articles"
        );
        Ok(report)
    }

    /// Keeps the lowest id of every `(title, url)` group. Returns the number
    /// of rows deleted.
    pub async fn remove_duplicates(&self) -> Result<usize> {
        let (deleted, remaining) = self
            .conn
            .call(|conn| {
                let deleted = conn.execute(
                    r#"DELETE FROM news
                       WHERE id NOT IN (
                           SELECT MIN(id) FROM news GROUP BY title, url
                       )"#,
                    [],
                )?;
                let remaining: i64 =
                    conn.query_row("SELECT COUNT(*) FROM news", [], |row| row.get(0))?;
                Ok((deleted, remaining))
            })
            .await?;

        tracing::info!(deleted, remaining, "removed duplicate articles");
        Ok(deleted)
    }

    /// Date of the newest stored article.
    pub async fn last_saved_date(&self) -> Result<Option<NaiveDate>> {
        let latest: Option<String> = self
            .conn
            .call(|conn| {
                let latest = conn.query_row("SELECT MAX(published_at) FROM news", [], |row| {
                    row.get::<_, Option<String>>(0)
                })?;
                Ok(latest)
            })
            .await?;

        Ok(latest
            .as_deref()
            .and_then(|s| dates::normalize(s).ok())
            .map(|dt| dt.date()))
    }

    /// Newest publish date previously collected from `provider`. Each API
    /// resumes from its own checkpoint so rows from other sources never
    /// narrow its window.
    pub async fn checkpoint(&self, provider: &str) -> Result<Option<NaiveDate>> {
        let provider = provider.to_string();
        let stored: Option<String> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare("SELECT last_published FROM fetch_checkpoints WHERE provider = ?1")?;
                let mut rows = stmt.query(params![provider])?;
                let value = match rows.next()? {
                    Some(row) => Some(row.get::<_, String>(0)?),
                    None => None,
                };
                Ok(value)
            })
            .await?;

        Ok(stored
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()))
    }

    /// Moves the checkpoint for `provider` forward to `date`. An older date
    /// leaves it unchanged.
    pub async fn advance_checkpoint(&self, provider: &str, date: NaiveDate) -> Result<()> {
        let provider = provider.to_string();
        let date = date.format("%Y-%m-%d").to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO fetch_checkpoints (provider, last_published)
                       VALUES (?1, ?2)
                       ON CONFLICT(provider) DO UPDATE
                       SET last_published = MAX(last_published, excluded.last_published)"#,
                    params![provider, date],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .call(|conn| {
                let count = conn.query_row("SELECT COUNT(*) FROM news", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Rows still waiting for a sentiment label, oldest id first.
    pub async fn unscored(&self) -> Result<Vec<UnscoredRow>> {
        let rows = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, title, content FROM news WHERE sentiment IS NULL ORDER BY id",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(UnscoredRow {
                            id: row.get(0)?,
                            title: row.get(1)?,
                            content: row.get(2)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    /// Writes labels in one transaction. A row that already carries a label
    /// keeps it. Returns the number of rows updated.
    pub async fn set_sentiments(&self, labels: Vec<(i64, Sentiment)>) -> Result<usize> {
        if labels.is_empty() {
            return Ok(0);
        }

        let updated = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut updated = 0;
                {
                    let mut stmt = tx.prepare_cached(
                        "UPDATE news SET sentiment = ?1 WHERE id = ?2 AND sentiment IS NULL",
                    )?;
                    for (id, sentiment) in &labels {
                        updated += stmt.execute(params![sentiment.as_str(), id])?;
                    }
                }
                tx.commit()?;
                Ok(updated)
            })
            .await?;
        Ok(updated)
    }

    /// Stored articles ordered by publish time, optionally limited to a
    /// calendar-day range.
    pub async fn load_articles(&self, range: Option<DateRange>) -> Result<Vec<Article>> {
        let (lower, upper) = match range {
            Some(r) => (r.lower_bound(), r.upper_bound()),
            None => (String::new(), "9999-12-31 23:59:59".to_string()),
        };

        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, source, title, url, published_at, content, author,
                              politician, sentiment
                       FROM news
                       WHERE published_at >= ?1 AND published_at < ?2
                       ORDER BY published_at, id"#,
                )?;
                let rows = stmt
                    .query_map(params![lower, upper], stored_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        Ok(rows.into_iter().filter_map(StoredRow::into_article).collect())
    }
}

struct StoredRow {
    id: i64,
    source: Option<String>,
    title: Option<String>,
    url: String,
    published_at: Option<String>,
    content: Option<String>,
    author: Option<String>,
    politician: String,
    sentiment: Option<String>,
}

impl StoredRow {
    fn into_article(self) -> Option<Article> {
        let published_at: NaiveDateTime = match self
            .published_at
            .as_deref()
            .map(dates::normalize)
            .transpose()
        {
            Ok(Some(dt)) => dt,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(id = self.id, error = %e, "skipping row with bad publish date");
                return None;
            }
        };

        let sentiment = match self.sentiment.as_deref().map(str::parse::<Sentiment>).transpose() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(id = self.id, error = %e, "ignoring unknown sentiment label");
                None
            }
        };

        Some(Article {
            id: self.id,
            source: self.source,
            title: self.title,
            url: self.url,
            published_at,
            content: self.content,
            author: self.author,
            politician: self.politician,
            sentiment,
        })
    }
}

fn stored_from_row(row: &Row) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        id: row.get(0)?,
        source: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
        published_at: row.get(4)?,
        content: row.get(5)?,
        author: row.get(6)?,
        politician: row.get(7)?,
        sentiment: row.get(8)?,
    })
}
