use std::time::Duration;

use chrono::{NaiveDate, Utc};

use crate::ai::{SentimentTagger, TagReport};
use crate::classify::Classifier;
use crate::config::Config;
use crate::dates;
use crate::db::{Repository, SaveReport};
use crate::error::Result;
use crate::feed::FeedFetcher;
use crate::models::RawArticle;
use crate::report::{self, ReportSummary};
use crate::services::{search_window, MediastackClient, NewsApiClient};

const NEWSAPI: &str = "newsapi";
const MEDIASTACK: &str = "mediastack";

/// Result of one fetch stage after classification and storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub fetched: usize,
    /// Published before the configured start date.
    pub stale: usize,
    /// Matched no tracked person.
    pub unmatched: usize,
    pub saved: SaveReport,
    /// Newest publish date among the stored or already known rows.
    pub newest: Option<NaiveDate>,
}

#[derive(Debug, Default)]
pub struct CycleSummary {
    pub fetched: Vec<(&'static str, FetchSummary)>,
    pub duplicates_removed: usize,
    pub tagged: TagReport,
    pub report: ReportSummary,
}

pub struct App {
    config: Config,
    pub repository: Repository,
    classifier: Classifier,
    fetcher: FeedFetcher,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let repository = Repository::open(&config.database_path()).await?;
        Self::with_repository(config, repository)
    }

    pub fn with_repository(config: Config, repository: Repository) -> Result<Self> {
        let classifier = Classifier::new(&config.persons)?;
        let fetcher = FeedFetcher::new(
            Duration::from_secs(config.fetch.http_timeout_secs),
            config.fetch.rss_max_concurrent,
        )?;

        Ok(Self {
            config,
            repository,
            classifier,
            fetcher,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Makes sure the schema exists and returns the row count and the date
    /// of the newest stored article.
    pub async fn init_db(&self) -> Result<(usize, Option<NaiveDate>)> {
        self.repository.ensure_schema().await?;
        let rows = self.repository.count().await?;
        let newest = self.repository.last_saved_date().await?;
        Ok((rows, newest))
    }

    pub async fn fetch_rss(&self) -> Result<FetchSummary> {
        tracing::info!(feeds = self.config.feeds.len(), "fetching RSS feeds");
        let raw = self.fetcher.fetch_all(&self.config.feeds).await;
        self.classify_and_store(raw).await
    }

    /// One NewsAPI search per tracked person over the recent window,
    /// resuming from the newest article NewsAPI delivered before.
    pub async fn fetch_newsapi(&self) -> Result<FetchSummary> {
        let key = self.config.require_newsapi_key()?;
        let client = NewsApiClient::new(key, &self.config.fetch)?;

        let last_seen = self.repository.checkpoint(NEWSAPI).await?;
        let window = search_window(
            Utc::now().date_naive(),
            last_seen,
            self.config.fetch.newsapi_window_days,
        );
        tracing::info!(from = %window.from, to = %window.to, "NewsAPI window");

        let mut raw = Vec::new();
        for person in &self.config.persons {
            let articles = client.fetch_query(&person.query, window).await;
            tracing::info!(person = %person.label, count = articles.len(), "NewsAPI results");
            raw.extend(articles);
        }

        self.store_from(NEWSAPI, raw).await
    }

    /// Month-by-month Mediastack history from `from` (never earlier than the
    /// configured start date) to today.
    pub async fn fetch_mediastack(&self, from: NaiveDate) -> Result<FetchSummary> {
        let key = self.config.require_mediastack_key()?;
        let client = MediastackClient::new(key, &self.config.fetch)?;
        let from = from.max(self.config.since);
        let today = Utc::now().date_naive();

        let mut raw = Vec::new();
        for person in &self.config.persons {
            let articles = client.fetch_history(&person.query, from, today).await;
            tracing::info!(person = %person.label, count = articles.len(), "Mediastack results");
            raw.extend(articles);
        }

        self.store_from(MEDIASTACK, raw).await
    }

    /// Where the next Mediastack collection starts: the provider's own
    /// checkpoint, else the configured start date.
    pub async fn mediastack_resume_date(&self) -> Result<NaiveDate> {
        Ok(self
            .repository
            .checkpoint(MEDIASTACK)
            .await?
            .unwrap_or(self.config.since))
    }

    async fn store_from(&self, provider: &str, raw: Vec<RawArticle>) -> Result<FetchSummary> {
        let summary = self.classify_and_store(raw).await?;
        if let Some(newest) = summary.newest {
            self.repository.advance_checkpoint(provider, newest).await?;
        }
        Ok(summary)
    }

    /// Drops articles published before the start date, routes the rest to
    /// person buckets and stores each bucket under its label.
    pub async fn classify_and_store(&self, raw: Vec<RawArticle>) -> Result<FetchSummary> {
        let mut summary = FetchSummary {
            fetched: raw.len(),
            ..Default::default()
        };

        let since = self.config.since;
        let recent: Vec<RawArticle> = raw
            .into_iter()
            .filter(|article| {
                // unparseable dates go through so the store can count them
                let stale = article
                    .published
                    .as_deref()
                    .and_then(|p| dates::normalize(p).ok())
                    .is_some_and(|dt| dt.date() < since);
                if stale {
                    summary.stale += 1;
                }
                !stale
            })
            .collect();

        let classification = self.classifier.classify(recent);
        summary.unmatched = classification.dropped;
        tracing::debug!(
            kept = classification.kept(),
            mixed = classification.mixed.len(),
            unmatched = classification.dropped,
            "classified"
        );

        for (category, rows) in classification.into_batches() {
            if rows.is_empty() {
                continue;
            }
            let newest = rows
                .iter()
                .filter_map(|row| row.published.as_deref())
                .filter_map(|p| dates::normalize(p).ok())
                .map(|dt| dt.date())
                .max();
            let report = self.repository.save(rows, &category).await?;
            tracing::info!(
                category = %category,
                inserted = report.inserted,
                ignored = report.ignored,
                "bucket stored"
            );
            if report.inserted + report.ignored > 0 {
                summary.newest = summary.newest.max(newest);
            }
            summary.saved.merge(report);
        }

        tracing::info!(
            fetched = summary.fetched,
            stale = summary.stale,
            unmatched = summary.unmatched,
            inserted = summary.saved.inserted,
            "fetch stage complete"
        );
        Ok(summary)
    }

    pub async fn remove_duplicates(&self) -> Result<usize> {
        self.repository.remove_duplicates().await
    }

    pub async fn tag_sentiment(&self) -> Result<TagReport> {
        let tagger = SentimentTagger::from_config(&self.config)?;
        tagger.run(&self.repository).await
    }

    pub async fn generate_reports(&self) -> Result<ReportSummary> {
        report::generate(&self.repository, &self.config).await
    }

    /// RSS, then each API with a configured key, then dedupe, sentiment and
    /// reports. A failing fetch stage is logged and the cycle moves on.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        tracing::info!("cycle started");
        let mut cycle = CycleSummary::default();

        match self.fetch_rss().await {
            Ok(summary) => cycle.fetched.push(("rss", summary)),
            Err(e) => tracing::error!(error = %e, "RSS stage failed"),
        }

        if self.config.newsapi_key.is_some() {
            match self.fetch_newsapi().await {
                Ok(summary) => cycle.fetched.push((NEWSAPI, summary)),
                Err(e) => tracing::error!(error = %e, "NewsAPI stage failed"),
            }
        }

        if self.config.mediastack_key.is_some() {
            let from = match self.mediastack_resume_date().await {
                Ok(from) => from,
                Err(e) => {
                    tracing::warn!(error = %e, "could not read Mediastack checkpoint");
                    self.config.since
                }
            };
            match self.fetch_mediastack(from).await {
                Ok(summary) => cycle.fetched.push((MEDIASTACK, summary)),
                Err(e) => tracing::error!(error = %e, "Mediastack stage failed"),
            }
        }

        cycle.duplicates_removed = self.remove_duplicates().await?;
        cycle.tagged = self.tag_sentiment().await?;
        cycle.report = self.generate_reports().await?;

        tracing::info!(
            tagged = cycle.tagged.tagged,
            charts = cycle.report.charts.len(),
            "cycle finished"
        );
        Ok(cycle)
    }

    /// Runs a cycle every `daily_interval_hours`. Cycle errors are logged;
    /// the loop only ends with the process.
    pub async fn run_daily(&self) -> Result<()> {
        let interval = Duration::from_secs(self.config.daily_interval_hours.max(1) * 3600);
        loop {
            if let Err(e) = self.run_cycle().await {
                tracing::error!(error = %e, "cycle failed");
            }
            tracing::info!(hours = interval.as_secs() / 3600, "sleeping until next cycle");
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::classify::MIXED;
    use crate::error::AppError;

    fn raw(url: &str, title: &str, published: &str) -> RawArticle {
        RawArticle {
            source: "Test Wire".into(),
            title: Some(title.into()),
            url: url.into(),
            published: Some(published.into()),
            ..Default::default()
        }
    }

    async fn app_with(config: Config) -> App {
        let repository = Repository::open_in_memory().await.unwrap();
        App::with_repository(config, repository).unwrap()
    }

    fn offline_config(output: &std::path::Path) -> Config {
        Config {
            output_dir: output.to_path_buf(),
            since: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            feeds: Vec::new(),
            newsapi_key: None,
            mediastack_key: None,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn three_articles_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(offline_config(dir.path())).await;

        let summary = app
            .classify_and_store(vec![
                raw("https://a.test/a", "Trump signs order", "2024-10-01T09:00:00Z"),
                raw("https://a.test/b", "Putin and Xi Jinping meet", "2024-10-01T10:00:00Z"),
                raw("https://a.test/c", "Local weather report", "2024-10-01T11:00:00Z"),
            ])
            .await
            .unwrap();

        assert_eq!(summary.fetched, 3);
        assert_eq!(summary.unmatched, 1);
        assert_eq!(summary.saved.inserted, 2);

        let stored = app.repository.load_articles(None).await.unwrap();
        let rows: Vec<_> = stored
            .iter()
            .map(|a| (a.url.as_str(), a.politician.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![("https://a.test/a", "Trump"), ("https://a.test/b", MIXED)]
        );
        assert!(stored.iter().all(|a| a.sentiment.is_none()));
    }

    #[tokio::test]
    async fn same_article_twice_is_stored_once() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(offline_config(dir.path())).await;
        let article = raw("https://a.test/a", "Trump signs order", "2024-10-01T09:00:00Z");

        app.classify_and_store(vec![article.clone()]).await.unwrap();
        let second = app.classify_and_store(vec![article]).await.unwrap();

        assert_eq!(second.saved.inserted, 0);
        assert_eq!(second.saved.ignored, 1);
        assert_eq!(app.repository.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn articles_before_start_date_are_not_stored() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(offline_config(dir.path())).await;

        let summary = app
            .classify_and_store(vec![
                raw("https://a.test/old", "Trump in 2023", "2023-05-01T09:00:00Z"),
                raw("https://a.test/bad", "Trump undated", "sometime"),
            ])
            .await
            .unwrap();

        assert_eq!(summary.stale, 1);
        assert_eq!(summary.saved.rejected, 1);
        assert_eq!(app.repository.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn api_stages_require_keys() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(offline_config(dir.path())).await;

        assert!(matches!(app.fetch_newsapi().await, Err(AppError::Config(_))));
        assert!(matches!(
            app.fetch_mediastack(NaiveDate::MIN).await,
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn newsapi_stage_queries_every_person() {
        let server = MockServer::start().await;
        let today = Utc::now().date_naive();
        let published = format!("{}T08:00:00Z", today.format("%Y-%m-%d"));

        Mock::given(method("GET"))
            .and(path("/v2/everything"))
            .and(query_param("q", "Putin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "articles": [{
                    "source": { "name": "Wire" },
                    "title": "Putin speaks",
                    "url": "https://wire.test/putin",
                    "publishedAt": published
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v2/everything"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "articles": []
            })))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = offline_config(dir.path());
        config.newsapi_key = Some("key".into());
        config.fetch.newsapi_base_url = server.uri();
        let app = app_with(config).await;

        let summary = app.fetch_newsapi().await.unwrap();
        assert_eq!(summary.fetched, 1);
        assert_eq!(summary.saved.inserted, 1);

        let stored = app.repository.load_articles(None).await.unwrap();
        assert_eq!(stored[0].politician, "Putin");
    }

    #[tokio::test]
    async fn rss_rows_do_not_narrow_the_newsapi_window() {
        let server = MockServer::start().await;
        let today = Utc::now().date_naive();
        let window_start = today.checked_sub_days(chrono::Days::new(30)).unwrap();
        let stamp = |d: NaiveDate| format!("{}T08:00:00Z", d.format("%Y-%m-%d"));
        let last_week = today.checked_sub_days(chrono::Days::new(7)).unwrap();

        Mock::given(method("GET"))
            .and(path("/v2/everything"))
            .and(query_param("from", window_start.format("%Y-%m-%d").to_string()))
            .and(query_param("q", "Trump"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "articles": [{
                    "source": { "name": "Wire" },
                    "title": "Trump rally",
                    "url": "https://wire.test/trump",
                    "publishedAt": stamp(last_week)
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v2/everything"))
            .and(query_param("from", window_start.format("%Y-%m-%d").to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "articles": []
            })))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = offline_config(dir.path());
        config.since = window_start.checked_sub_days(chrono::Days::new(60)).unwrap();
        config.newsapi_key = Some("key".into());
        config.fetch.newsapi_base_url = server.uri();
        let app = app_with(config).await;

        // an RSS article from today is already stored
        app.classify_and_store(vec![raw("https://feed.test/a", "Trump today", &stamp(today))])
            .await
            .unwrap();

        let summary = app.fetch_newsapi().await.unwrap();
        assert_eq!(summary.saved.inserted, 1);
        assert_eq!(app.repository.checkpoint(NEWSAPI).await.unwrap(), Some(last_week));
        assert_eq!(app.repository.checkpoint(MEDIASTACK).await.unwrap(), None);
        assert_eq!(app.mediastack_resume_date().await.unwrap(), app.config().since);
    }

    #[tokio::test]
    async fn offline_cycle_tags_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(offline_config(dir.path())).await;
        app.classify_and_store(vec![raw(
            "https://a.test/a",
            "Trump hails peace agreement",
            "2024-10-01T09:00:00Z",
        )])
        .await
        .unwrap();

        let cycle = app.run_cycle().await.unwrap();

        assert_eq!(cycle.fetched.len(), 1);
        assert_eq!(cycle.fetched[0].0, "rss");
        assert_eq!(cycle.tagged.tagged, 1);
        assert_eq!(cycle.report.rows, 1);
        assert!(app.config().csv_path().exists());

        let stored = app.repository.load_articles(None).await.unwrap();
        assert_eq!(stored[0].sentiment, Some(crate::models::Sentiment::Positive));
    }
}
