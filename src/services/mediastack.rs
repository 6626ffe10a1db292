//! Mediastack historical news, one request per calendar month.

use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::FetchConfig;
use crate::error::{AppError, Result};
use crate::models::{clean_text, RawArticle};

use super::{http_client, DateWindow};

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    data: Vec<MediastackArticle>,
}

#[derive(Debug, Deserialize)]
struct MediastackArticle {
    author: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    source: Option<String>,
    published_at: Option<String>,
}

impl MediastackArticle {
    fn into_raw(self) -> Option<RawArticle> {
        let url = clean_text(self.url.as_deref())?;
        let description = clean_text(self.description.as_deref());
        Some(RawArticle {
            source: clean_text(self.source.as_deref()).unwrap_or_default(),
            title: clean_text(self.title.as_deref()),
            content: description.clone(),
            description,
            author: clean_text(self.author.as_deref()),
            url,
            published: self.published_at,
        })
    }
}

/// Calendar-month windows covering `since..=until`, the first and last
/// clipped to the range.
pub fn month_windows(since: NaiveDate, until: NaiveDate) -> Vec<DateWindow> {
    let mut windows = Vec::new();
    let mut start = since;

    while start <= until {
        let Some(next) = first_of_next_month(start) else {
            windows.push(DateWindow { from: start, to: until });
            break;
        };
        let end = next.pred_opt().unwrap_or(next).min(until);
        windows.push(DateWindow { from: start, to: end });
        start = next;
    }

    windows
}

fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

pub struct MediastackClient {
    client: reqwest::Client,
    access_key: String,
    base_url: String,
    languages: String,
    limit: u32,
    delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl MediastackClient {
    pub fn new(access_key: &str, settings: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(Duration::from_secs(settings.http_timeout_secs))?,
            access_key: access_key.to_string(),
            base_url: settings.mediastack_base_url.trim_end_matches('/').to_string(),
            languages: settings.mediastack_languages.clone(),
            limit: settings.mediastack_limit.max(1),
            delay: Duration::from_millis(settings.mediastack_delay_ms),
            last_request: Mutex::new(None),
        })
    }

    /// Waits until `delay` has passed since the previous request made by
    /// this client, whichever keywords or window it was for.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let ready = previous + self.delay;
            if ready > Instant::now() {
                tokio::time::sleep_until(ready).await;
            }
        }
        *last = Some(Instant::now());
    }

    pub async fn fetch_window(&self, keywords: &str, window: DateWindow) -> Result<Vec<RawArticle>> {
        let params = [
            ("access_key", self.access_key.clone()),
            ("keywords", keywords.to_string()),
            (
                "date",
                format!(
                    "{},{}",
                    window.from.format("%Y-%m-%d"),
                    window.to.format("%Y-%m-%d")
                ),
            ),
            ("languages", self.languages.clone()),
            ("sort", "published_desc".to_string()),
            ("limit", self.limit.to_string()),
        ];

        self.throttle().await;
        let response = self
            .client
            .get(format!("{}/v1/news", self.base_url))
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Api {
                provider: "Mediastack",
                status: status.as_u16(),
                message: response.text().await?,
            });
        }

        let parsed: NewsResponse = response.json().await?;
        Ok(parsed
            .data
            .into_iter()
            .filter_map(MediastackArticle::into_raw)
            .collect())
    }

    /// One request per month from `since` to `until`. Failed windows are
    /// logged and skipped.
    pub async fn fetch_history(
        &self,
        keywords: &str,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Vec<RawArticle> {
        let mut articles = Vec::new();

        for window in month_windows(since, until) {
            match self.fetch_window(keywords, window).await {
                Ok(batch) => {
                    tracing::info!(
                        keywords,
                        month = %window.from.format("%Y-%m"),
                        count = batch.len(),
                        "fetched Mediastack window"
                    );
                    articles.extend(batch);
                }
                Err(e) => {
                    tracing::warn!(keywords, from = %window.from, error = %e, "Mediastack request failed");
                }
            }
        }

        articles
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn client_with_delay(base_url: &str, delay_ms: u64) -> MediastackClient {
        let settings = FetchConfig {
            mediastack_base_url: base_url.to_string(),
            mediastack_delay_ms: delay_ms,
            ..FetchConfig::default()
        };
        MediastackClient::new("ms-key", &settings).unwrap()
    }

    fn client(base_url: &str) -> MediastackClient {
        client_with_delay(base_url, 0)
    }

    #[test]
    fn month_windows_clip_to_range() {
        let windows = month_windows(date(2024, 11, 15), date(2025, 1, 10));
        assert_eq!(
            windows,
            vec![
                DateWindow { from: date(2024, 11, 15), to: date(2024, 11, 30) },
                DateWindow { from: date(2024, 12, 1), to: date(2024, 12, 31) },
                DateWindow { from: date(2025, 1, 1), to: date(2025, 1, 10) },
            ]
        );
    }

    #[test]
    fn month_windows_empty_when_range_inverted() {
        assert!(month_windows(date(2025, 2, 1), date(2025, 1, 1)).is_empty());
    }

    #[test]
    fn leap_february_ends_on_29th() {
        let windows = month_windows(date(2024, 2, 1), date(2024, 2, 29));
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].to, date(2024, 2, 29));
    }

    #[tokio::test]
    async fn fetches_one_request_per_month() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/news"))
            .and(query_param("access_key", "ms-key"))
            .and(query_param("keywords", "Putin"))
            .and(query_param("date", "2024-09-01,2024-09-30"))
            .and(query_param("sort", "published_desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pagination": { "limit": 100, "offset": 0, "count": 1, "total": 1 },
                "data": [{
                    "author": null,
                    "title": "Putin addresses forum",
                    "description": "Speech in Vladivostok",
                    "url": "https://ms.test/1",
                    "source": "Agency",
                    "published_at": "2024-09-05T10:00:00+00:00"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/news"))
            .and(query_param("date", "2024-10-01,2024-10-15"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .expect(1)
            .mount(&server)
            .await;

        let articles = client(&server.uri())
            .fetch_history("Putin", date(2024, 9, 1), date(2024, 10, 15))
            .await;

        assert_eq!(articles.len(), 1);
        let article = &articles[0];
        assert_eq!(article.source, "Agency");
        assert_eq!(article.content.as_deref(), Some("Speech in Vladivostok"));
        assert_eq!(article.published.as_deref(), Some("2024-09-05T10:00:00+00:00"));
    }

    #[tokio::test]
    async fn requests_are_spaced_across_keyword_searches() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/news"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .expect(3)
            .mount(&server)
            .await;

        let client = client_with_delay(&server.uri(), 100);
        let started = std::time::Instant::now();
        for keywords in ["Trump", "Putin", "Xi Jinping"] {
            client
                .fetch_history(keywords, date(2024, 9, 1), date(2024, 9, 30))
                .await;
        }

        assert!(
            started.elapsed() >= Duration::from_millis(200),
            "three requests finished in {:?}",
            started.elapsed()
        );
    }
}
