//! NewsAPI `everything` search.
//!
//! <https://newsapi.org/docs/endpoints/everything>

use std::time::Duration;

use chrono::{Days, NaiveDate};
use serde::Deserialize;

use crate::config::FetchConfig;
use crate::error::{AppError, Result};
use crate::models::{clean_text, RawArticle};

use super::{http_client, DateWindow};

/// Placeholder title NewsAPI returns for articles pulled by the publisher.
const REMOVED_MARKER: &str = "[Removed]";

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    source: Option<NewsApiSource>,
    author: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}

impl NewsApiArticle {
    fn into_raw(self) -> Option<RawArticle> {
        let url = clean_text(self.url.as_deref())?;
        if self.title.as_deref() == Some(REMOVED_MARKER) {
            return None;
        }
        let description = clean_text(self.description.as_deref());
        let content = clean_text(self.content.as_deref()).or_else(|| description.clone());

        Some(RawArticle {
            source: self
                .source
                .and_then(|s| s.name)
                .unwrap_or_default(),
            title: clean_text(self.title.as_deref()),
            description,
            content,
            author: clean_text(self.author.as_deref()),
            url,
            published: self.published_at,
        })
    }
}

/// `[today - window_days, today]`, narrowed to start at the newest stored
/// article so repeated runs only ask for what is missing.
pub fn search_window(today: NaiveDate, last_saved: Option<NaiveDate>, window_days: u64) -> DateWindow {
    let earliest = today.checked_sub_days(Days::new(window_days)).unwrap_or(today);
    let from = last_saved
        .map_or(earliest, |last| last.max(earliest))
        .min(today);
    DateWindow { from, to: today }
}

/// One result page. `returned` counts every item the provider sent,
/// including the ones filtered out of `articles`, so paging can tell a full
/// page from a short one.
#[derive(Debug, Default)]
pub struct Page {
    pub articles: Vec<RawArticle>,
    pub returned: usize,
}

pub struct NewsApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    page_size: u32,
    max_pages: u32,
    language: String,
}

impl NewsApiClient {
    pub fn new(api_key: &str, settings: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(Duration::from_secs(settings.http_timeout_secs))?,
            api_key: api_key.to_string(),
            base_url: settings.newsapi_base_url.trim_end_matches('/').to_string(),
            page_size: settings.newsapi_page_size.max(1),
            max_pages: settings.newsapi_max_pages.max(1),
            language: settings.newsapi_language.clone(),
        })
    }

    /// Fetch one result page. A non-200 status becomes [`AppError::Api`]
    /// carrying the provider's error code and message.
    pub async fn fetch_page(
        &self,
        query: &str,
        window: DateWindow,
        page: u32,
    ) -> Result<Page> {
        let params = [
            ("q", query.to_string()),
            ("from", window.from.format("%Y-%m-%d").to_string()),
            ("to", window.to.format("%Y-%m-%d").to_string()),
            ("language", self.language.clone()),
            ("sortBy", "publishedAt".to_string()),
            ("pageSize", self.page_size.to_string()),
            ("page", page.to_string()),
        ];

        let response = self
            .client
            .get(format!("{}/v2/everything", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            let message = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => format!(
                    "{}: {}",
                    err.code.unwrap_or_else(|| "unknown".to_string()),
                    err.message.unwrap_or_default()
                ),
                Err(_) => body,
            };
            return Err(AppError::Api {
                provider: "NewsAPI",
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EverythingResponse = response.json().await?;
        let returned = parsed.articles.len();
        Ok(Page {
            articles: parsed
                .articles
                .into_iter()
                .filter_map(NewsApiArticle::into_raw)
                .collect(),
            returned,
        })
    }

    /// Page through results until a short or empty page, the page cap, or an
    /// error. Errors end the query early; pages already fetched are kept.
    pub async fn fetch_query(&self, query: &str, window: DateWindow) -> Vec<RawArticle> {
        let mut articles = Vec::new();

        for page in 1..=self.max_pages {
            let batch = match self.fetch_page(query, window, page).await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!(query, page, error = %e, "NewsAPI request failed");
                    break;
                }
            };

            if batch.returned == 0 {
                break;
            }
            articles.extend(batch.articles);
            if batch.returned < self.page_size as usize {
                break;
            }
        }

        articles
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(base_url: &str, page_size: u32, max_pages: u32) -> NewsApiClient {
        let settings = FetchConfig {
            newsapi_base_url: base_url.to_string(),
            newsapi_page_size: page_size,
            newsapi_max_pages: max_pages,
            ..FetchConfig::default()
        };
        NewsApiClient::new("test-key", &settings).expect("client construction should not fail")
    }

    fn window() -> DateWindow {
        DateWindow {
            from: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
        }
    }

    fn article(n: u32) -> serde_json::Value {
        json!({
            "source": { "id": null, "name": "Wire" },
            "author": "Staff",
            "title": format!("Trump story {n}"),
            "description": "desc",
            "url": format!("https://wire.test/{n}"),
            "publishedAt": "2024-09-10T08:00:00Z",
            "content": null
        })
    }

    #[tokio::test]
    async fn paginates_until_short_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/everything"))
            .and(header("X-Api-Key", "test-key"))
            .and(query_param("q", "Trump"))
            .and(query_param("from", "2024-09-01"))
            .and(query_param("to", "2024-09-30"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "totalResults": 3,
                "articles": [article(1), article(2)]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v2/everything"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "totalResults": 3,
                "articles": [article(3)]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let articles = client(&server.uri(), 2, 5).fetch_query("Trump", window()).await;

        assert_eq!(articles.len(), 3);
        assert_eq!(articles[0].source, "Wire");
        assert_eq!(articles[0].url, "https://wire.test/1");
        assert_eq!(articles[0].content.as_deref(), Some("desc"));
        assert_eq!(articles[0].published.as_deref(), Some("2024-09-10T08:00:00Z"));
    }

    #[tokio::test]
    async fn filtered_items_still_count_toward_a_full_page() {
        let server = MockServer::start().await;
        let removed = json!({
            "source": { "name": "Wire" },
            "title": "[Removed]",
            "url": "https://removed.com"
        });

        Mock::given(method("GET"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "articles": [article(1), removed]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "articles": [article(2), article(3)]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "articles": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let articles = client(&server.uri(), 2, 5).fetch_query("Trump", window()).await;

        let urls: Vec<&str> = articles.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, ["https://wire.test/1", "https://wire.test/2", "https://wire.test/3"]);
    }

    #[tokio::test]
    async fn error_status_stops_but_keeps_earlier_pages() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "articles": [article(1), article(2)]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "status": "error",
                "code": "rateLimited",
                "message": "Too many requests"
            })))
            .mount(&server)
            .await;

        let articles = client(&server.uri(), 2, 5).fetch_query("Trump", window()).await;
        assert_eq!(articles.len(), 2);
    }

    #[tokio::test]
    async fn error_status_surfaces_provider_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "status": "error",
                "code": "apiKeyInvalid",
                "message": "Your API key is invalid"
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri(), 100, 5)
            .fetch_page("Trump", window(), 1)
            .await
            .unwrap_err();

        match err {
            AppError::Api { status, message, .. } => {
                assert_eq!(status, 401);
                assert!(message.contains("apiKeyInvalid"));
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stops_at_page_cap() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "articles": [article(1)]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let articles = client(&server.uri(), 1, 2).fetch_query("Trump", window()).await;
        assert_eq!(articles.len(), 2);
    }

    #[test]
    fn search_window_resumes_from_last_saved_date() {
        let today = NaiveDate::from_ymd_opt(2024, 10, 31).unwrap();
        let day = |d| NaiveDate::from_ymd_opt(2024, 10, d).unwrap();

        assert_eq!(search_window(today, None, 30).from, day(1));
        assert_eq!(search_window(today, Some(day(20)), 30).from, day(20));
        // older than the provider window: clamp to the window
        assert_eq!(
            search_window(today, NaiveDate::from_ymd_opt(2024, 6, 1), 30).from,
            day(1)
        );
        // feeds can post-date articles past today
        let ahead = NaiveDate::from_ymd_opt(2024, 11, 2);
        assert_eq!(search_window(today, ahead, 30), DateWindow { from: today, to: today });
    }

    #[test]
    fn removed_and_urlless_articles_are_skipped() {
        let removed: NewsApiArticle = serde_json::from_value(json!({
            "source": { "name": "Wire" },
            "title": "[Removed]",
            "url": "https://removed.com"
        }))
        .unwrap();
        assert!(removed.into_raw().is_none());

        let urlless: NewsApiArticle =
            serde_json::from_value(json!({ "title": "Trump", "url": null })).unwrap();
        assert!(urlless.into_raw().is_none());
    }
}
