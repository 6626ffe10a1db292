use std::time::Duration;

use chrono::SecondsFormat;
use feed_rs::parser;
use futures::stream::{self, StreamExt};
use reqwest::Client;

use crate::error::Result;
use crate::models::{clean_text, RawArticle};
use crate::services::http_client;

use super::FeedSource;

pub struct FeedFetcher {
    client: Client,
    max_concurrent: usize,
}

impl FeedFetcher {
    pub fn new(timeout: Duration, max_concurrent: usize) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            max_concurrent: max_concurrent.max(1),
        })
    }

    pub async fn fetch_feed(&self, source: &FeedSource) -> Result<Vec<RawArticle>> {
        let response = self.client.get(&source.url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch feed: HTTP {}", response.status()).into());
        }

        let bytes = response.bytes().await?;
        parse_entries(&source.name, &bytes)
    }

    /// Fetch every feed with bounded concurrency; a failing feed is logged and skipped.
    pub async fn fetch_all(&self, feeds: &[FeedSource]) -> Vec<RawArticle> {
        let results: Vec<Vec<RawArticle>> = stream::iter(feeds)
            .map(|feed| async move {
                match self.fetch_feed(feed).await {
                    Ok(articles) => {
                        tracing::info!(feed = %feed.name, count = articles.len(), "fetched feed");
                        Some(articles)
                    }
                    Err(e) => {
                        tracing::warn!(feed = %feed.name, url = %feed.url, error = %e, "feed fetch failed");
                        None
                    }
                }
            })
            .buffer_unordered(self.max_concurrent)
            .filter_map(|r| async { r })
            .collect()
            .await;

        results.into_iter().flatten().collect()
    }
}

/// Parse an RSS/Atom document into raw articles.
///
/// Entries without a publish or update timestamp are skipped. Content comes
/// from the entry body, falling back to the summary, reduced to plain text.
pub fn parse_entries(source: &str, bytes: &[u8]) -> Result<Vec<RawArticle>> {
    let feed = parser::parse(bytes)?;

    let articles = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let published = entry.published.or(entry.updated)?;

            let content_html = entry
                .content
                .as_ref()
                .and_then(|c| c.body.as_deref())
                .or_else(|| entry.summary.as_ref().map(|s| s.content.as_str()));

            let content = content_html.and_then(html_to_text);

            Some(RawArticle {
                source: source.to_string(),
                title: clean_text(entry.title.as_ref().map(|t| t.content.as_str())),
                description: None,
                content,
                author: entry.authors.first().and_then(|a| clean_text(Some(a.name.as_str()))),
                url: entry
                    .links
                    .first()
                    .map(|l| l.href.trim().to_string())
                    .unwrap_or_default(),
                published: Some(published.to_rfc3339_opts(SecondsFormat::Secs, true)),
            })
        })
        .collect();

    Ok(articles)
}

fn html_to_text(html: &str) -> Option<String> {
    let text = match html2text::from_read(html.as_bytes(), 10_000) {
        Ok(t) => t,
        Err(e) => {
            tracing::debug!("Failed to convert HTML to text: {}", e);
            return None;
        }
    };
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    clean_text(Some(collapsed.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>World Desk</title>
    <link>https://news.test/</link>
    <description>World news</description>
    <item>
      <title> Trump signs order </title>
      <link>https://news.test/trump-order</link>
      <description>&lt;p&gt;The president &lt;b&gt;signed&lt;/b&gt; an order.&lt;/p&gt;</description>
      <pubDate>Tue, 01 Oct 2024 12:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Undated item</title>
      <link>https://news.test/undated</link>
      <description>No date here</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_dated_entries_into_raw_articles() {
        let articles = parse_entries("World Desk", RSS.as_bytes()).unwrap();

        assert_eq!(articles.len(), 1);
        let article = &articles[0];
        assert_eq!(article.source, "World Desk");
        assert_eq!(article.title.as_deref(), Some("Trump signs order"));
        assert_eq!(article.url, "https://news.test/trump-order");
        assert_eq!(article.published.as_deref(), Some("2024-10-01T12:00:00Z"));

        let content = article.content.as_deref().unwrap();
        assert!(content.contains("president"));
        assert!(!content.contains("<p>"));
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(parse_entries("Broken", b"definitely not a feed").is_err());
    }

    #[tokio::test]
    async fn feeds_are_requested_with_the_shared_client() {
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/world.xml"))
            .and(header("user-agent", concat!("newswatch/", env!("CARGO_PKG_VERSION"))))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone.xml"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let feeds = [
            FeedSource {
                name: "World Desk".into(),
                url: format!("{}/world.xml", server.uri()),
            },
            FeedSource {
                name: "Gone".into(),
                url: format!("{}/gone.xml", server.uri()),
            },
        ];
        let fetcher = FeedFetcher::new(Duration::from_secs(5), 2).unwrap();
        let articles = fetcher.fetch_all(&feeds).await;

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].source, "World Desk");
    }
}
