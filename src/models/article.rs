use chrono::NaiveDateTime;

use super::Sentiment;

/// An article as a source adapter hands it over, before classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawArticle {
    /// Publisher or feed name.
    pub source: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub url: String,
    /// Publish timestamp exactly as the source reported it.
    pub published: Option<String>,
}

impl RawArticle {
    /// Title, description and content joined with single spaces.
    pub fn text(&self) -> String {
        [&self.title, &self.description, &self.content]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A row of the `news` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: i64,
    pub source: Option<String>,
    pub title: Option<String>,
    pub url: String,
    pub published_at: NaiveDateTime,
    pub content: Option<String>,
    pub author: Option<String>,
    pub politician: String,
    pub sentiment: Option<Sentiment>,
}

/// The fields the sentiment sweep needs from a row still lacking a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnscoredRow {
    pub id: i64,
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Trims a text field, mapping empty or whitespace-only values to `None`.
pub fn clean_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
