use std::path::Path;

use chrono::NaiveDate;

use crate::dates;
use crate::error::Result;
use crate::models::Article;

use super::frame::Table;

const NEWS_HEADER: [&str; 9] = [
    "id",
    "source",
    "title",
    "url",
    "published_at",
    "content",
    "author",
    "politician",
    "sentiment",
];

/// Flat dump of the report rows, one line per article.
pub fn write_news(path: &Path, articles: &[Article]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(NEWS_HEADER)?;

    for article in articles {
        writer.write_record([
            article.id.to_string(),
            article.source.clone().unwrap_or_default(),
            article.title.clone().unwrap_or_default(),
            article.url.clone(),
            dates::format(&article.published_at),
            article.content.clone().unwrap_or_default(),
            article.author.clone().unwrap_or_default(),
            article.politician.clone(),
            article
                .sentiment
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Daily mention counts: a `date` column followed by one column per category.
pub fn write_timeseries(path: &Path, table: &Table<NaiveDate>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["date".to_string()];
    header.extend(table.series.iter().map(|s| s.label.clone()));
    writer.write_record(&header)?;

    for (i, day) in table.index.iter().enumerate() {
        let mut row = vec![day.format("%Y-%m-%d").to_string()];
        row.extend(table.series.iter().map(|s| format!("{}", s.values[i])));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}
