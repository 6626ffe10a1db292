//! Charts and CSV dumps built from the stored articles.

mod charts;
mod export;
mod frame;

use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate, Utc};
use plotters::style::{Color, RGBColor};

use crate::config::{Config, ReportConfig};
use crate::dates::DateRange;
use crate::db::Repository;
use crate::error::Result;
use crate::models::Sentiment;

use charts::{category_color, sentiment_color, Line, Slice};
use frame::{cumulative, rolling_mean, Frame, Series, Table};

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub rows: usize,
    pub charts: Vec<PathBuf>,
    pub csv: Option<PathBuf>,
}

/// Report window: `since` through a few days past `today`, for feeds that
/// post-date their entries.
pub fn report_range(since: NaiveDate, today: NaiveDate, lookahead_days: u64) -> DateRange {
    let end = today
        .checked_add_days(Days::new(lookahead_days))
        .unwrap_or(today);
    DateRange::new(since, end)
}

pub async fn generate(repo: &Repository, config: &Config) -> Result<ReportSummary> {
    let range = report_range(
        config.since,
        Utc::now().date_naive(),
        config.report.lookahead_days,
    );
    let frame = Frame::new(repo.load_articles(Some(range)).await?);
    if frame.is_empty() {
        tracing::info!(from = %range.start, to = %range.end, "no articles in report window");
        return Ok(ReportSummary::default());
    }

    std::fs::create_dir_all(&config.output_dir)?;

    let csv = config.csv_path();
    export::write_news(&csv, frame.articles())?;
    export::write_timeseries(&config.output_dir.join("timeseries.csv"), &frame.daily_counts())?;

    let graphs = config.graphs_dir();
    std::fs::create_dir_all(&graphs)?;
    let charts = render(&frame, &config.report, &graphs)?;

    tracing::info!(
        rows = frame.len(),
        charts = charts.len(),
        dir = %graphs.display(),
        "reports written"
    );

    Ok(ReportSummary {
        rows: frame.len(),
        charts,
        csv: Some(csv),
    })
}

struct ChartSet<'a> {
    dir: &'a Path,
    written: Vec<PathBuf>,
}

impl ChartSet<'_> {
    fn draw<F>(&mut self, name: &str, empty: bool, draw: F) -> Result<()>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        if empty {
            tracing::info!(chart = name, "no data, chart skipped");
            return Ok(());
        }
        let path = self.dir.join(format!("{name}.png"));
        draw(&path)?;
        tracing::debug!(chart = name, "chart written");
        self.written.push(path);
        Ok(())
    }
}

fn is_blank<K>(table: &Table<K>) -> bool {
    table.is_empty() || table.max_value() <= 0.0
}

fn day_labels(days: &[NaiveDate], format: &str) -> Vec<String> {
    days.iter().map(|d| d.format(format).to_string()).collect()
}

fn series_colors(series: &[Series]) -> Vec<RGBColor> {
    (0..series.len()).map(category_color).collect()
}

fn sentiment_colors(series: &[Series]) -> Vec<RGBColor> {
    series
        .iter()
        .map(|s| {
            s.label
                .parse::<Sentiment>()
                .map(sentiment_color)
                .unwrap_or_else(|_| category_color(0))
        })
        .collect()
}

/// Renders every chart with data into `dir`, returning the files written.
pub fn render(frame: &Frame, settings: &ReportConfig, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut set = ChartSet {
        dir,
        written: Vec::new(),
    };

    let daily = frame.daily_counts();
    let daily_labels = day_labels(&daily.index, "%Y-%m-%d");

    set.draw("mentions_timeline", is_blank(&daily), |path| {
        let mut lines = Vec::new();
        for (i, s) in daily.series.iter().enumerate() {
            let color = category_color(i);
            lines.push(Line {
                label: format!("{} (daily)", s.label),
                color: color.mix(0.35),
                width: 1,
                values: s.values.iter().copied().map(Some).collect(),
            });
            lines.push(Line {
                label: format!("{} ({}-day mean)", s.label, settings.rolling_window),
                color: color.to_rgba(),
                width: 3,
                values: rolling_mean(&s.values, settings.rolling_window),
            });
        }
        charts::line_chart(path, "Daily mentions", "Mentions", &daily_labels, &lines)
    })?;

    set.draw("stacked_mentions", is_blank(&daily), |path| {
        charts::stacked_area(path, "Share of daily mentions", &daily_labels, &daily.series)
    })?;

    let mood = frame.daily_sentiment();
    set.draw("sentiment_timeline", is_blank(&mood), |path| {
        let colors = sentiment_colors(&mood.series);
        let lines: Vec<Line> = mood
            .series
            .iter()
            .zip(colors)
            .map(|(s, color)| Line {
                label: s.label.clone(),
                color: color.to_rgba(),
                width: 2,
                values: s.values.iter().copied().map(Some).collect(),
            })
            .collect();
        let labels = day_labels(&mood.index, "%Y-%m-%d");
        charts::line_chart(path, "Daily sentiment", "Articles", &labels, &lines)
    })?;

    for (category, shares) in frame.sentiment_share() {
        let slices: Vec<Slice> = shares
            .iter()
            .map(|(sentiment, count)| Slice {
                label: sentiment.as_str().to_string(),
                value: *count as f64,
                color: sentiment_color(*sentiment),
            })
            .collect();
        let empty = slices.iter().all(|s| s.value <= 0.0);
        let name = format!("pie_sentiment_{}", category.to_lowercase());
        set.draw(&name, empty, |path| {
            charts::pie(path, &format!("Sentiment: {category}"), &slices)
        })?;
    }

    let weekly = frame.weekly_counts();
    set.draw("weekly_mentions", is_blank(&weekly), |path| {
        let labels = day_labels(&weekly.index, "%G-W%V");
        let colors = series_colors(&weekly.series);
        charts::grouped_bars(path, "Weekly mentions", "ISO week", &labels, &weekly.series, &colors)
    })?;

    let monthly = frame.monthly_counts();
    set.draw("monthly_mentions", is_blank(&monthly), |path| {
        let labels = day_labels(&monthly.index, "%Y-%m");
        let colors = series_colors(&monthly.series);
        charts::grouped_bars(path, "Monthly mentions", "Month", &labels, &monthly.series, &colors)
    })?;

    set.draw("cumulative_mentions", is_blank(&daily), |path| {
        let lines: Vec<Line> = daily
            .series
            .iter()
            .enumerate()
            .map(|(i, s)| Line {
                label: s.label.clone(),
                color: category_color(i).to_rgba(),
                width: 2,
                values: cumulative(&s.values).into_iter().map(Some).collect(),
            })
            .collect();
        charts::line_chart(path, "Cumulative mentions", "Mentions", &daily_labels, &lines)
    })?;

    let sources = frame.top_sources(settings.top_sources);
    set.draw("source_top20", is_blank(&sources), |path| {
        let colors = series_colors(&sources.series);
        let title = format!("Top {} sources", sources.index.len());
        charts::stacked_hbars(path, &title, &sources.index, &sources.series, &colors)
    })?;

    let source_mood = frame.source_sentiment(settings.top_sentiment_sources);
    set.draw("source_sentiment_bar", is_blank(&source_mood), |path| {
        let colors = sentiment_colors(&source_mood.series);
        charts::stacked_hbars(
            path,
            "Sentiment by source",
            &source_mood.index,
            &source_mood.series,
            &colors,
        )
    })?;

    let heat = frame.heatmap(settings.heatmap_days);
    set.draw("heatmap_month", is_blank(&heat), |path| {
        let labels = day_labels(&heat.index, "%m-%d");
        let title = format!("Mentions over the last {} days", heat.index.len());
        charts::heatmap(path, &title, &labels, &heat.series)
    })?;

    let weekday = frame.weekday_counts();
    set.draw("weekday_pattern", is_blank(&weekday), |path| {
        let labels: Vec<String> = WEEKDAYS.iter().map(|d| d.to_string()).collect();
        let colors = series_colors(&weekday.series);
        charts::grouped_bars(path, "Mentions by weekday", "Weekday", &labels, &weekday.series, &colors)
    })?;

    let hourly = frame.hourly_counts();
    set.draw("hourly_pattern", is_blank(&hourly), |path| {
        let labels: Vec<String> = hourly.index.iter().map(|h| format!("{h:02}")).collect();
        let colors = series_colors(&hourly.series);
        charts::grouped_bars(path, "Mentions by hour", "Hour", &labels, &hourly.series, &colors)
    })?;

    Ok(set.written)
}
