//! In-memory aggregations over loaded articles.
//!
//! Every function here is pure: it takes the loaded rows and returns the
//! numbers a chart needs, so the arithmetic is tested without touching
//! disk or a drawing backend.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, Days, NaiveDate, Timelike};

use crate::models::{Article, Sentiment};

/// One named column of a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub values: Vec<f64>,
}

/// Columns sharing a common index (days, weeks, sources, hours...).
#[derive(Debug, Clone, PartialEq)]
pub struct Table<K> {
    pub index: Vec<K>,
    pub series: Vec<Series>,
}

impl<K> Table<K> {
    pub fn is_empty(&self) -> bool {
        self.index.is_empty() || self.series.is_empty()
    }

    /// Largest single value in any column.
    pub fn max_value(&self) -> f64 {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .fold(0.0, f64::max)
    }
}

/// Trailing mean over `window` points; `None` until the window is full.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        out.push((i + 1 >= window).then(|| sum / window as f64));
    }
    out
}

pub fn cumulative(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// Every day from `start` to `end` inclusive.
fn days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// The rows a report is built from.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    articles: Vec<Article>,
}

impl Frame {
    pub fn new(mut articles: Vec<Article>) -> Self {
        articles.sort_by_key(|a| (a.published_at, a.id));
        Self { articles }
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    /// Distinct categories present, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.articles
            .iter()
            .map(|a| a.politician.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn first_day(&self) -> Option<NaiveDate> {
        self.articles.first().map(|a| a.published_at.date())
    }

    fn last_day(&self) -> Option<NaiveDate> {
        self.articles.last().map(|a| a.published_at.date())
    }

    /// Counts per category over a continuous index built by `bucket`, with
    /// missing buckets filled with zero.
    fn counts_by<F>(&self, index: Vec<NaiveDate>, bucket: F) -> Table<NaiveDate>
    where
        F: Fn(NaiveDate) -> NaiveDate,
    {
        let position: HashMap<NaiveDate, usize> =
            index.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let series = self
            .categories()
            .into_iter()
            .map(|label| {
                let mut values = vec![0.0; index.len()];
                for article in self.articles.iter().filter(|a| a.politician == label) {
                    if let Some(&i) = position.get(&bucket(article.published_at.date())) {
                        values[i] += 1.0;
                    }
                }
                Series { label, values }
            })
            .collect();

        Table { index, series }
    }

    /// Mentions per category per calendar day, from the first to the last
    /// article day.
    pub fn daily_counts(&self) -> Table<NaiveDate> {
        let index = match (self.first_day(), self.last_day()) {
            (Some(first), Some(last)) => days_between(first, last),
            _ => Vec::new(),
        };
        self.counts_by(index, |d| d)
    }

    /// Mentions per category per ISO week, indexed by the week's Monday.
    pub fn weekly_counts(&self) -> Table<NaiveDate> {
        let index = match (self.first_day(), self.last_day()) {
            (Some(first), Some(last)) => week_start(first)
                .iter_weeks()
                .take_while(|w| *w <= last)
                .collect(),
            _ => Vec::new(),
        };
        self.counts_by(index, week_start)
    }

    /// Mentions per category per calendar month, indexed by the 1st.
    pub fn monthly_counts(&self) -> Table<NaiveDate> {
        let mut index = Vec::new();
        if let (Some(first), Some(last)) = (self.first_day(), self.last_day()) {
            let mut month = month_start(first);
            while month <= last {
                index.push(month);
                match month.checked_add_months(chrono::Months::new(1)) {
                    Some(next) => month = next,
                    None => break,
                }
            }
        }
        self.counts_by(index, month_start)
    }

    /// Person x day mention matrix for the `days` days ending on the latest
    /// article date.
    pub fn heatmap(&self, days: u64) -> Table<NaiveDate> {
        let index = match self.last_day() {
            Some(last) if days > 0 => {
                let start = last
                    .checked_sub_days(Days::new(days - 1))
                    .unwrap_or(NaiveDate::MIN);
                days_between(start, last)
            }
            _ => Vec::new(),
        };
        self.counts_by(index, |d| d)
    }

    fn histogram<F>(&self, buckets: u32, key: F) -> Table<u32>
    where
        F: Fn(&Article) -> u32,
    {
        let index: Vec<u32> = (0..buckets).collect();
        let series = self
            .categories()
            .into_iter()
            .map(|label| {
                let mut values = vec![0.0; buckets as usize];
                for article in self.articles.iter().filter(|a| a.politician == label) {
                    if let Some(slot) = values.get_mut(key(article) as usize) {
                        *slot += 1.0;
                    }
                }
                Series { label, values }
            })
            .collect();
        Table { index, series }
    }

    /// Mentions by weekday, Monday = 0.
    pub fn weekday_counts(&self) -> Table<u32> {
        self.histogram(7, |a| a.published_at.weekday().num_days_from_monday())
    }

    /// Mentions by hour of the publish timestamp.
    pub fn hourly_counts(&self) -> Table<u32> {
        self.histogram(24, |a| a.published_at.hour())
    }

    fn source_ranking<'a, I>(rows: I, n: usize) -> Vec<String>
    where
        I: Iterator<Item = &'a Article>,
    {
        let mut totals: HashMap<&str, usize> = HashMap::new();
        for source in rows.filter_map(|a| a.source.as_deref()) {
            *totals.entry(source).or_default() += 1;
        }
        let mut ranked: Vec<(&str, usize)> = totals.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(n)
            .map(|(s, _)| s.to_string())
            .collect()
    }

    /// The `n` most frequent sources with a per-category breakdown.
    pub fn top_sources(&self, n: usize) -> Table<String> {
        let index = Self::source_ranking(self.articles.iter(), n);
        let position: HashMap<&str, usize> = index
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();

        let series = self
            .categories()
            .into_iter()
            .map(|label| {
                let mut values = vec![0.0; index.len()];
                for article in self.articles.iter().filter(|a| a.politician == label) {
                    if let Some(&i) = article.source.as_deref().and_then(|s| position.get(s)) {
                        values[i] += 1.0;
                    }
                }
                Series { label, values }
            })
            .collect();

        Table { index, series }
    }

    /// The `n` sources with the most labeled articles, split by sentiment.
    pub fn source_sentiment(&self, n: usize) -> Table<String> {
        let labeled = || self.articles.iter().filter(|a| a.sentiment.is_some());
        let index = Self::source_ranking(labeled(), n);
        let position: HashMap<&str, usize> = index
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();

        let series = Sentiment::ALL
            .iter()
            .map(|sentiment| {
                let mut values = vec![0.0; index.len()];
                for article in labeled().filter(|a| a.sentiment == Some(*sentiment)) {
                    if let Some(&i) = article.source.as_deref().and_then(|s| position.get(s)) {
                        values[i] += 1.0;
                    }
                }
                Series {
                    label: sentiment.as_str().to_string(),
                    values,
                }
            })
            .collect();

        Table { index, series }
    }

    /// Daily positive and negative counts over the continuous day range.
    pub fn daily_sentiment(&self) -> Table<NaiveDate> {
        let index = match (self.first_day(), self.last_day()) {
            (Some(first), Some(last)) => days_between(first, last),
            _ => Vec::new(),
        };
        let position: HashMap<NaiveDate, usize> =
            index.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let series = [Sentiment::Positive, Sentiment::Negative]
            .iter()
            .map(|sentiment| {
                let mut values = vec![0.0; index.len()];
                for article in self.articles.iter().filter(|a| a.sentiment == Some(*sentiment)) {
                    if let Some(&i) = position.get(&article.published_at.date()) {
                        values[i] += 1.0;
                    }
                }
                Series {
                    label: sentiment.as_str().to_string(),
                    values,
                }
            })
            .collect();

        Table { index, series }
    }

    /// Labeled-article counts per sentiment for each category. Categories
    /// without any labeled article are omitted.
    pub fn sentiment_share(&self) -> BTreeMap<String, Vec<(Sentiment, usize)>> {
        let mut counts: BTreeMap<String, BTreeMap<Sentiment, usize>> = BTreeMap::new();
        for article in &self.articles {
            if let Some(sentiment) = article.sentiment {
                *counts
                    .entry(article.politician.clone())
                    .or_default()
                    .entry(sentiment)
                    .or_default() += 1;
            }
        }

        counts
            .into_iter()
            .map(|(category, by_sentiment)| {
                let shares = Sentiment::ALL
                    .iter()
                    .map(|s| (*s, by_sentiment.get(s).copied().unwrap_or_default()))
                    .collect();
                (category, shares)
            })
            .collect()
    }
}
