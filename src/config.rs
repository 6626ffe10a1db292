use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::classify::{default_persons, TrackedPerson};
use crate::error::{AppError, Result};
use crate::feed::{default_feeds, FeedSource};

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the database, the CSV dump and `graphs/`.
    pub output_dir: PathBuf,
    /// Database file; defaults to `<output_dir>/news.db`.
    pub db_path: Option<PathBuf>,

    pub newsapi_key: Option<String>,
    pub mediastack_key: Option<String>,
    pub huggingface_token: Option<String>,

    /// Earliest publish date collected and reported.
    pub since: NaiveDate,

    pub daily_interval_hours: u64,

    pub persons: Vec<TrackedPerson>,
    pub feeds: Vec<FeedSource>,
    pub fetch: FetchConfig,
    pub sentiment: SentimentConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub http_timeout_secs: u64,
    pub rss_max_concurrent: usize,
    pub newsapi_base_url: String,
    pub newsapi_page_size: u32,
    pub newsapi_max_pages: u32,
    pub newsapi_window_days: u64,
    pub newsapi_language: String,
    pub mediastack_base_url: String,
    pub mediastack_languages: String,
    pub mediastack_limit: u32,
    pub mediastack_delay_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentBackend {
    #[default]
    Lexicon,
    HuggingFace,
}

impl FromStr for SentimentBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "lexicon" => Ok(SentimentBackend::Lexicon),
            "huggingface" | "hf" => Ok(SentimentBackend::HuggingFace),
            other => Err(AppError::Config(format!(
                "unknown sentiment backend '{other}' (expected lexicon or huggingface)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub backend: SentimentBackend,
    pub batch_size: usize,
    /// Model input is cut to this many characters.
    pub max_chars: usize,
    pub model: String,
    pub inference_base_url: String,
    /// Lexicon scores within `±threshold` are neutral.
    pub threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Days past today still included, for feeds that post-date articles.
    pub lookahead_days: u64,
    pub rolling_window: usize,
    pub heatmap_days: u64,
    pub top_sources: usize,
    pub top_sentiment_sources: usize,
}

fn default_output_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("newswatch")
}

fn default_since() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 1).unwrap_or(NaiveDate::MIN)
}

fn default_daily_interval() -> u64 {
    24
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            db_path: None,
            newsapi_key: None,
            mediastack_key: None,
            huggingface_token: None,
            since: default_since(),
            daily_interval_hours: default_daily_interval(),
            persons: default_persons(),
            feeds: default_feeds(),
            fetch: FetchConfig::default(),
            sentiment: SentimentConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: 30,
            rss_max_concurrent: 5,
            newsapi_base_url: "https://newsapi.org".to_string(),
            newsapi_page_size: 100,
            newsapi_max_pages: 5,
            newsapi_window_days: 30,
            newsapi_language: "en".to_string(),
            mediastack_base_url: "http://api.mediastack.com".to_string(),
            mediastack_languages: "en,ru".to_string(),
            mediastack_limit: 100,
            mediastack_delay_ms: 1200,
        }
    }
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            backend: SentimentBackend::Lexicon,
            batch_size: 8,
            max_chars: 512,
            model: crate::ai::DEFAULT_MODEL.to_string(),
            inference_base_url: crate::ai::HF_INFERENCE_URL.to_string(),
            threshold: 0.2,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            lookahead_days: 3,
            rolling_window: 3,
            heatmap_days: 30,
            top_sources: 20,
            top_sentiment_sources: 15,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[redacted]");
        f.debug_struct("Config")
            .field("output_dir", &self.output_dir)
            .field("db_path", &self.db_path)
            .field("newsapi_key", &redact(&self.newsapi_key))
            .field("mediastack_key", &redact(&self.mediastack_key))
            .field("huggingface_token", &redact(&self.huggingface_token))
            .field("since", &self.since)
            .field("daily_interval_hours", &self.daily_interval_hours)
            .field("persons", &self.persons)
            .field("feeds", &self.feeds.len())
            .field("fetch", &self.fetch)
            .field("sentiment", &self.sentiment)
            .field("report", &self.report)
            .finish()
    }
}

impl Config {
    /// Defaults, then the TOML file (explicit path, or the user config file
    /// when present), then environment variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Self::config_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Config::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Overrides settings from environment-style lookups; blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("NEWSAPI_KEY") {
            self.newsapi_key = Some(key);
        }
        if let Some(key) = get("MEDIASTACK_KEY") {
            self.mediastack_key = Some(key);
        }
        if let Some(token) = get("HF_API_TOKEN") {
            self.huggingface_token = Some(token);
        }
        if let Some(dir) = get("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(path) = get("DB_PATH") {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(backend) = get("SENTIMENT_BACKEND") {
            self.sentiment.backend = backend.parse()?;
        }
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("newswatch")
            .join("config.toml")
    }

    pub fn database_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.output_dir.join("news.db"))
    }

    pub fn graphs_dir(&self) -> PathBuf {
        self.output_dir.join("graphs")
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join("news.csv")
    }

    pub fn require_newsapi_key(&self) -> Result<&str> {
        self.newsapi_key
            .as_deref()
            .ok_or_else(|| AppError::Config("NEWSAPI_KEY is not set".to_string()))
    }

    pub fn require_mediastack_key(&self) -> Result<&str> {
        self.mediastack_key
            .as_deref()
            .ok_or_else(|| AppError::Config("MEDIASTACK_KEY is not set".to_string()))
    }
}
