use std::time::Duration;

use reqwest::Client;

use crate::config::{Config, SentimentBackend};
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::Sentiment;

use super::{HuggingFaceClassifier, LexiconClassifier};

pub enum SentimentModel {
    Lexicon(LexiconClassifier),
    HuggingFace(HuggingFaceClassifier),
}

impl SentimentModel {
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings = &config.sentiment;
        match settings.backend {
            SentimentBackend::Lexicon => {
                Ok(SentimentModel::Lexicon(LexiconClassifier::new(settings.threshold)))
            }
            SentimentBackend::HuggingFace => {
                let token = config.huggingface_token.as_deref().ok_or_else(|| {
                    AppError::Config("HF_API_TOKEN is required for the huggingface backend".into())
                })?;
                let client = Client::builder()
                    .timeout(Duration::from_secs(config.fetch.http_timeout_secs.max(60)))
                    .build()?;
                Ok(SentimentModel::HuggingFace(HuggingFaceClassifier::new(
                    client,
                    token,
                    &settings.model,
                    &settings.inference_base_url,
                )))
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SentimentModel::Lexicon(_) => "lexicon",
            SentimentModel::HuggingFace(hf) => hf.model(),
        }
    }

    pub async fn classify(&self, inputs: &[String]) -> Result<Vec<Sentiment>> {
        match self {
            SentimentModel::Lexicon(lexicon) => {
                Ok(inputs.iter().map(|text| lexicon.classify(text)).collect())
            }
            SentimentModel::HuggingFace(hf) => hf.classify(inputs).await,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagReport {
    pub tagged: usize,
    pub batches: usize,
}

/// Labels every stored article that has no sentiment yet, one committed
/// batch at a time.
pub struct SentimentTagger {
    model: SentimentModel,
    batch_size: usize,
    max_chars: usize,
}

impl SentimentTagger {
    pub fn new(model: SentimentModel, batch_size: usize, max_chars: usize) -> Self {
        Self {
            model,
            batch_size: batch_size.max(1),
            max_chars,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            SentimentModel::from_config(config)?,
            config.sentiment.batch_size,
            config.sentiment.max_chars,
        ))
    }

    /// An inference error stops the sweep; batches written before it stay written.
    pub async fn run(&self, repo: &Repository) -> Result<TagReport> {
        let rows = repo.unscored().await?;
        if rows.is_empty() {
            tracing::info!("all articles already have a sentiment label");
            return Ok(TagReport::default());
        }

        tracing::info!(pending = rows.len(), model = self.model.name(), "tagging sentiment");
        let mut report = TagReport::default();

        for batch in rows.chunks(self.batch_size) {
            let inputs: Vec<String> = batch
                .iter()
                .map(|row| {
                    model_input(row.title.as_deref(), row.content.as_deref(), self.max_chars)
                })
                .collect();

            let labels = self.model.classify(&inputs).await?;
            let updates = batch.iter().map(|row| row.id).zip(labels).collect();

            report.tagged += repo.set_sentiments(updates).await?;
            report.batches += 1;
            tracing::debug!(batch = report.batches, tagged = report.tagged, "batch committed");
        }

        tracing::info!(tagged = report.tagged, batches = report.batches, "sentiment saved");
        Ok(report)
    }
}

/// `title + " " + content`, cut to at most `max_chars` characters.
pub fn model_input(title: Option<&str>, content: Option<&str>, max_chars: usize) -> String {
    let text = format!("{} {}", title.unwrap_or_default(), content.unwrap_or_default());
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text,
    }
}
