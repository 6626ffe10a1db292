use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Sentiment;

pub const HF_INFERENCE_URL: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_MODEL: &str = "distilbert/distilbert-base-uncased-finetuned-sst-2-english";

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a [String],
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f32,
}

#[derive(Debug, Deserialize)]
struct InferenceError {
    error: String,
}

/// Text classification through the Hugging Face inference API.
pub struct HuggingFaceClassifier {
    client: Client,
    token: String,
    model: String,
    base_url: String,
}

impl HuggingFaceClassifier {
    pub fn new(client: Client, token: &str, model: &str, base_url: &str) -> Self {
        Self {
            client,
            token: token.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Classify a batch; the result is aligned with `inputs`.
    pub async fn classify(&self, inputs: &[String]) -> Result<Vec<Sentiment>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/models/{}", self.base_url, self.model))
            .bearer_auth(&self.token)
            .json(&InferenceRequest { inputs })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            let message = serde_json::from_str::<InferenceError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(AppError::Api {
                provider: "Hugging Face",
                status: status.as_u16(),
                message,
            });
        }

        let predictions: Vec<Vec<LabelScore>> = response.json().await?;
        if predictions.len() != inputs.len() {
            return Err(AppError::Sentiment(format!(
                "model returned {} predictions for {} inputs",
                predictions.len(),
                inputs.len()
            )));
        }

        predictions
            .into_iter()
            .map(|scores| {
                scores
                    .into_iter()
                    .max_by(|a, b| a.score.total_cmp(&b.score))
                    .map(|top| Sentiment::from_label(&top.label))
                    .ok_or_else(|| AppError::Sentiment("empty prediction".to_string()))
            })
            .collect()
    }
}
