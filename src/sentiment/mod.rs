use crate::config::SentimentConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Maps text to a polarity score in `[-1, 1]`.
#[async_trait]
pub trait SentimentScorer: Send + Sync {
    async fn score(&self, text: &str) -> Result<f64>;
}

/// Scores through a hosted text-classification model (Hugging Face
/// inference API shape).
///
/// The score is `P(positive) - P(negative)`.
pub struct HttpSentimentScorer {
    endpoint: String,
    api_key: String,
    client: Client,
}

impl HttpSentimentScorer {
    pub fn new(config: &SentimentConfig) -> Self {
        let endpoint = format!(
            "{}/{}",
            config.api_url.trim_end_matches('/'),
            config.model.trim_start_matches('/')
        );
        Self::with_endpoint(endpoint, config.api_key.clone(), config.timeout_secs)
    }

    fn with_endpoint(endpoint: String, api_key: String, timeout_secs: u64) -> Self {
        Self {
            endpoint,
            api_key,
            client: Client::builder()
                .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn parse_response(json: &Value) -> Result<f64> {
        // Single input comes back either as [[...]] or as [...]
        let outer = json
            .as_array()
            .filter(|outer| !outer.is_empty())
            .with_context(|| format!("Sentiment response is not a non-empty array: {}", json))?;
        let labels = match &outer[0] {
            Value::Array(inner) => inner,
            _ => outer,
        };

        let mut positive = None;
        let mut negative = None;
        for entry in labels {
            let label = entry["label"].as_str().unwrap_or_default();
            let Some(score) = entry["score"].as_f64() else {
                continue;
            };
            match polarity(label) {
                Some(Polarity::Positive) => positive = Some(score),
                Some(Polarity::Negative) => negative = Some(score),
                None => {}
            }
        }

        if positive.is_none() && negative.is_none() {
            anyhow::bail!("Sentiment response has no positive/negative label: {}", json);
        }
        let score = positive.unwrap_or(0.0) - negative.unwrap_or(0.0);
        Ok(score.clamp(-1.0, 1.0))
    }
}

enum Polarity {
    Positive,
    Negative,
}

fn polarity(label: &str) -> Option<Polarity> {
    match label.to_ascii_lowercase().as_str() {
        "positive" | "pos" | "label_2" => Some(Polarity::Positive),
        "negative" | "neg" | "label_0" => Some(Polarity::Negative),
        _ => None,
    }
}

#[async_trait]
impl SentimentScorer for HttpSentimentScorer {
    async fn score(&self, text: &str) -> Result<f64> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "inputs": text, "options": { "wait_for_model": true } }));
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let resp = request
            .send()
            .await
            .context("Failed to send request to sentiment API")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Sentiment API error ({}): {}", status.as_u16(), body);
        }
        let json: Value = resp
            .json()
            .await
            .context("Failed to parse sentiment API response")?;
        let score = Self::parse_response(&json)?;
        debug!("Scored {} chars as {:.3}", text.chars().count(), score);
        Ok(score)
    }
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_for_scoring(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
