use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::GenerationProvider;
use crate::config::GeminiConfig;
use crate::error::GenerationError;

// Cap on how much of a raw provider body ends up in logs and the audit trail
const MAX_ERROR_BODY: usize = 2_000;

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &GeminiConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

#[async_trait]
impl GenerationProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": prompt }
                ]
            }]
        });

        let res = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Provider {
                status: None,
                body: format!("Generate Request Failed: {}", e),
            })?;

        let status = res.status();
        let text = res.text().await.unwrap_or_default();

        if !status.is_success() {
            metrics::counter!("smarttrip_gemini_api_errors_total").increment(1);
            return Err(GenerationError::Provider {
                status: Some(status.as_u16()),
                body: truncate(&text),
            });
        }

        let json: Value = serde_json::from_str(&text).map_err(|_| GenerationError::Provider {
            status: Some(status.as_u16()),
            body: truncate(&text),
        })?;

        record_usage(&json);

        reply_text(&json)
            .map(str::to_string)
            .ok_or_else(|| GenerationError::Provider {
                status: Some(status.as_u16()),
                body: format!("No text in Gemini response: {}", truncate(&text)),
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// `candidates[0].content.parts[0].text`, if present and non-blank.
pub fn reply_text(response: &Value) -> Option<&str> {
    response["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .filter(|t| !t.trim().is_empty())
}

fn record_usage(response: &Value) {
    let usage = &response["usageMetadata"];
    if let Some(input_tokens) = usage["promptTokenCount"].as_u64() {
        metrics::counter!("smarttrip_gemini_tokens_total", "type" => "input").increment(input_tokens);
    }
    if let Some(output_tokens) = usage["candidatesTokenCount"].as_u64() {
        metrics::counter!("smarttrip_gemini_tokens_total", "type" => "output")
            .increment(output_tokens);
    }
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
