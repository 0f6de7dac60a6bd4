use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::LlmClient;
use crate::error::{AppError, Result};
use crate::service::http::{create_client, ClientType};

const SERVICE: &str = "gemini";
const ERROR_BODY_LIMIT: usize = 300;

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// Google Gemini `generateContent` REST client.
pub struct GeminiClient {
    client: Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> anyhow::Result<Self> {
        Ok(Self::with_client(create_client(ClientType::Standard)?, settings))
    }

    pub fn with_client(client: Client, settings: GeminiSettings) -> Self {
        Self { client, settings }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }

    fn request_body(system_prompt: &str, user_prompt: &str, max_tokens: u32) -> Value {
        json!({
            "systemInstruction": {
                "parts": [{ "text": system_prompt }]
            },
            "contents": [{
                "role": "user",
                "parts": [{ "text": user_prompt }]
            }],
            "generationConfig": {
                "maxOutputTokens": max_tokens,
                "temperature": 0.2,
                "responseMimeType": "application/json"
            }
        })
    }
}

/// Concatenated text parts of the first candidate.
fn extract_text(response: &Value) -> Option<String> {
    let parts = response["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    (!text.trim().is_empty()).then_some(text)
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str, max_tokens: u32) -> Result<String> {
        log::debug!(
            "[LLM] {} request: {} + {} prompt chars, max {} tokens",
            self.settings.model,
            system_prompt.len(),
            user_prompt.len(),
            max_tokens
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.settings.api_key)
            .timeout(self.settings.timeout)
            .json(&Self::request_body(system_prompt, user_prompt, max_tokens))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::service(SERVICE, format!("timed out after {}s", self.settings.timeout.as_secs()))
                } else {
                    AppError::service(SERVICE, format!("request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let error_text: String = error_text.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(AppError::service(SERVICE, format!("API error {}: {}", status, error_text)));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| AppError::service(SERVICE, format!("invalid response body: {}", e)))?;

        let text = extract_text(&response_json).ok_or_else(|| {
            let reason = response_json["candidates"][0]["finishReason"]
                .as_str()
                .unwrap_or("unknown");
            AppError::service(SERVICE, format!("response contained no text (finish reason: {})", reason))
        })?;

        log::debug!("[LLM] {} response: {} chars", self.settings.model, text.len());
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "Gemini"
    }
}
