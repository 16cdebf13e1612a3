//! OpenAI-compatible chat completion provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{LlmError, TextGenerator};
use crate::config::GenerationConfig;
use crate::retry;
use crate::session::{SessionTurn, TurnRole};

#[derive(Debug, Clone)]
pub struct OpenAiGeneratorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl OpenAiGeneratorConfig {
    pub fn from_generation_config(config: &GenerationConfig, api_key: impl Into<String>) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
            max_retries: config.max_retries,
        }
    }
}

pub struct OpenAiGenerator {
    client: Client,
    config: OpenAiGeneratorConfig,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl OpenAiGenerator {
    pub fn new(config: OpenAiGeneratorConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(config.timeout)
            .build()?;

        tracing::info!(
            base_url = %config.base_url,
            model = %config.model,
            "Creating OpenAI-compatible generator"
        );

        Ok(Self { client, config })
    }

    /// Build the chat messages payload: prior session turns, then the
    /// assembled prompt as the final user message.
    fn messages_payload(prompt: &str, history: &[SessionTurn]) -> Vec<Value> {
        let mut messages: Vec<Value> = history
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    TurnRole::User => "user",
                    TurnRole::Assistant => "assistant",
                };
                json!({ "role": role, "content": turn.text })
            })
            .collect();
        messages.push(json!({ "role": "user", "content": prompt }));
        messages
    }

    async fn request_once(&self, prompt: &str, history: &[SessionTurn]) -> Result<String, LlmError> {
        let endpoint = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": Self::messages_payload(prompt, history),
        });

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: text.chars().take(300).collect(),
            });
        }

        // Gateways occasionally return HTML error pages with a 200 status.
        if text.trim_start().starts_with('<') {
            return Err(LlmError::MalformedResponse(
                "endpoint returned HTML instead of JSON".to_string(),
            ));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| LlmError::MalformedResponse("no content in first choice".to_string()))
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, history: &[SessionTurn]) -> Result<String, LlmError> {
        retry::with_retries(self.config.max_retries, "chat_completion", || {
            self.request_once(prompt, history)
        })
        .await
    }
}
