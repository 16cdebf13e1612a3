//! OpenAI-compatible embeddings provider.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::Embedder;
use crate::config::EmbeddingConfig;
use crate::retry;

#[derive(Debug, Clone)]
pub struct OpenAiEmbedderConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub dimension: usize,
    pub max_retries: u32,
}

impl OpenAiEmbedderConfig {
    pub fn from_embedding_config(config: &EmbeddingConfig, api_key: impl Into<String>) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: api_key.into(),
            model: config.model.clone(),
            dimension: config.dimension,
            max_retries: 3,
        }
    }
}

pub struct OpenAiEmbedder {
    client: Client,
    config: OpenAiEmbedderConfig,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRecord>,
}

#[derive(Deserialize)]
struct EmbeddingRecord {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(config: OpenAiEmbedderConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(60))
            .build()?;

        tracing::info!(
            base_url = %config.base_url,
            model = %config.model,
            dimension = config.dimension,
            "Creating OpenAI-compatible embedder"
        );

        Ok(Self { client, config })
    }

    async fn request_once(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        let endpoint = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&json!({ "model": self.config.model, "input": inputs }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let preview: String = text.chars().take(300).collect();
            return Err(anyhow!("embeddings API returned HTTP {}: {}", status, preview));
        }

        let parsed: EmbeddingsResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("malformed embeddings response: {}", e))?;

        if parsed.data.len() != inputs.len() {
            return Err(anyhow!(
                "embeddings API returned {} vectors for {} inputs",
                parsed.data.len(),
                inputs.len()
            ));
        }

        for record in &parsed.data {
            if record.embedding.len() != self.config.dimension {
                return Err(anyhow!(
                    "embedding dimension mismatch: expected {}, got {}",
                    self.config.dimension,
                    record.embedding.len()
                ));
            }
        }

        Ok(parsed.data.into_iter().map(|r| r.embedding).collect())
    }

    async fn request_with_retry(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        retry::with_retries(self.config.max_retries, "embeddings", || {
            self.request_once(inputs)
        })
        .await
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request_with_retry(&[text]).await?;
        Ok(vectors.remove(0))
    }

    async fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_query(text).await
    }

    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request_with_retry(texts).await
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}
