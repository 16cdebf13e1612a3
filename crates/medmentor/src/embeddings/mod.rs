//! Embedding calls behind a unified trait.

pub mod openai;

use anyhow::Result;
use async_trait::async_trait;

pub use openai::{OpenAiEmbedder, OpenAiEmbedderConfig};

/// Unified embedding trait. Query and document embedding are separate entry
/// points so models with asymmetric prefixes can be dropped in.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a document passage.
    async fn embed_document(&self, text: &str) -> Result<Vec<f32>>;

    /// Batch embed passages for ingestion.
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_document(text).await?);
        }
        Ok(vectors)
    }

    /// Embedding vector dimension.
    fn dimension(&self) -> usize;
}

/// Cosine similarity between two equal-length vectors. Returns 0.0 when
/// either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
