//! Text generation behind a narrow capability interface.
//!
//! The engine only needs `generate(prompt, history) -> text`; everything else
//! (wire format, retries, auth) is the provider's business. Tests substitute
//! deterministic stand-ins.

pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

use crate::session::SessionTurn;

pub use openai::{OpenAiGenerator, OpenAiGeneratorConfig};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed generation response: {0}")]
    MalformedResponse(String),
}

/// External generation call. Implementations must be safe to share across
/// concurrent replies.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply for an assembled prompt, given the session's
    /// accumulated turns.
    async fn generate(&self, prompt: &str, history: &[SessionTurn]) -> Result<String, LlmError>;
}
