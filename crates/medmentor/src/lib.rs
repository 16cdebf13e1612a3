pub mod config;
pub mod embeddings;
pub mod engine;
pub mod index;
pub mod intent;
pub mod llm;
pub mod processing;
pub mod prompt;
mod retry;
pub mod session;
pub mod store;
pub mod templates;
pub mod types;

// Re-export primary types for convenience
pub use config::MentorConfig;
pub use engine::{AttachedDocument, MentorEngine};
pub use index::DocumentIndex;
pub use intent::Intent;
pub use types::{ChatLogEntry, RetrievedPassage, UserProfile};

// Re-export capability traits so embedders/generators/stores can be swapped
pub use embeddings::Embedder;
pub use llm::{LlmError, TextGenerator};
pub use store::{ChatLog, ProfileStore};

// Re-export common types
pub use anyhow::{Error, Result};
pub use uuid::Uuid;
