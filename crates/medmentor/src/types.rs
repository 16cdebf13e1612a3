use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A trainee's profile record. Read-only from the engine's perspective —
/// created and maintained by an external admin process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Unique key, compared case-insensitively (stored lowercase).
    pub user_id: String,
    pub name: String,
    pub college: String,
    pub specialization: String,
    pub simulations_completed: u32,
    pub total_simulations: u32,
    pub best_performance: String,
    pub surgeries_this_week: u32,
    /// Bounded 0–5.
    pub avg_score: f32,
    pub feedback: String,
    /// Ordered skill-deficiency tags; the first one drives greetings and
    /// training plans.
    pub weak_areas: Vec<String>,
}

/// One completed exchange, written exactly once per turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLogEntry {
    pub user_id: String,
    pub message: String,
    pub reply: String,
    pub timestamp: DateTime<Utc>,
}

/// A chunk of source-document text returned by similarity search.
/// Ephemeral — consumed within a single reply computation, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub text: String,
    pub source: String,
    pub score: f32,
}
