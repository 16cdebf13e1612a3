//! Per-user conversation state.
//!
//! One session per lowercase user id, created lazily on first message and
//! kept for the process lifetime. Transcripts are bounded to `max_turns`
//! (oldest dropped first) so long-lived sessions cannot grow without limit.
//! The store hands out an `Arc<tokio::Mutex<_>>` per user: holding that lock
//! for the duration of a turn gives single-writer-per-key discipline while
//! different users proceed concurrently.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn label(&self) -> &'static str {
        match self {
            TurnRole::User => "User",
            TurnRole::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTurn {
    pub role: TurnRole,
    pub text: String,
}

#[derive(Debug)]
pub struct ConversationSession {
    turns: VecDeque<SessionTurn>,
    max_turns: usize,
    pub created_at: DateTime<Utc>,
    pub last_interaction: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(max_turns: usize) -> Self {
        let now = Utc::now();
        Self {
            turns: VecDeque::new(),
            max_turns,
            created_at: now,
            last_interaction: now,
        }
    }

    /// Append a turn, dropping the oldest when the cap is reached.
    pub fn append(&mut self, role: TurnRole, text: impl Into<String>) {
        self.turns.push_back(SessionTurn {
            role,
            text: text.into(),
        });
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
        self.last_interaction = Utc::now();
    }

    /// Turns in arrival order.
    pub fn transcript(&self) -> Vec<SessionTurn> {
        self.turns.iter().cloned().collect()
    }

    /// Transcript rendered as one line per turn, for prompt assembly.
    pub fn format_transcript(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("{}: {}", turn.role.label(), turn.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Concurrent map of user id → session. Injected into the engine rather than
/// held as ambient state.
pub struct SessionStore {
    sessions: DashMap<String, Arc<Mutex<ConversationSession>>>,
    max_turns: usize,
}

impl SessionStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_turns,
        }
    }

    /// Get the session for a user, creating it on first contact. The caller
    /// locks the returned mutex for the whole turn.
    pub fn get_or_create(&self, user_id: &str) -> Arc<Mutex<ConversationSession>> {
        self.sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ConversationSession::new(self.max_turns))))
            .clone()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
