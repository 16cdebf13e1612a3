//! Storage contracts for profiles and chat logs.
//!
//! The engine only needs two narrow operations from the relational store:
//! profile lookup and append-only chat logging. Both are traits so the HTTP
//! layer can wire in its own database-backed implementations; the in-memory
//! versions here back tests and demos.

use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::types::{ChatLogEntry, UserProfile};

/// Read-only profile lookup. Profiles are maintained by an external admin
/// process; the engine never writes them.
pub trait ProfileStore: Send + Sync {
    /// Look up a profile by lowercase user id.
    fn get(&self, user_id: &str) -> Option<UserProfile>;

    /// All known user ids. Used by the authorization check to detect
    /// references to other users' data.
    fn user_ids(&self) -> Vec<String>;
}

/// Append-only record of completed exchanges.
pub trait ChatLog: Send + Sync {
    fn append(&self, entry: ChatLogEntry) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with the demo trainee profiles.
    pub fn with_demo_profiles() -> Self {
        let store = Self::new();
        for profile in demo_profiles() {
            store.insert(profile);
        }
        store
    }

    pub fn insert(&self, profile: UserProfile) {
        self.profiles
            .write()
            .insert(profile.user_id.to_lowercase(), profile);
    }
}

impl ProfileStore for MemoryProfileStore {
    fn get(&self, user_id: &str) -> Option<UserProfile> {
        self.profiles.read().get(user_id).cloned()
    }

    fn user_ids(&self) -> Vec<String> {
        self.profiles.read().keys().cloned().collect()
    }
}

#[derive(Default)]
pub struct MemoryChatLog {
    entries: RwLock<Vec<ChatLogEntry>>,
}

impl MemoryChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ChatLogEntry> {
        self.entries.read().clone()
    }
}

impl ChatLog for MemoryChatLog {
    fn append(&self, entry: ChatLogEntry) -> Result<()> {
        self.entries.write().push(entry);
        Ok(())
    }
}

/// The two demo trainee records shipped with the system.
pub fn demo_profiles() -> Vec<UserProfile> {
    vec![
        UserProfile {
            user_id: "ishaan".to_string(),
            name: "Ishaan".to_string(),
            college: "AIIMS Delhi".to_string(),
            specialization: "Cardiothoracic Surgery".to_string(),
            simulations_completed: 7,
            total_simulations: 10,
            best_performance: "Heart Bypass - 4.8 ⭐".to_string(),
            surgeries_this_week: 3,
            avg_score: 4.4,
            feedback: "Needs to revise tool usage in neuro".to_string(),
            weak_areas: vec!["artery clamping".to_string()],
        },
        UserProfile {
            user_id: "jyotika".to_string(),
            name: "Jyotika".to_string(),
            college: "CMC Vellore".to_string(),
            specialization: "Neurosurgery".to_string(),
            simulations_completed: 5,
            total_simulations: 8,
            best_performance: "Neuro - 4.6 ⭐".to_string(),
            surgeries_this_week: 5,
            avg_score: 4.2,
            feedback: "Impressive handling of neurosurgery steps".to_string(),
            weak_areas: vec!["suture stitching".to_string()],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn seeded_store_resolves_demo_users() {
        let store = MemoryProfileStore::with_demo_profiles();
        let profile = store.get("ishaan").unwrap();
        assert_eq!(profile.college, "AIIMS Delhi");
        assert!(store.get("unknown").is_none());

        let mut ids = store.user_ids();
        ids.sort();
        assert_eq!(ids, vec!["ishaan", "jyotika"]);
    }

    #[test]
    fn insert_normalizes_user_id_key() {
        let store = MemoryProfileStore::new();
        let mut profile = demo_profiles().remove(0);
        profile.user_id = "Ishaan".to_string();
        store.insert(profile);
        assert!(store.get("ishaan").is_some());
    }

    #[test]
    fn chat_log_appends_in_order() {
        let log = MemoryChatLog::new();
        for text in ["one", "two"] {
            log.append(ChatLogEntry {
                user_id: "ishaan".to_string(),
                message: text.to_string(),
                reply: "ok".to_string(),
                timestamp: Utc::now(),
            })
            .unwrap();
        }
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "one");
        assert_eq!(entries[1].message, "two");
    }
}
