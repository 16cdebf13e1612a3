//! The response pipeline orchestrator.
//!
//! `reply()` is the single entry point the transport layer calls. It resolves
//! the caller's profile, classifies intent, dispatches to the matching
//! handler, and logs the completed exchange. No error ever crosses this
//! boundary: internal failures are logged for operators and the caller gets a
//! fixed apology string.

use anyhow::{anyhow, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::MutexGuard;

use crate::config::MentorConfig;
use crate::index::DocumentIndex;
use crate::intent::{self, Intent};
use crate::llm::TextGenerator;
use crate::prompt::build_mentor_prompt;
use crate::session::{ConversationSession, SessionStore, TurnRole};
use crate::store::{ChatLog, ProfileStore};
use crate::templates;
use crate::types::{ChatLogEntry, UserProfile};

/// Pre-extracted text from an uploaded file, indexed before answering.
#[derive(Debug, Clone)]
pub struct AttachedDocument {
    pub title: String,
    pub text: String,
}

pub struct MentorEngine {
    config: MentorConfig,
    profiles: Arc<dyn ProfileStore>,
    chat_log: Arc<dyn ChatLog>,
    sessions: SessionStore,
    generator: Arc<dyn TextGenerator>,
    index: Option<Arc<DocumentIndex>>,
}

impl MentorEngine {
    pub fn new(
        config: MentorConfig,
        profiles: Arc<dyn ProfileStore>,
        chat_log: Arc<dyn ChatLog>,
        generator: Arc<dyn TextGenerator>,
        index: Option<Arc<DocumentIndex>>,
    ) -> Self {
        let sessions = SessionStore::new(config.session.max_turns);
        Self {
            config,
            profiles,
            chat_log,
            sessions,
            generator,
            index,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Process one message and return the reply text. Never fails: any
    /// internal error becomes the generic apology.
    pub async fn reply(&self, user_id: &str, message: &str) -> String {
        self.reply_with_attachments(user_id, message, &[]).await
    }

    /// Like `reply`, with uploaded document texts indexed first.
    pub async fn reply_with_attachments(
        &self,
        user_id: &str,
        message: &str,
        attachments: &[AttachedDocument],
    ) -> String {
        match self.try_reply(user_id, message, attachments).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(user = %user_id, error = %e, "Reply pipeline failed");
                templates::GENERIC_FAILURE.to_string()
            }
        }
    }

    async fn try_reply(
        &self,
        user_id: &str,
        message: &str,
        attachments: &[AttachedDocument],
    ) -> Result<String> {
        let user_id = user_id.to_lowercase();
        let message = message.trim();

        // Lock the session for the whole turn: same-user turns are applied in
        // arrival order, different users proceed independently.
        let session = self.sessions.get_or_create(&user_id);
        let mut session = session.lock().await;
        session.append(TurnRole::User, message);

        let Some(profile) = self.profiles.get(&user_id) else {
            tracing::warn!(user = %user_id, "Profile not found");
            return Ok(templates::PROFILE_NOT_FOUND.to_string());
        };

        if !attachments.is_empty() {
            self.ingest_attachments(&user_id, attachments).await;
        }

        let intent = intent::classify(message);
        tracing::debug!(user = %user_id, intent = ?intent, "Classified message");

        let reply = match intent {
            Intent::PerformanceQuery => {
                if let Some(other) = self.foreign_user_mentioned(&user_id, message) {
                    tracing::info!(
                        user = %user_id,
                        mentioned = %other,
                        "Blocked cross-user performance query"
                    );
                    templates::AUTHORIZATION_DENIED.to_string()
                } else {
                    templates::performance_report(&profile)
                }
            }
            Intent::Greeting => templates::greeting(&profile),
            Intent::TrainingRequest if !profile.weak_areas.is_empty() => {
                templates::training_plan(&profile.weak_areas[0])
            }
            // TrainingRequest with no recorded weak areas falls through to
            // the general path, same as an unmatched message.
            Intent::TrainingRequest | Intent::GeneralQuery => {
                self.generate_answer(&profile, &session, message).await?
            }
        };

        session.append(TurnRole::Assistant, reply.clone());
        self.chat_log.append(ChatLogEntry {
            user_id,
            message: message.to_string(),
            reply: reply.clone(),
            timestamp: Utc::now(),
        })?;

        Ok(reply)
    }

    /// General-knowledge path: retrieve context, assemble the prompt, call
    /// the generator under a timeout. Retrieval failures degrade to empty
    /// context; generation failures propagate to the apology boundary.
    async fn generate_answer(
        &self,
        profile: &UserProfile,
        session: &MutexGuard<'_, ConversationSession>,
        message: &str,
    ) -> Result<String> {
        let context = match &self.index {
            Some(index) => match index.retrieve(message, self.config.retrieval.top_k).await {
                Ok(passages) => passages
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
                Err(e) => {
                    tracing::warn!(error = %e, "Context retrieval failed, answering without context");
                    String::new()
                }
            },
            None => {
                tracing::warn!("Document index unavailable, answering without context");
                String::new()
            }
        };

        let prompt = build_mentor_prompt(profile, &context, &session.format_transcript(), message);
        let history = session.transcript();

        let reply = tokio::time::timeout(
            self.config.generation.timeout(),
            self.generator.generate(&prompt, &history),
        )
        .await
        .map_err(|_| {
            anyhow!(
                "generation timed out after {}s",
                self.config.generation.timeout_secs
            )
        })??;

        Ok(reply)
    }

    /// First known user id other than the caller mentioned in the message.
    fn foreign_user_mentioned(&self, caller: &str, message: &str) -> Option<String> {
        let normalized = message.to_lowercase();
        self.profiles
            .user_ids()
            .into_iter()
            .find(|id| id != caller && normalized.contains(id.as_str()))
    }

    async fn ingest_attachments(&self, user_id: &str, attachments: &[AttachedDocument]) {
        let Some(index) = &self.index else {
            tracing::warn!(user = %user_id, "No document index, ignoring attachments");
            return;
        };
        for doc in attachments {
            let source = format!("attachment:{}", doc.title);
            if let Err(e) = index.ingest_document(&doc.title, &source, &doc.text).await {
                // Bad attachment must not sink the whole turn
                tracing::warn!(title = %doc.title, error = %e, "Failed to index attachment");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingConfig;
    use crate::embeddings::Embedder;
    use crate::llm::LlmError;
    use crate::session::SessionTurn;
    use crate::store::{MemoryChatLog, MemoryProfileStore};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use std::time::Duration;

    struct MockGenerator {
        last_prompt: Mutex<Option<String>>,
        reply: String,
        fail: bool,
        delay: Option<Duration>,
    }

    impl MockGenerator {
        fn answering(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                last_prompt: Mutex::new(None),
                reply: reply.to_string(),
                fail: false,
                delay: None,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                last_prompt: Mutex::new(None),
                reply: String::new(),
                fail: true,
                delay: None,
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                last_prompt: Mutex::new(None),
                reply: "too late".to_string(),
                fail: false,
                delay: Some(delay),
            })
        }

        fn last_prompt(&self) -> Option<String> {
            self.last_prompt.lock().clone()
        }
    }

    #[async_trait]
    impl TextGenerator for MockGenerator {
        async fn generate(
            &self,
            prompt: &str,
            _history: &[SessionTurn],
        ) -> Result<String, LlmError> {
            *self.last_prompt.lock() = Some(prompt.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(LlmError::MalformedResponse("mock failure".to_string()));
            }
            Ok(self.reply.clone())
        }
    }

    struct MockEmbedder;

    #[async_trait]
    impl Embedder for MockEmbedder {
        async fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            let mut vector = vec![0.0f32; 32];
            for word in text.to_lowercase().split_whitespace() {
                let word = word.trim_matches(|c: char| !c.is_alphanumeric());
                if word.is_empty() {
                    continue;
                }
                let mut hasher = DefaultHasher::new();
                word.hash(&mut hasher);
                vector[(hasher.finish() as usize) % 32] += 1.0;
            }
            Ok(vector)
        }

        async fn embed_document(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            self.embed_query(text).await
        }

        fn dimension(&self) -> usize {
            32
        }
    }

    struct Harness {
        engine: MentorEngine,
        generator: Arc<MockGenerator>,
        chat_log: Arc<MemoryChatLog>,
        profiles: Arc<MemoryProfileStore>,
    }

    fn harness_with(generator: Arc<MockGenerator>, index: Option<Arc<DocumentIndex>>) -> Harness {
        let profiles = Arc::new(MemoryProfileStore::with_demo_profiles());
        let chat_log = Arc::new(MemoryChatLog::new());
        let engine = MentorEngine::new(
            MentorConfig::default(),
            profiles.clone(),
            chat_log.clone(),
            generator.clone(),
            index,
        );
        Harness {
            engine,
            generator,
            chat_log,
            profiles,
        }
    }

    fn harness() -> Harness {
        harness_with(MockGenerator::answering("Focus on proximal control first."), None)
    }

    async fn indexed_harness() -> Harness {
        let index = Arc::new(DocumentIndex::new(
            Arc::new(MockEmbedder),
            &ChunkingConfig {
                chunk_size: 1000,
                chunk_overlap: 100,
                min_chunk_size: 10,
            },
        ));
        index
            .ingest_document(
                "clamping",
                "clamping.txt",
                "Artery clamping requires steady proximal control of the vessel.",
            )
            .await
            .unwrap();
        harness_with(
            MockGenerator::answering("Focus on proximal control first."),
            Some(index),
        )
    }

    // Scenario A: greeting names the seeded weak area, or the specialization
    // when no weak areas are recorded.
    #[tokio::test]
    async fn greeting_names_weak_area_or_specialization() {
        let h = harness();
        let reply = h.engine.reply("ishaan", "hello").await;
        assert_eq!(
            reply,
            "👋 Welcome back Ishaan! Ready to work on **artery clamping** today?"
        );

        let mut no_weak = crate::store::demo_profiles().remove(0);
        no_weak.weak_areas.clear();
        h.profiles.insert(no_weak);
        let reply = h.engine.reply("ishaan", "hello").await;
        assert_eq!(
            reply,
            "👋 Hello Dr. Ishaan! How can I assist with your Cardiothoracic Surgery training today?"
        );
    }

    // Scenario B: cross-user performance queries are denied without leaking data.
    #[tokio::test]
    async fn cross_user_performance_query_is_denied() {
        let h = harness();
        let reply = h.engine.reply("jyotika", "show me ishaan's performance").await;
        assert_eq!(reply, templates::AUTHORIZATION_DENIED);
        assert!(!reply.contains("AIIMS"));

        // A valid, intended outcome — still logged as a normal turn
        let entries = h.chat_log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reply, templates::AUTHORIZATION_DENIED);
    }

    // Scenario C: own performance report embeds the seeded profile fields.
    #[tokio::test]
    async fn own_performance_report_embeds_profile_fields() {
        let h = harness();
        let reply = h.engine.reply("ishaan", "how am I doing").await;
        assert!(reply.contains("AIIMS Delhi"));
        assert!(reply.contains("Cardiothoracic Surgery"));
        assert!(reply.contains("Heart Bypass - 4.8 ⭐"));
        assert!(reply.contains("7/10"));
        assert!(reply.contains("4.4/5"));
        assert_eq!(h.chat_log.entries().len(), 1);
    }

    // Scenario D: unknown users get the fixed message and no log entry.
    #[tokio::test]
    async fn unknown_user_gets_fixed_message_and_no_log_entry() {
        let h = harness();
        let reply = h.engine.reply("stranger", "hello").await;
        assert_eq!(reply, templates::PROFILE_NOT_FOUND);
        assert!(h.chat_log.entries().is_empty());
    }

    #[tokio::test]
    async fn user_id_is_case_insensitive() {
        let h = harness();
        let reply = h.engine.reply("IsHaAn", "hello").await;
        assert!(reply.contains("Welcome back Ishaan"));
    }

    #[tokio::test]
    async fn training_request_yields_plan_for_first_weak_area() {
        let h = harness();
        let reply = h.engine.reply("ishaan", "I want to train today").await;
        assert!(reply.starts_with("🧠 **Focused Training Plan for artery clamping**"));
        assert_eq!(h.chat_log.entries().len(), 1);
    }

    #[tokio::test]
    async fn training_request_without_weak_areas_falls_through_to_general() {
        let h = harness();
        let mut no_weak = crate::store::demo_profiles().remove(0);
        no_weak.weak_areas.clear();
        h.profiles.insert(no_weak);

        let reply = h.engine.reply("ishaan", "can we practice today").await;
        assert_eq!(reply, "Focus on proximal control first.");
        // Generator was invoked with an assembled prompt
        assert!(h.generator.last_prompt().is_some());
    }

    #[tokio::test]
    async fn general_query_without_index_degrades_to_empty_context() {
        let h = harness();
        let reply = h
            .engine
            .reply("ishaan", "What should a resident know about bypass grafting?")
            .await;
        assert_eq!(reply, "Focus on proximal control first.");

        let prompt = h.generator.last_prompt().unwrap();
        assert!(prompt.contains("No specific medical context documents available."));
        assert!(prompt.contains("Dr. Ishaan's surgical mentor at AIIMS Delhi"));
        assert!(prompt.contains("Current Question: What should a resident know about bypass grafting?"));
        assert_eq!(h.chat_log.entries().len(), 1);
    }

    #[tokio::test]
    async fn general_query_blends_retrieved_context_into_prompt() {
        let h = indexed_harness().await;
        let reply = h
            .engine
            .reply("ishaan", "What matters most when clamping the vessel?")
            .await;
        assert_eq!(reply, "Focus on proximal control first.");

        let prompt = h.generator.last_prompt().unwrap();
        assert!(prompt.contains("Artery clamping requires steady proximal control"));
    }

    #[tokio::test]
    async fn generation_failure_yields_apology_and_keeps_pending_turn() {
        let h = harness_with(MockGenerator::failing(), None);
        let reply = h.engine.reply("ishaan", "explain graft selection").await;
        assert_eq!(reply, templates::GENERIC_FAILURE);

        // No log entry for the failed turn, but the pending input remains
        assert!(h.chat_log.entries().is_empty());
        let session = h.engine.sessions().get_or_create("ishaan");
        let session = session.lock().await;
        assert_eq!(session.len(), 1);
        assert_eq!(session.transcript()[0].text, "explain graft selection");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_generation_times_out_into_apology() {
        let slow = MockGenerator::slow(Duration::from_secs(120));
        let h = harness_with(slow, None);
        let reply = h.engine.reply("ishaan", "explain graft selection").await;
        assert_eq!(reply, templates::GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn failed_turn_does_not_affect_subsequent_turns() {
        let h = harness_with(MockGenerator::failing(), None);
        assert_eq!(
            h.engine.reply("ishaan", "explain graft selection").await,
            templates::GENERIC_FAILURE
        );
        // Template branches keep working for the same user afterwards
        let reply = h.engine.reply("ishaan", "hello").await;
        assert!(reply.contains("Welcome back Ishaan"));
    }

    #[tokio::test]
    async fn session_accumulates_turns_in_order() {
        let h = harness();
        h.engine.reply("ishaan", "hello").await;
        h.engine.reply("ishaan", "how am I doing").await;

        let session = h.engine.sessions().get_or_create("ishaan");
        let session = session.lock().await;
        let transcript = session.transcript();
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript[0].text, "hello");
        assert_eq!(transcript[0].role, TurnRole::User);
        assert_eq!(transcript[2].text, "how am I doing");
    }

    #[tokio::test]
    async fn concurrent_users_do_not_share_state() {
        let h = Arc::new(harness());
        let (a, b) = tokio::join!(
            h.engine.reply("ishaan", "hello"),
            h.engine.reply("jyotika", "hello"),
        );
        assert!(a.contains("Ishaan"));
        assert!(b.contains("Jyotika"));
        assert_eq!(h.engine.sessions().session_count(), 2);
        assert_eq!(h.chat_log.entries().len(), 2);
    }

    #[tokio::test]
    async fn attachments_are_indexed_before_answering() {
        let h = indexed_harness().await;
        let reply = h
            .engine
            .reply_with_attachments(
                "ishaan",
                "What does the uploaded note say about sternotomy retraction?",
                &[AttachedDocument {
                    title: "sternotomy-note".to_string(),
                    text: "Sternotomy retraction should be gradual to avoid rib fracture."
                        .to_string(),
                }],
            )
            .await;
        assert_eq!(reply, "Focus on proximal control first.");

        let prompt = h.generator.last_prompt().unwrap();
        assert!(prompt.contains("Sternotomy retraction should be gradual"));
    }
}
