//! ============================================================================
//! Memory Manager - Orchestrates profile updates and recall
//! ============================================================================
//! High-level API the conversation layer calls into. Built once per session
//! and passed to callers. Every operation is best-effort: storage failures
//! are logged and swallowed so the conversation never stalls on memory.
//! ============================================================================

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::extract::{ExtractedFacts, FactExtractor};
use super::store::{MemoryBackend, SemanticMemory};
use super::types::{
    Interaction, Preference, Profile, ProfileSummary, ProfileUpdate, ScoredProfile,
    MAX_CONVERSATION_HISTORY, MAX_PREVIOUS_QUERIES,
};
use crate::types::MemoryResult;

/// Reply from the upstream intent/response collaborator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantReply {
    pub content: String,
    /// Fields the collaborator wants merged into the profile
    pub fact_updates: Option<ProfileUpdate>,
}

impl AssistantReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            fact_updates: None,
        }
    }

    pub fn with_updates(mut self, updates: ProfileUpdate) -> Self {
        self.fact_updates = Some(updates);
        self
    }
}

/// Classifies a message and produces the assistant's reply
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, message: &str, profile: &Profile) -> AssistantReply;
}

/// Memory manager combining a semantic store and fact extraction
pub struct MemoryManager {
    store: Arc<dyn SemanticMemory>,
    extractor: FactExtractor,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl MemoryManager {
    /// Create a new memory manager
    pub fn new(store: Arc<dyn SemanticMemory>, extractor: FactExtractor) -> Self {
        info!("Memory manager using {} backend", store.name());
        Self {
            store,
            extractor,
            write_lock: Mutex::new(()),
        }
    }

    /// Manager with the default fact vocabularies
    pub fn with_store(store: Arc<dyn SemanticMemory>) -> Self {
        Self::new(store, FactExtractor::default())
    }

    /// Get reference to the store (for advanced operations)
    pub fn store(&self) -> &Arc<dyn SemanticMemory> {
        &self.store
    }

    // ========================================================================
    // Public operations
    // ========================================================================

    /// Set one profile field and re-embed its description.
    ///
    /// Set-valued fields are unioned with what is stored and job preferences
    /// are merged key by key; everything else overwrites.
    pub async fn save_preference(&self, preference: Preference) {
        let _guard = self.write_lock.lock().await;
        let key = preference.key();
        if let Err(e) = self.save_preference_locked(preference).await {
            warn!("Failed to save preference {}: {}", key, e);
        }
    }

    /// Current profile (empty if nothing is stored or the store is unreadable)
    pub async fn get_profile(&self) -> Profile {
        self.store.load().await
    }

    /// Forget everything
    pub async fn clear(&self) {
        let _guard = self.write_lock.lock().await;
        match self.store.clear().await {
            Ok(()) => info!("Cleared user memory"),
            Err(e) => warn!("Failed to clear memory: {}", e),
        }
    }

    /// Remember a query, keeping the most recent ten
    pub async fn record_query(&self, query: &str) {
        let _guard = self.write_lock.lock().await;
        if let Err(e) = self.record_query_locked(query).await {
            warn!("Failed to update query history: {}", e);
        }
    }

    /// Pull career field, locations and skills out of a message and store them
    pub async fn extract_facts(&self, message: &str) -> ExtractedFacts {
        let _guard = self.write_lock.lock().await;
        self.extract_facts_locked(message).await
    }

    /// Append an exchange to the conversation history, keeping the last twenty
    pub async fn record_interaction(&self, user_message: &str, assistant_response: &str) {
        let _guard = self.write_lock.lock().await;
        if let Err(e) = self
            .record_interaction_locked(user_message, assistant_response)
            .await
        {
            warn!("Failed to record interaction: {}", e);
        }
    }

    /// Merge fact updates handed back by an upstream collaborator
    pub async fn apply_updates(&self, updates: ProfileUpdate) {
        let _guard = self.write_lock.lock().await;
        if let Err(e) = self.apply_updates_locked(updates).await {
            warn!("Failed to apply fact updates: {}", e);
        }
    }

    /// Run one conversation turn through memory.
    ///
    /// Records the query, extracts facts, asks `responder` for a reply given
    /// the updated profile, merges any fact updates from the reply and logs
    /// the exchange. The write lock is released while the responder runs, so
    /// a responder may itself call back into this manager.
    pub async fn process_turn(&self, message: &str, responder: &dyn Responder) -> AssistantReply {
        let profile = {
            let _guard = self.write_lock.lock().await;
            if let Err(e) = self.record_query_locked(message).await {
                warn!("Failed to update query history: {}", e);
            }
            self.extract_facts_locked(message).await;
            self.store.load().await
        };

        let reply = responder.respond(message, &profile).await;

        let _guard = self.write_lock.lock().await;
        if let Some(updates) = reply.fact_updates.clone() {
            if let Err(e) = self.apply_updates_locked(updates).await {
                warn!("Failed to apply fact updates: {}", e);
            }
        }
        if let Err(e) = self.record_interaction_locked(message, &reply.content).await {
            warn!("Failed to record interaction: {}", e);
        }

        reply
    }

    /// Career field and set sizes for a status indicator
    pub async fn summary(&self) -> ProfileSummary {
        self.store.load().await.summary()
    }

    /// Past interactions most relevant to `query`
    pub async fn find_similar(&self, query: &str, limit: usize) -> Vec<Profile> {
        self.store.find_similar(query, limit).await
    }

    pub async fn find_similar_scored(&self, query: &str, limit: usize) -> Vec<ScoredProfile> {
        self.store.find_similar_scored(query, limit).await
    }

    // ========================================================================
    // Locked internals (caller holds `write_lock`)
    // ========================================================================

    async fn save_preference_locked(&self, preference: Preference) -> MemoryResult<()> {
        let key = preference.key();
        let text = preference.describe();
        let mut profile = self.store.load().await;

        match preference {
            Preference::PreferredLocations(locations) => {
                profile.preferred_locations.extend(locations)
            }
            Preference::Skills(skills) => profile.skills.extend(skills),
            Preference::JobPreferences(prefs) => profile.job_preferences.extend(prefs),
            other => other.apply_to(&mut profile),
        }

        self.store
            .upsert_with_embedding(ProfileUpdate::from(profile), &text)
            .await?;
        debug!("Saved user preference: {}", key);
        Ok(())
    }

    async fn record_query_locked(&self, query: &str) -> MemoryResult<()> {
        let profile = self.store.load().await;
        let mut queries = Vec::with_capacity(MAX_PREVIOUS_QUERIES);
        queries.push(query.to_string());
        queries.extend(profile.previous_queries);
        queries.truncate(MAX_PREVIOUS_QUERIES);

        self.save_preference_locked(Preference::PreviousQueries(queries))
            .await
    }

    async fn record_interaction_locked(
        &self,
        user_message: &str,
        assistant_response: &str,
    ) -> MemoryResult<()> {
        let profile = self.store.load().await;
        let mut history = Vec::with_capacity(MAX_CONVERSATION_HISTORY);
        history.push(Interaction::new(user_message, assistant_response));
        history.extend(profile.conversation_history);
        history.truncate(MAX_CONVERSATION_HISTORY);

        self.save_preference_locked(Preference::ConversationHistory(history))
            .await
    }

    async fn extract_facts_locked(&self, message: &str) -> ExtractedFacts {
        let facts = self.extractor.extract(message);
        if facts.is_empty() {
            return facts;
        }

        debug!(
            "Extracted facts: career={:?} locations={:?} skills={:?}",
            facts.career_field, facts.locations, facts.skills
        );

        if let Some(field) = &facts.career_field {
            if let Err(e) = self
                .save_preference_locked(Preference::CareerField(field.clone()))
                .await
            {
                warn!("Failed to store career field: {}", e);
            }
        }
        if !facts.locations.is_empty() {
            if let Err(e) = self
                .save_preference_locked(Preference::PreferredLocations(facts.locations.clone()))
                .await
            {
                warn!("Failed to store locations: {}", e);
            }
        }
        if !facts.skills.is_empty() {
            if let Err(e) = self
                .save_preference_locked(Preference::Skills(facts.skills.clone()))
                .await
            {
                warn!("Failed to store skills: {}", e);
            }
        }

        facts
    }

    async fn apply_updates_locked(&self, updates: ProfileUpdate) -> MemoryResult<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let text = describe_update(&updates);
        let mut profile = self.store.load().await;

        // Embeddings and timestamps are owned by the semantic store
        let ProfileUpdate {
            career_field,
            preferred_locations,
            skills,
            job_preferences,
            previous_queries,
            conversation_history,
            last_interaction_date: _,
            embedding: _,
        } = updates;

        if let Some(field) = career_field {
            profile.career_field = Some(field);
        }
        if let Some(locations) = preferred_locations {
            profile.preferred_locations.extend(locations);
        }
        if let Some(skills) = skills {
            profile.skills.extend(skills);
        }
        if let Some(prefs) = job_preferences {
            profile.job_preferences.extend(prefs);
        }
        if let Some(queries) = previous_queries {
            profile.previous_queries = queries;
        }
        if let Some(history) = conversation_history {
            profile.conversation_history = history;
        }

        self.store
            .upsert_with_embedding(ProfileUpdate::from(profile), &text)
            .await?;
        debug!("Applied fact updates");
        Ok(())
    }
}

/// `"<key>: <value>"` lines for every field an update sets
fn describe_update(updates: &ProfileUpdate) -> String {
    match serde_json::to_value(updates) {
        Ok(serde_json::Value::Object(fields)) => fields
            .iter()
            .filter(|(key, _)| key.as_str() != "embedding" && key.as_str() != "lastInteractionDate")
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}
