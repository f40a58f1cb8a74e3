//! ============================================================================
//! Semantic Memory Service - Embeddings layered over a profile store
//! ============================================================================
//! Upserts attach the embedding of a text summary to the saved profile.
//! Recall re-embeds every stored interaction on each query and ranks them,
//! together with the whole profile, by cosine similarity to the query.
//!
//! Per-interaction embeddings are recomputed rather than cached: the hash
//! embedder is cheap. A model-backed embedder should cache them at write time.
//! ============================================================================

use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::embeddings::{Embedder, HashEmbedder, EMBEDDING_DIM};
use super::similarity::score_optional;
use super::store::{MemoryBackend, SemanticMemory};
use super::types::{Profile, ProfileUpdate, ScoredProfile};
use crate::types::{MemoryError, MemoryResult};

/// Semantic memory combining a backend store and an embedder
pub struct SemanticMemoryService {
    store: Arc<dyn MemoryBackend>,
    embedder: Arc<dyn Embedder>,
}

impl SemanticMemoryService {
    pub fn new(store: Arc<dyn MemoryBackend>, embedder: Arc<dyn Embedder>) -> Self {
        info!(
            "Semantic memory over {} backend (embedder: {}, {} dims)",
            store.name(),
            embedder.model(),
            embedder.dimension()
        );
        Self { store, embedder }
    }

    /// Service over `store` using the deterministic hash embedder
    pub fn with_hash_embedder(store: Arc<dyn MemoryBackend>) -> Self {
        Self::new(store, Arc::new(HashEmbedder::new()))
    }

    /// Recall candidate for one stored interaction
    async fn interaction_candidate(&self, profile_fragment: Profile, text: &str) -> Profile {
        let embedding = match self.embedder.embed(text).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!("Failed to embed interaction for recall: {}", e);
                None
            }
        };
        Profile {
            embedding,
            ..profile_fragment
        }
    }
}

#[async_trait]
impl MemoryBackend for SemanticMemoryService {
    /// Plain save. Embeddings are only written through `upsert_with_embedding`.
    async fn save(&self, mut update: ProfileUpdate) -> MemoryResult<()> {
        update.embedding = None;
        self.store.save(update).await
    }

    async fn load(&self) -> Profile {
        self.store.load().await
    }

    async fn clear(&self) -> MemoryResult<()> {
        self.store.clear().await
    }

    fn name(&self) -> &'static str {
        self.store.name()
    }
}

#[async_trait]
impl SemanticMemory for SemanticMemoryService {
    async fn upsert_with_embedding(&self, mut update: ProfileUpdate, text: &str) -> MemoryResult<()> {
        let embedding = self.embedder.embed(text).await?;
        if embedding.len() != EMBEDDING_DIM {
            return Err(MemoryError::Embedding(format!(
                "{} returned {} dims, expected {}",
                self.embedder.model(),
                embedding.len(),
                EMBEDDING_DIM
            )));
        }

        debug!(
            "Upserting profile with embedding (text: {:?}, head: {:?}...)",
            text,
            &embedding[..embedding.len().min(5)]
        );

        update.embedding = Some(embedding);
        update.last_interaction_date = Some(Utc::now());
        self.store.save(update).await
    }

    async fn find_similar_scored(&self, query: &str, limit: usize) -> Vec<ScoredProfile> {
        let current = self.store.load().await;

        let query_embedding = match self.embedder.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Failed to embed recall query, returning profile only: {}", e);
                return std::iter::once(ScoredProfile {
                    profile: current,
                    score: 0.0,
                })
                .take(limit)
                .collect();
            }
        };

        if current.conversation_history.is_empty() {
            debug!("No conversation history; returning current profile unranked");
            let score = score_optional(&query_embedding, current.embedding.as_deref());
            return std::iter::once(ScoredProfile {
                profile: current,
                score,
            })
            .take(limit)
            .collect();
        }

        let mut candidates = Vec::with_capacity(current.conversation_history.len() + 1);
        for interaction in &current.conversation_history {
            let fragment = Profile {
                conversation_history: vec![interaction.clone()],
                last_interaction_date: Some(interaction.timestamp),
                ..Profile::default()
            };
            candidates.push(
                self.interaction_candidate(fragment, &interaction.embedding_text())
                    .await,
            );
        }
        candidates.push(current);

        let mut scored: Vec<ScoredProfile> = candidates
            .into_iter()
            .map(|profile| {
                let score = score_optional(&query_embedding, profile.embedding.as_deref());
                ScoredProfile { profile, score }
            })
            .collect();

        // Stable: equal scores keep recency order
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(limit);

        debug!(
            "Recall for {:?}: {} results (top score {:?})",
            query,
            scored.len(),
            scored.first().map(|s| s.score)
        );
        scored
    }
}
