//! ============================================================================
//! Memory Store - Pluggable profile persistence
//! ============================================================================
//! `MemoryBackend` is the load/save/clear contract every backend provides.
//! `SemanticMemory` extends it with embedding upserts and similarity recall.
//! Backends are chosen at construction; callers only see the traits.
//! ============================================================================

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::types::{Profile, ProfileUpdate, ScoredProfile};
use crate::db::{DbStats, ProfileDb};
use crate::types::MemoryResult;

/// Key the profile record is persisted under
pub const PROFILE_KEY: &str = "profile:default";

/// Durable profile storage contract
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// Shallow-merge `update` into the stored profile and persist it.
    ///
    /// Fields present in the update overwrite the stored fields wholesale;
    /// set unions and map merges are the caller's job.
    async fn save(&self, update: ProfileUpdate) -> MemoryResult<()>;

    /// Current profile, or an empty one. Read and parse failures are logged
    /// and degrade to the empty profile.
    async fn load(&self) -> Profile;

    /// Delete the persisted profile entirely
    async fn clear(&self) -> MemoryResult<()>;

    /// Short backend name, for logging
    fn name(&self) -> &'static str;
}

/// Storage that also understands embeddings and similarity recall
#[async_trait]
pub trait SemanticMemory: MemoryBackend {
    /// Save `update` together with the embedding of `text`
    async fn upsert_with_embedding(&self, update: ProfileUpdate, text: &str) -> MemoryResult<()>;

    /// Up to `limit` stored fragments most similar to `query`, best first
    async fn find_similar_scored(&self, query: &str, limit: usize) -> Vec<ScoredProfile>;

    /// [`SemanticMemory::find_similar_scored`] without the scores
    async fn find_similar(&self, query: &str, limit: usize) -> Vec<Profile> {
        self.find_similar_scored(query, limit)
            .await
            .into_iter()
            .map(|scored| scored.profile)
            .collect()
    }
}

/// Decode a persisted record; malformed bytes count as "no data"
pub(crate) fn decode_profile(bytes: &[u8]) -> Profile {
    match serde_json::from_slice::<Profile>(bytes) {
        Ok(mut profile) => {
            profile.enforce_bounds();
            profile
        }
        Err(e) => {
            warn!("Discarding malformed profile record: {}", e);
            Profile::default()
        }
    }
}

// ============================================================================
// Local (redb) backend
// ============================================================================

/// Profile store backed by the embedded redb database
pub struct LocalMemoryStore {
    db: ProfileDb,
}

impl LocalMemoryStore {
    /// Open the store at `path`, or the default database location
    pub fn open(path: Option<&Path>) -> MemoryResult<Self> {
        let db = ProfileDb::open(path)?;
        info!("Local memory store ready at {}", db.path().display());
        Ok(Self::new(db))
    }

    /// Store over an already opened database
    pub fn new(db: ProfileDb) -> Self {
        Self { db }
    }

    /// Underlying database
    pub fn db(&self) -> &ProfileDb {
        &self.db
    }

    pub fn stats(&self) -> MemoryResult<DbStats> {
        self.db.stats()
    }
}

#[async_trait]
impl MemoryBackend for LocalMemoryStore {
    async fn save(&self, update: ProfileUpdate) -> MemoryResult<()> {
        self.db.update(PROFILE_KEY, move |current| {
            let mut profile = current.map(decode_profile).unwrap_or_default();
            profile.apply(update);
            Ok(serde_json::to_vec(&profile)?)
        })?;
        debug!("Saved profile to local store");
        Ok(())
    }

    async fn load(&self) -> Profile {
        match self.db.get(PROFILE_KEY) {
            Ok(Some(bytes)) => decode_profile(&bytes),
            Ok(None) => Profile::default(),
            Err(e) => {
                warn!("Failed to read profile from local store: {}", e);
                Profile::default()
            }
        }
    }

    async fn clear(&self) -> MemoryResult<()> {
        let removed = self.db.delete(PROFILE_KEY)?;
        info!("Cleared local profile (existed: {})", removed);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Without an embedder the local store saves plainly and can only hand back
/// the whole profile as its single recall candidate.
#[async_trait]
impl SemanticMemory for LocalMemoryStore {
    async fn upsert_with_embedding(&self, mut update: ProfileUpdate, _text: &str) -> MemoryResult<()> {
        update.embedding = None;
        self.save(update).await
    }

    async fn find_similar_scored(&self, _query: &str, limit: usize) -> Vec<ScoredProfile> {
        let profile = self.load().await;
        std::iter::once(ScoredProfile { profile, score: 0.0 })
            .take(limit)
            .collect()
    }
}

// ============================================================================
// In-process backend
// ============================================================================

/// Non-durable store kept in process memory. Used for ephemeral sessions
/// and tests.
#[derive(Default)]
pub struct InMemoryStore {
    profile: RwLock<Option<Profile>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryBackend for InMemoryStore {
    async fn save(&self, update: ProfileUpdate) -> MemoryResult<()> {
        let mut slot = self.profile.write().await;
        slot.get_or_insert_with(Profile::default).apply(update);
        Ok(())
    }

    async fn load(&self) -> Profile {
        self.profile.read().await.clone().unwrap_or_default()
    }

    async fn clear(&self) -> MemoryResult<()> {
        *self.profile.write().await = None;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}
