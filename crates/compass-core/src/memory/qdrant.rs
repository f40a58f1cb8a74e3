//! ============================================================================
//! Qdrant Memory Store - Remote profile persistence
//! ============================================================================
//! Keeps the profile as a single point in a Qdrant collection. The JSON record
//! rides in the payload; the point vector is the profile embedding so the
//! collection can be searched directly once more than one profile lives there.
//! Wrap in `SemanticMemoryService` for recall.
//! ============================================================================

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, DeletePointsBuilder, Distance, GetPointsBuilder, PointId,
    PointStruct, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::embeddings::EMBEDDING_DIM;
use super::store::{decode_profile, MemoryBackend};
use super::types::{Profile, ProfileUpdate};
use crate::types::{MemoryError, MemoryResult};

/// Collection name for profiles
pub const COLLECTION_NAME: &str = "compass_profiles";

/// Payload key holding the serialized profile
const PROFILE_FIELD: &str = "profile";

/// Fixed point id of the single-user profile
const PROFILE_POINT_ID: Uuid = Uuid::from_u128(0x6f1d_2c3a_9b84_4e57_a0c1_5d2e_7f3b_8a90);

/// Profile store backed by a Qdrant collection
pub struct QdrantMemoryStore {
    client: Qdrant,
}

impl QdrantMemoryStore {
    /// Connect to Qdrant and make sure the collection exists
    pub async fn new(url: &str) -> MemoryResult<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| MemoryError::Remote(format!("Failed to create Qdrant client: {}", e)))?;

        let store = Self { client };
        store.ensure_collection().await?;
        info!("Qdrant memory store ready at {}", url);
        Ok(store)
    }

    async fn ensure_collection(&self) -> MemoryResult<()> {
        let exists = self
            .client
            .collection_exists(COLLECTION_NAME)
            .await
            .map_err(|e| remote("Failed to check collection existence", e))?;

        if exists {
            debug!("Collection {} already exists", COLLECTION_NAME);
            return Ok(());
        }

        info!("Creating collection: {}", COLLECTION_NAME);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(COLLECTION_NAME)
                    .vectors_config(VectorParamsBuilder::new(EMBEDDING_DIM as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| remote("Failed to create collection", e))?;
        Ok(())
    }

    async fn fetch(&self) -> MemoryResult<Option<Profile>> {
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(COLLECTION_NAME, vec![profile_point_id()]).with_payload(true),
            )
            .await
            .map_err(|e| remote("Failed to fetch profile", e))?;

        Ok(response.result.into_iter().next().map(|point| {
            point
                .payload
                .get(PROFILE_FIELD)
                .and_then(|v| v.as_str())
                .map(|raw| decode_profile(raw.as_bytes()))
                .unwrap_or_default()
        }))
    }
}

#[async_trait]
impl MemoryBackend for QdrantMemoryStore {
    async fn save(&self, update: ProfileUpdate) -> MemoryResult<()> {
        let mut profile = self.fetch().await?.unwrap_or_default();
        profile.apply(update);

        let payload: HashMap<String, Value> = [(
            PROFILE_FIELD.to_string(),
            Value::from(serde_json::to_string(&profile)?),
        )]
        .into_iter()
        .collect();

        let point = PointStruct::new(
            PROFILE_POINT_ID.to_string(),
            point_vector(profile.embedding.as_deref()),
            payload,
        );

        self.client
            .upsert_points(UpsertPointsBuilder::new(COLLECTION_NAME, vec![point]).wait(true))
            .await
            .map_err(|e| remote("Failed to upsert profile", e))?;

        debug!("Saved profile to Qdrant");
        Ok(())
    }

    async fn load(&self) -> Profile {
        match self.fetch().await {
            Ok(profile) => profile.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to load profile from Qdrant: {}", e);
                Profile::default()
            }
        }
    }

    async fn clear(&self) -> MemoryResult<()> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(COLLECTION_NAME)
                    .points(vec![profile_point_id()])
                    .wait(true),
            )
            .await
            .map_err(|e| remote("Failed to delete profile", e))?;

        info!("Cleared Qdrant profile");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "qdrant"
    }
}

fn profile_point_id() -> PointId {
    PointId::from(PROFILE_POINT_ID.to_string())
}

/// Point vector for a profile. Qdrant needs a non-zero vector of the
/// collection dimension even before anything has been embedded.
fn point_vector(embedding: Option<&[f32]>) -> Vec<f32> {
    match embedding {
        Some(e) if e.len() == EMBEDDING_DIM && e.iter().any(|v| *v != 0.0) => e.to_vec(),
        _ => {
            let mut placeholder = vec![0.0; EMBEDDING_DIM];
            placeholder[0] = 1.0;
            placeholder
        }
    }
}

fn remote(context: &str, err: impl std::fmt::Display) -> MemoryError {
    MemoryError::Remote(format!("{}: {}", context, err))
}
