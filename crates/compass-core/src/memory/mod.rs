//! ============================================================================
//! Memory Module - Persistent user profile memory for Career Compass
//! ============================================================================
//! Remembers who the user is across sessions: career field, locations,
//! skills, job preferences, recent queries and conversation history.
//!
//! ## Features
//! - Durable profile record (embedded redb, or Qdrant behind the `qdrant` feature)
//! - Keyword fact extraction from user messages
//! - Embedding-based recall of past interactions
//! - Bounded query and conversation logs
//!
//! ## Architecture
//! ```text
//! User Message → Record Query → Extract Facts → Responder
//!                                                   ↓
//!                         Merge Fact Updates → Record Interaction
//!                                                   ↓
//!                  SemanticMemoryService (embed + upsert) → Backend
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use compass_core::memory::{LocalMemoryStore, MemoryManager, SemanticMemoryService};
//!
//! let store = LocalMemoryStore::open(None)?;
//! let service = SemanticMemoryService::with_hash_embedder(Arc::new(store));
//! let manager = MemoryManager::with_store(Arc::new(service));
//!
//! manager.extract_facts("Looking for remote python roles").await;
//! let related = manager.find_similar("python jobs", 3).await;
//! ```
//! ============================================================================

mod embeddings;
mod extract;
mod manager;
#[cfg(feature = "qdrant")]
mod qdrant;
mod semantic;
mod similarity;
mod store;
mod types;

// Re-export public types
pub use embeddings::{Embedder, Embedding, HashEmbedder, EMBEDDING_DIM};
pub use extract::{ExtractedFacts, FactExtractor, FactVocabulary};
pub use manager::{AssistantReply, MemoryManager, Responder};
#[cfg(feature = "qdrant")]
pub use qdrant::{QdrantMemoryStore, COLLECTION_NAME};
pub use semantic::SemanticMemoryService;
pub use similarity::cosine_similarity;
pub use store::{InMemoryStore, LocalMemoryStore, MemoryBackend, SemanticMemory, PROFILE_KEY};
pub use types::{
    Interaction, Preference, Profile, ProfileSummary, ProfileUpdate, ScoredProfile,
    MAX_CONVERSATION_HISTORY, MAX_PREVIOUS_QUERIES,
};
