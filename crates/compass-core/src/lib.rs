//! ============================================================================
//! COMPASS-CORE: Career Compass memory
//! ============================================================================
//! This crate handles the assistant's long-lived knowledge of its user:
//! - Profile persistence in an embedded redb database (or Qdrant)
//! - Deterministic text embeddings and cosine-similarity recall
//! - Keyword fact extraction from user messages
//! - The session-scoped memory manager the conversation layer calls
//! ============================================================================

pub mod config;
pub mod db;
pub mod memory;
pub mod types;

// Re-export main types for convenience
pub use config::{BackendKind, MemoryConfig};
pub use db::{DbStats, ProfileDb};
pub use memory::{MemoryManager, Preference, Profile, ProfileUpdate};
pub use types::*;
