//! ============================================================================
//! Core Types - Errors shared across the memory subsystem
//! ============================================================================

/// Error types for the memory subsystem.
///
/// These never reach the conversation flow: the memory manager logs and
/// swallows them. Store implementations return them so callers that want to
/// know (tests, maintenance tools) can.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Remote backend error: {0}")]
    Remote(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl MemoryError {
    /// Wrap any displayable storage failure
    pub fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        MemoryError::Storage(format!("{}: {}", context, err))
    }
}

/// Result alias for memory operations
pub type MemoryResult<T> = std::result::Result<T, MemoryError>;
