//! ============================================================================
//! Embedding Service - Vector embeddings for semantic memory search
//! ============================================================================
//! Maps text to fixed-length vectors. The bundled `HashEmbedder` is a cheap
//! deterministic rolling hash: it carries no semantics, it only exercises the
//! retrieval pipeline. A real model plugs in behind the same trait.
//! ============================================================================

use async_trait::async_trait;
use tracing::trace;

use crate::types::MemoryResult;

/// Embedding dimension produced by the hash embedder
pub const EMBEDDING_DIM: usize = 128;

/// A fixed-length embedding vector
pub type Embedding = Vec<f32>;

/// Largest f32 strictly below 1.0
const MAX_COMPONENT: f32 = 1.0 - f32::EPSILON / 2.0;

/// Text-to-vector contract used by the semantic memory service
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate the embedding for a single text
    async fn embed(&self, text: &str) -> MemoryResult<Embedding>;

    /// Dimension of every vector this embedder returns
    fn dimension(&self) -> usize;

    /// Model name, for logging
    fn model(&self) -> &str;
}

/// Deterministic placeholder embedder.
///
/// Each UTF-16 code unit `c` at position `i` folds into bucket `i % 128` as
/// `bucket = ((bucket + c) % 100) / 100`, so every component lies in `[0, 1)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashEmbedder;

impl HashEmbedder {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous form of [`Embedder::embed`]; the hash never fails.
    pub fn embed_text(&self, text: &str) -> Embedding {
        let mut buckets = [0f64; EMBEDDING_DIM];
        for (i, unit) in text.encode_utf16().enumerate() {
            let bucket = &mut buckets[i % EMBEDDING_DIM];
            *bucket = ((*bucket + f64::from(unit)) % 100.0) / 100.0;
        }

        buckets
            .iter()
            .map(|&v| (v as f32).min(MAX_COMPONENT))
            .collect()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> MemoryResult<Embedding> {
        let embedding = self.embed_text(text);
        trace!("Embedded {} chars into {} dims", text.len(), embedding.len());
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    fn model(&self) -> &str {
        "hash-128"
    }
}
