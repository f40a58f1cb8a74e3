//! ============================================================================
//! Memory Configuration - Backend selection and session wiring
//! ============================================================================
//! Resolved once at startup from the environment (after `.env` loading) and
//! turned into a single `MemoryManager` for the session.
//! ============================================================================

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::db::DB_PATH_ENV;
use crate::memory::{
    FactExtractor, FactVocabulary, InMemoryStore, LocalMemoryStore, MemoryManager,
    SemanticMemory, SemanticMemoryService,
};

/// Environment variable selecting the backend
pub const BACKEND_ENV: &str = "COMPASS_MEMORY_BACKEND";
/// Environment variable naming a vocabulary JSON file
pub const VOCABULARY_PATH_ENV: &str = "COMPASS_VOCABULARY_PATH";
pub const QDRANT_URL_ENV: &str = "QDRANT_URL";

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Which storage stack backs the memory manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Durable redb store without embeddings
    Local,
    /// Semantic service over the durable redb store
    #[default]
    Semantic,
    /// Semantic service over an in-process store
    Ephemeral,
    /// Semantic service over a remote Qdrant collection
    Qdrant,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BackendKind::Local => "local",
            BackendKind::Semantic => "semantic",
            BackendKind::Ephemeral => "ephemeral",
            BackendKind::Qdrant => "qdrant",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "semantic" => Ok(BackendKind::Semantic),
            "ephemeral" | "memory" | "in-memory" => Ok(BackendKind::Ephemeral),
            "qdrant" | "remote" => Ok(BackendKind::Qdrant),
            _ => Err(format!("Unknown memory backend: {}", s)),
        }
    }
}

/// Memory subsystem configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// redb file; `None` uses `COMPASS_DB_PATH` or `~/.compass/memory.redb`
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub qdrant_url: Option<String>,
    /// JSON file replacing the built-in fact vocabularies
    #[serde(default)]
    pub vocabulary_path: Option<PathBuf>,
}

impl MemoryConfig {
    /// Read configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let backend = match std::env::var(BACKEND_ENV) {
            Ok(raw) if !raw.trim().is_empty() => raw.parse::<BackendKind>().map_err(|e| anyhow!(e))?,
            _ => BackendKind::default(),
        };

        Ok(Self {
            backend,
            db_path: std::env::var(DB_PATH_ENV).ok().map(PathBuf::from),
            qdrant_url: std::env::var(QDRANT_URL_ENV).ok(),
            vocabulary_path: std::env::var(VOCABULARY_PATH_ENV).ok().map(PathBuf::from),
        })
    }

    pub fn qdrant_url(&self) -> &str {
        self.qdrant_url.as_deref().unwrap_or(DEFAULT_QDRANT_URL)
    }

    /// Fact vocabularies: the configured file, or the built-in lists
    pub fn vocabulary(&self) -> Result<FactVocabulary> {
        match &self.vocabulary_path {
            Some(path) => FactVocabulary::from_file(path)
                .with_context(|| format!("Failed to load vocabulary from {}", path.display())),
            None => Ok(FactVocabulary::default()),
        }
    }

    /// Construct the configured storage stack
    pub async fn build_store(&self) -> Result<Arc<dyn SemanticMemory>> {
        let store: Arc<dyn SemanticMemory> = match self.backend {
            BackendKind::Local => Arc::new(self.open_local()?),
            BackendKind::Semantic => {
                Arc::new(SemanticMemoryService::with_hash_embedder(Arc::new(self.open_local()?)))
            }
            BackendKind::Ephemeral => {
                Arc::new(SemanticMemoryService::with_hash_embedder(Arc::new(InMemoryStore::new())))
            }
            BackendKind::Qdrant => self.build_qdrant().await?,
        };
        Ok(store)
    }

    /// Build the session's memory manager
    pub async fn build_manager(&self) -> Result<MemoryManager> {
        let extractor = FactExtractor::new(self.vocabulary()?);
        let store = self.build_store().await?;
        info!("Memory configured (backend: {})", self.backend);
        Ok(MemoryManager::new(store, extractor))
    }

    fn open_local(&self) -> Result<LocalMemoryStore> {
        LocalMemoryStore::open(self.db_path.as_deref()).context("Failed to open local memory store")
    }

    #[cfg(feature = "qdrant")]
    async fn build_qdrant(&self) -> Result<Arc<dyn SemanticMemory>> {
        let remote = crate::memory::QdrantMemoryStore::new(self.qdrant_url())
            .await
            .context("Failed to connect to Qdrant")?;
        Ok(Arc::new(SemanticMemoryService::with_hash_embedder(Arc::new(remote))))
    }

    #[cfg(not(feature = "qdrant"))]
    async fn build_qdrant(&self) -> Result<Arc<dyn SemanticMemory>> {
        Err(anyhow!(
            "The qdrant backend requires compass-core to be built with the \"qdrant\" feature"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBackend, Preference};

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("local".parse::<BackendKind>().unwrap(), BackendKind::Local);
        assert_eq!(" Semantic ".parse::<BackendKind>().unwrap(), BackendKind::Semantic);
        assert_eq!("in-memory".parse::<BackendKind>().unwrap(), BackendKind::Ephemeral);
        assert_eq!("qdrant".parse::<BackendKind>().unwrap(), BackendKind::Qdrant);
        assert!("postgres".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::default(), BackendKind::Semantic);
        assert_eq!(BackendKind::Ephemeral.to_string(), "ephemeral");
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: MemoryConfig = serde_json::from_str(r#"{"backend": "local"}"#).unwrap();
        assert_eq!(config.backend, BackendKind::Local);
        assert!(config.db_path.is_none());
        assert_eq!(config.qdrant_url(), DEFAULT_QDRANT_URL);
    }

    #[test]
    fn test_missing_vocabulary_file_is_an_error() {
        let config = MemoryConfig {
            vocabulary_path: Some(PathBuf::from("/nonexistent/vocab.json")),
            ..Default::default()
        };
        assert!(config.vocabulary().is_err());
    }

    #[tokio::test]
    async fn test_build_semantic_manager() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig {
            db_path: Some(dir.path().join("memory.redb")),
            ..Default::default()
        };

        let manager = config.build_manager().await.unwrap();
        manager
            .save_preference(Preference::CareerField("education".into()))
            .await;

        let profile = manager.get_profile().await;
        assert_eq!(profile.career_field.as_deref(), Some("education"));
        assert!(profile.embedding.is_some());
    }

    #[tokio::test]
    async fn test_build_local_manager_skips_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig {
            backend: BackendKind::Local,
            db_path: Some(dir.path().join("memory.redb")),
            ..Default::default()
        };

        let manager = config.build_manager().await.unwrap();
        manager.extract_facts("design roles in boston").await;

        let profile = manager.get_profile().await;
        assert_eq!(profile.career_field.as_deref(), Some("design"));
        assert!(profile.embedding.is_none());
        assert_eq!(manager.store().name(), "local");
    }

    #[tokio::test]
    async fn test_custom_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = dir.path().join("vocab.json");
        std::fs::write(&vocab, r#"{"skills": ["rust"]}"#).unwrap();

        let config = MemoryConfig {
            backend: BackendKind::Ephemeral,
            vocabulary_path: Some(vocab),
            ..Default::default()
        };
        let manager = config.build_manager().await.unwrap();

        let facts = manager.extract_facts("rust and python").await;
        assert_eq!(facts.skills.len(), 1);
        assert!(facts.skills.contains("rust"));
    }

    #[cfg(not(feature = "qdrant"))]
    #[tokio::test]
    async fn test_qdrant_requires_feature() {
        let config = MemoryConfig {
            backend: BackendKind::Qdrant,
            ..Default::default()
        };
        assert!(config.build_manager().await.is_err());
    }
}
