//! End-to-end memory behaviour through the public API, backed by a real
//! redb file.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use compass_core::memory::{
    cosine_similarity, AssistantReply, HashEmbedder, Interaction, LocalMemoryStore, MemoryBackend,
    MemoryManager, Preference, Profile, ProfileUpdate, Responder, SemanticMemory,
    SemanticMemoryService, EMBEDDING_DIM, MAX_CONVERSATION_HISTORY,
};
use compass_core::{BackendKind, MemoryConfig};
use tempfile::TempDir;

fn semantic_manager() -> (TempDir, MemoryManager) {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalMemoryStore::open(Some(&dir.path().join("memory.redb"))).unwrap();
    let service = SemanticMemoryService::with_hash_embedder(Arc::new(store));
    (dir, MemoryManager::with_store(Arc::new(service)))
}

fn strings(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

struct EchoResponder;

#[async_trait]
impl Responder for EchoResponder {
    async fn respond(&self, message: &str, profile: &Profile) -> AssistantReply {
        AssistantReply::text(format!(
            "{} (I know {} of your skills)",
            message,
            profile.skills.len()
        ))
    }
}

#[test]
fn embedding_is_deterministic_and_bounded() {
    let embedder = HashEmbedder::new();
    let a = embedder.embed_text("senior data engineer in berlin");
    let b = embedder.embed_text("senior data engineer in berlin");

    assert_eq!(a, b);
    assert_eq!(a.len(), EMBEDDING_DIM);
    assert!(a.iter().all(|v| (0.0..1.0).contains(v)));
    assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    assert_eq!(cosine_similarity(&a, &a[..64]), 0.0);
}

#[tokio::test]
async fn queries_keep_ten_newest() {
    let (_dir, manager) = semantic_manager();
    for i in 1..=11 {
        manager.record_query(&format!("query number {}", i)).await;
    }

    let queries = manager.get_profile().await.previous_queries;
    assert_eq!(queries.len(), 10);
    assert_eq!(queries.first().map(String::as_str), Some("query number 11"));
    assert_eq!(queries.last().map(String::as_str), Some("query number 2"));
}

#[tokio::test]
async fn skills_accumulate_across_preference_saves() {
    let (_dir, manager) = semantic_manager();
    manager
        .save_preference(Preference::Skills(strings(&["python"])))
        .await;
    manager
        .save_preference(Preference::Skills(strings(&["python", "sql"])))
        .await;

    let skills = manager.get_profile().await.skills;
    assert!(skills.contains("python"));
    assert!(skills.contains("sql"));
    assert_eq!(skills.len(), 2);
}

#[tokio::test]
async fn fact_extraction_updates_profile() {
    let (_dir, manager) = semantic_manager();
    manager
        .extract_facts("I want a remote job in new york using python")
        .await;

    let profile = manager.get_profile().await;
    assert!(profile.career_field.is_none());
    assert!(profile.preferred_locations.contains("new york"));
    assert!(profile.skills.contains("python"));
}

#[tokio::test]
async fn similar_returns_limited_descending_results() {
    let (_dir, manager) = semantic_manager();
    let questions = [
        "what do data analysts earn",
        "remote python jobs",
        "how do I learn sql",
        "jobs in seattle",
        "is a product manager role right for me",
    ];
    for question in questions.iter().rev() {
        manager.record_interaction(question, "here is what I found").await;
    }

    let history = manager.get_profile().await.conversation_history;
    assert_eq!(history.len(), 5);
    assert_eq!(history[0].user_message, questions[0]);

    let scored = manager.find_similar_scored("remote python jobs", 2).await;
    assert_eq!(scored.len(), 2);
    assert!(scored[0].score >= scored[1].score);

    let similar = manager.find_similar("remote python jobs", 2).await;
    assert_eq!(similar.len(), 2);
}

#[tokio::test]
async fn history_never_exceeds_cap() {
    let (_dir, manager) = semantic_manager();
    for i in 0..MAX_CONVERSATION_HISTORY + 7 {
        manager
            .record_interaction(&format!("question {}", i), "answer")
            .await;
        assert!(manager.get_profile().await.conversation_history.len() <= MAX_CONVERSATION_HISTORY);
    }
}

#[tokio::test]
async fn clear_then_load_is_empty() {
    let (_dir, manager) = semantic_manager();
    manager.process_turn("data jobs in austin", &EchoResponder).await;
    assert!(!manager.get_profile().await.is_empty());

    manager.clear().await;
    assert!(manager.get_profile().await.is_empty());
}

#[tokio::test]
async fn no_history_returns_current_profile() {
    let (_dir, manager) = semantic_manager();
    manager
        .save_preference(Preference::CareerField("data".into()))
        .await;

    let current = manager.get_profile().await;
    let similar = manager.find_similar("data analysis", 1).await;
    assert_eq!(similar, vec![current]);
}

#[tokio::test]
async fn process_turn_records_everything() {
    let (_dir, manager) = semantic_manager();
    let reply = manager
        .process_turn("Looking for cloud roles in chicago", &EchoResponder)
        .await;
    assert_eq!(reply.content, "Looking for cloud roles in chicago (I know 1 of your skills)");

    let profile = manager.get_profile().await;
    assert_eq!(profile.previous_queries.len(), 1);
    assert!(profile.preferred_locations.contains("chicago"));
    assert!(profile.skills.contains("cloud"));
    assert_eq!(profile.conversation_history[0].assistant_response, reply.content);
    assert_eq!(manager.summary().await.skills, 1);
}

#[tokio::test]
async fn profile_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.redb");
    {
        let store = LocalMemoryStore::open(Some(&path)).unwrap();
        let service = SemanticMemoryService::with_hash_embedder(Arc::new(store));
        service
            .upsert_with_embedding(
                ProfileUpdate {
                    career_field: Some("finance".into()),
                    conversation_history: Some(vec![Interaction::new("hi", "hello")]),
                    ..Default::default()
                },
                "careerField: \"finance\"",
            )
            .await
            .unwrap();
    }

    let config = MemoryConfig {
        backend: BackendKind::Semantic,
        db_path: Some(path),
        ..Default::default()
    };
    let manager = config.build_manager().await.unwrap();
    let profile = manager.get_profile().await;
    assert_eq!(profile.career_field.as_deref(), Some("finance"));
    assert_eq!(profile.conversation_history.len(), 1);
    assert_eq!(profile.embedding.map(|e| e.len()), Some(EMBEDDING_DIM));
    assert_eq!(manager.store().name(), "local");
}
