//! ============================================================================
//! Fact Extraction - Keyword matching over configurable vocabularies
//! ============================================================================
//! Plain lower-cased substring matching, not NLP. The first career field in
//! vocabulary order wins; every matching location and skill is kept. There is
//! no negation handling: "not interested in remote" still matches "remote".
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

use crate::types::{MemoryError, MemoryResult};

/// Trigger strings per fact category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactVocabulary {
    #[serde(default)]
    pub career_fields: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl Default for FactVocabulary {
    fn default() -> Self {
        fn owned(terms: &[&str]) -> Vec<String> {
            terms.iter().map(|t| t.to_string()).collect()
        }

        Self {
            career_fields: owned(&[
                "software",
                "development",
                "engineering",
                "data",
                "science",
                "marketing",
                "design",
                "product",
                "management",
                "finance",
                "healthcare",
                "education",
            ]),
            locations: owned(&[
                "remote",
                "new york",
                "san francisco",
                "seattle",
                "austin",
                "chicago",
                "boston",
                "los angeles",
                "london",
                "berlin",
            ]),
            skills: owned(&[
                "javascript",
                "python",
                "react",
                "node",
                "sql",
                "aws",
                "azure",
                "machine learning",
                "ai",
                "blockchain",
                "cloud",
            ]),
        }
    }
}

impl FactVocabulary {
    /// Load vocabularies from a JSON file. Missing categories are empty.
    pub fn from_file(path: &Path) -> MemoryResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MemoryError::Config(format!("Failed to read vocabulary {}: {}", path.display(), e))
        })?;
        let vocabulary: FactVocabulary = serde_json::from_str(&raw)?;
        debug!(
            "Loaded vocabulary from {} ({} fields, {} locations, {} skills)",
            path.display(),
            vocabulary.career_fields.len(),
            vocabulary.locations.len(),
            vocabulary.skills.len()
        );
        Ok(vocabulary)
    }
}

/// Facts found in one message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFacts {
    pub career_field: Option<String>,
    pub locations: BTreeSet<String>,
    pub skills: BTreeSet<String>,
}

impl ExtractedFacts {
    pub fn is_empty(&self) -> bool {
        self.career_field.is_none() && self.locations.is_empty() && self.skills.is_empty()
    }
}

/// Matches messages against a [`FactVocabulary`]
#[derive(Debug, Clone, Default)]
pub struct FactExtractor {
    vocabulary: FactVocabulary,
}

impl FactExtractor {
    pub fn new(vocabulary: FactVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &FactVocabulary {
        &self.vocabulary
    }

    /// Scan a message for known career fields, locations and skills
    pub fn extract(&self, message: &str) -> ExtractedFacts {
        let lower = message.to_lowercase();

        let career_field = matches(&lower, &self.vocabulary.career_fields).next();
        let locations = matches(&lower, &self.vocabulary.locations).collect();
        let skills = matches(&lower, &self.vocabulary.skills).collect();

        ExtractedFacts {
            career_field,
            locations,
            skills,
        }
    }
}

/// Terms contained in `haystack`, in vocabulary order. Blank terms never match.
fn matches<'a>(haystack: &'a str, terms: &'a [String]) -> impl Iterator<Item = String> + 'a {
    terms
        .iter()
        .filter(|term| !term.trim().is_empty())
        .filter(move |term| haystack.contains(term.to_lowercase().as_str()))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_remote_new_york_python() {
        let facts = FactExtractor::default().extract("I want a remote job in new york using python");

        assert_eq!(facts.career_field, None);
        assert!(facts.locations.contains("new york"));
        assert!(facts.locations.contains("remote"));
        assert_eq!(facts.skills, set(&["python"]));
    }

    #[test]
    fn test_first_career_field_wins() {
        // "data" comes before "science" and "management" in the vocabulary
        let facts = FactExtractor::default().extract("Management or Data Science?");
        assert_eq!(facts.career_field.as_deref(), Some("data"));
    }

    #[test]
    fn test_case_insensitive_message() {
        let facts = FactExtractor::default().extract("Looking at SQL and AWS roles in LONDON");
        assert_eq!(facts.skills, set(&["sql", "aws"]));
        assert_eq!(facts.locations, set(&["london"]));
    }

    #[test]
    fn test_no_negation_handling() {
        let facts = FactExtractor::default().extract("I am NOT interested in remote work");
        assert!(facts.locations.contains("remote"));
    }

    #[test]
    fn test_nothing_found() {
        let facts = FactExtractor::default().extract("hello there");
        assert!(facts.is_empty());
    }

    #[test]
    fn test_custom_vocabulary_and_blank_terms() {
        let extractor = FactExtractor::new(FactVocabulary {
            career_fields: vec!["".to_string(), "Robotics".to_string()],
            locations: vec!["  ".to_string()],
            skills: vec!["rust".to_string()],
        });

        let facts = extractor.extract("robotics with rust");
        assert_eq!(facts.career_field.as_deref(), Some("Robotics"));
        assert!(facts.locations.is_empty());
        assert_eq!(facts.skills, set(&["rust"]));
    }

    #[test]
    fn test_vocabulary_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.json");
        std::fs::write(&path, r#"{"skills": ["go", "kotlin"]}"#).unwrap();

        let vocabulary = FactVocabulary::from_file(&path).unwrap();
        assert!(vocabulary.career_fields.is_empty());
        assert_eq!(vocabulary.skills, vec!["go".to_string(), "kotlin".to_string()]);

        assert!(FactVocabulary::from_file(&dir.path().join("missing.json")).is_err());
    }
}
