//! ============================================================================
//! Memory Types - Profile, interactions and partial updates
//! ============================================================================
//! The persisted profile record, the interactions it logs, and the partial
//! profile shape used for field-level merges.
//! ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::embeddings::Embedding;
use crate::types::{MemoryError, MemoryResult};

/// Maximum number of previous queries kept on a profile
pub const MAX_PREVIOUS_QUERIES: usize = 10;

/// Maximum number of interactions kept in the conversation history
pub const MAX_CONVERSATION_HISTORY: usize = 20;

/// The persisted per-user memory record.
///
/// Serialized as a single JSON object with camelCase keys. Empty collections
/// and unset optionals are omitted, so a cleared profile round-trips as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub career_field: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub preferred_locations: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub skills: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub job_preferences: BTreeMap<String, bool>,
    /// Newest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_queries: Vec<String>,
    /// Newest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversation_history: Vec<Interaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_interaction_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Embedding>,
}

impl Profile {
    /// True when no field carries any data
    pub fn is_empty(&self) -> bool {
        *self == Profile::default()
    }

    /// Shallow field-level merge: every field present in `update` replaces
    /// the stored field wholesale. No union, no deep merge.
    pub fn apply(&mut self, update: ProfileUpdate) {
        let ProfileUpdate {
            career_field,
            preferred_locations,
            skills,
            job_preferences,
            previous_queries,
            conversation_history,
            last_interaction_date,
            embedding,
        } = update;

        if let Some(v) = career_field {
            self.career_field = Some(v);
        }
        if let Some(v) = preferred_locations {
            self.preferred_locations = v;
        }
        if let Some(v) = skills {
            self.skills = v;
        }
        if let Some(v) = job_preferences {
            self.job_preferences = v;
        }
        if let Some(v) = previous_queries {
            self.previous_queries = v;
        }
        if let Some(v) = conversation_history {
            self.conversation_history = v;
        }
        if let Some(v) = last_interaction_date {
            self.last_interaction_date = Some(v);
        }
        if let Some(v) = embedding {
            self.embedding = Some(v);
        }

        self.enforce_bounds();
    }

    /// Truncate the bounded lists to their caps, evicting the oldest entries
    /// (which sit at the tail since storage order is newest first).
    pub fn enforce_bounds(&mut self) {
        self.previous_queries.truncate(MAX_PREVIOUS_QUERIES);
        self.conversation_history.truncate(MAX_CONVERSATION_HISTORY);
    }

    /// Status projection for a UI indicator
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            career_field: self.career_field.clone(),
            skills: self.skills.len(),
            preferred_locations: self.preferred_locations.len(),
        }
    }
}

/// One recorded user-message/assistant-response pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub timestamp: DateTime<Utc>,
    pub user_message: String,
    pub assistant_response: String,
}

impl Interaction {
    /// Create an interaction stamped with the current time
    pub fn new(user_message: impl Into<String>, assistant_response: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            user_message: user_message.into(),
            assistant_response: assistant_response.into(),
        }
    }

    /// Text used when embedding this interaction for recall
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.user_message, self.assistant_response)
    }
}

/// A partial profile. `Some` fields overwrite, `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub career_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_locations: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_preferences: Option<BTreeMap<String, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_queries: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_history: Option<Vec<Interaction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_interaction_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Embedding>,
}

impl ProfileUpdate {
    /// True when the update touches no field
    pub fn is_empty(&self) -> bool {
        *self == ProfileUpdate::default()
    }
}

impl From<Profile> for ProfileUpdate {
    /// Every field of the profile, as a full overwrite
    fn from(profile: Profile) -> Self {
        Self {
            career_field: profile.career_field,
            preferred_locations: Some(profile.preferred_locations),
            skills: Some(profile.skills),
            job_preferences: Some(profile.job_preferences),
            previous_queries: Some(profile.previous_queries),
            conversation_history: Some(profile.conversation_history),
            last_interaction_date: profile.last_interaction_date,
            embedding: profile.embedding,
        }
    }
}

/// A single typed profile field and its new value
#[derive(Debug, Clone, PartialEq)]
pub enum Preference {
    CareerField(String),
    PreferredLocations(BTreeSet<String>),
    Skills(BTreeSet<String>),
    JobPreferences(BTreeMap<String, bool>),
    PreviousQueries(Vec<String>),
    ConversationHistory(Vec<Interaction>),
}

impl Preference {
    /// Persisted field name
    pub fn key(&self) -> &'static str {
        match self {
            Preference::CareerField(_) => "careerField",
            Preference::PreferredLocations(_) => "preferredLocations",
            Preference::Skills(_) => "skills",
            Preference::JobPreferences(_) => "jobPreferences",
            Preference::PreviousQueries(_) => "previousQueries",
            Preference::ConversationHistory(_) => "conversationHistory",
        }
    }

    /// JSON rendering of the value
    pub fn value_json(&self) -> serde_json::Value {
        let value = match self {
            Preference::CareerField(v) => serde_json::to_value(v),
            Preference::PreferredLocations(v) => serde_json::to_value(v),
            Preference::Skills(v) => serde_json::to_value(v),
            Preference::JobPreferences(v) => serde_json::to_value(v),
            Preference::PreviousQueries(v) => serde_json::to_value(v),
            Preference::ConversationHistory(v) => serde_json::to_value(v),
        };
        value.unwrap_or(serde_json::Value::Null)
    }

    /// `"<key>: <value>"`, the text embedded when this preference is saved
    pub fn describe(&self) -> String {
        format!("{}: {}", self.key(), self.value_json())
    }

    /// Parse a field name and JSON value into a typed preference
    pub fn from_json(key: &str, value: serde_json::Value) -> MemoryResult<Self> {
        let parsed = match key {
            "careerField" | "career_field" => serde_json::from_value(value).map(Preference::CareerField),
            "preferredLocations" | "preferred_locations" => {
                serde_json::from_value(value).map(Preference::PreferredLocations)
            }
            "skills" => serde_json::from_value(value).map(Preference::Skills),
            "jobPreferences" | "job_preferences" => {
                serde_json::from_value(value).map(Preference::JobPreferences)
            }
            "previousQueries" | "previous_queries" => {
                serde_json::from_value(value).map(Preference::PreviousQueries)
            }
            "conversationHistory" | "conversation_history" => {
                serde_json::from_value(value).map(Preference::ConversationHistory)
            }
            _ => {
                return Err(MemoryError::Config(format!(
                    "Unknown preference key: {}",
                    key
                )))
            }
        };
        parsed.map_err(|e| MemoryError::Config(format!("Invalid value for {}: {}", key, e)))
    }

    /// Write this value into the profile's field
    pub fn apply_to(self, profile: &mut Profile) {
        match self {
            Preference::CareerField(v) => profile.career_field = Some(v),
            Preference::PreferredLocations(v) => profile.preferred_locations = v,
            Preference::Skills(v) => profile.skills = v,
            Preference::JobPreferences(v) => profile.job_preferences = v,
            Preference::PreviousQueries(v) => profile.previous_queries = v,
            Preference::ConversationHistory(v) => profile.conversation_history = v,
        }
    }
}

/// A retrieval candidate and its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredProfile {
    pub profile: Profile,
    pub score: f32,
}

/// Read-only projection used by status indicators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub career_field: Option<String>,
    pub skills: usize,
    pub preferred_locations: usize,
}
