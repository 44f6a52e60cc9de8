//! Knowledge graph (C6): curated `Concept` storage with the allow-list
//! filter.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Minimum text length to be considered substantive.
pub const MIN_SUBSTANTIVE_LEN: usize = 20;

/// Source/type allow-list beyond tool-success events.
pub const ALLOW_LISTED_SOURCES: &[&str] = &["wiki", "news", "article"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub kind: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub name: String,
    pub domain: String,
    pub definition: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub properties: HashMap<String, String>,
    pub constraints: Vec<String>,
    pub examples: Vec<String>,
    pub relations: Vec<Relation>,
}

/// Candidate event considered for curation.
pub struct CandidateEvent<'a> {
    pub text: &'a str,
    pub source_or_type: &'a str,
    pub is_tool_success: bool,
}

/// Curation filter: persist only when the text is substantive AND either
/// the source/type is allow-listed or the event is a successful tool
/// result.
pub fn should_curate(candidate: &CandidateEvent) -> bool {
    if candidate.text.trim().len() < MIN_SUBSTANTIVE_LEN {
        return false;
    }
    candidate.is_tool_success
        || ALLOW_LISTED_SOURCES.contains(&candidate.source_or_type.to_lowercase().as_str())
}

#[derive(Default)]
pub struct KnowledgeGraph {
    concepts: RwLock<HashMap<String, Concept>>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store as a Concept with a generic domain; raw source identifiers
    /// (e.g. `wiki`, `tool_http_get`) are never used as the semantic
    /// domain.
    pub fn curate(&self, name: &str, definition: &str) -> Option<Concept> {
        let now = Utc::now();
        let concept = Concept {
            name: name.to_string(),
            domain: "general".to_string(),
            definition: definition.to_string(),
            created_at: now,
            updated_at: now,
            properties: HashMap::new(),
            constraints: Vec::new(),
            examples: Vec::new(),
            relations: Vec::new(),
        };
        self.concepts.write().insert(name.to_string(), concept.clone());
        Some(concept)
    }

    pub fn get(&self, name: &str) -> Option<Concept> {
        self.concepts.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.concepts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_never_curated() {
        let candidate = CandidateEvent {
            text: "too short",
            source_or_type: "wiki",
            is_tool_success: true,
        };
        assert!(!should_curate(&candidate));
    }

    #[test]
    fn substantive_allow_listed_source_is_curated() {
        let candidate = CandidateEvent {
            text: "a substantive article body describing something",
            source_or_type: "wiki",
            is_tool_success: false,
        };
        assert!(should_curate(&candidate));
    }

    #[test]
    fn substantive_non_allow_listed_non_success_is_rejected() {
        let candidate = CandidateEvent {
            text: "a substantive chat message that nobody cares about",
            source_or_type: "chat",
            is_tool_success: false,
        };
        assert!(!should_curate(&candidate));
    }

    #[test]
    fn successful_tool_result_bypasses_source_allow_list() {
        let candidate = CandidateEvent {
            text: "tool_http_get completed successfully with payload data",
            source_or_type: "tool_http_get",
            is_tool_success: true,
        };
        assert!(should_curate(&candidate));
    }
}
