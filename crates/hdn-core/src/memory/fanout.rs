//! Memory Fan-out (C6): write-side routing of events into working memory,
//! the episodic store, and the knowledge graph. All three writes are
//! best-effort; failures are logged, never propagated.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::memory::episodic::{EpisodicRecord, EpisodicStore, Outcome};
use crate::memory::knowledge::{CandidateEvent, KnowledgeGraph};
use crate::memory::working::WorkingMemoryStore;

/// A fan-out-eligible event: a text view plus routing metadata.
pub struct MemoryEvent {
    pub session_id: Option<String>,
    pub source_or_type: String,
    pub text: String,
    pub outcome: Outcome,
    pub is_tool_success: bool,
    pub payload: Value,
}

pub struct MemoryFanout {
    working: Arc<WorkingMemoryStore>,
    episodic: Arc<EpisodicStore>,
    knowledge: Arc<KnowledgeGraph>,
}

impl MemoryFanout {
    pub fn new(
        working: Arc<WorkingMemoryStore>,
        episodic: Arc<EpisodicStore>,
        knowledge: Arc<KnowledgeGraph>,
    ) -> Self {
        Self {
            working,
            episodic,
            knowledge,
        }
    }

    /// Direct handle to the working-memory store, for callers (the REST
    /// surface) that need to read or write a session's ring/locals/plan
    /// without going through `route`.
    pub fn working(&self) -> &Arc<WorkingMemoryStore> {
        &self.working
    }

    /// Fan an event out to all three stores. Never returns an error: each
    /// sub-write is wrapped so a single failing store cannot fail the
    /// others or the caller.
    pub fn route(&self, event: MemoryEvent) {
        if let Some(session_id) = &event.session_id {
            self.working.append_event(session_id, event.payload.clone());
        }

        self.episodic.index(EpisodicRecord {
            session_id: event.session_id.clone(),
            plan_id: None,
            timestamp: Utc::now(),
            outcome: event.outcome,
            reward: 0.0,
            tags: vec![event.source_or_type.clone()],
            step_index: None,
            text: event.text.clone(),
            metadata: Default::default(),
        });

        let candidate = CandidateEvent {
            text: &event.text,
            source_or_type: &event.source_or_type,
            is_tool_success: event.is_tool_success,
        };
        if crate::memory::knowledge::should_curate(&candidate) {
            self.knowledge.curate(&event.text[..event.text.len().min(64)], &event.text);
        } else {
            tracing::debug!(source = %event.source_or_type, "event did not pass knowledge curation filter");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substantive_success_event_reaches_all_three_stores() {
        let working = Arc::new(WorkingMemoryStore::default());
        let episodic = Arc::new(EpisodicStore::new());
        let knowledge = Arc::new(KnowledgeGraph::new());
        let fanout = MemoryFanout::new(working.clone(), episodic.clone(), knowledge.clone());

        fanout.route(MemoryEvent {
            session_id: Some("s1".into()),
            source_or_type: "tool_http_get".into(),
            text: "tool_http_get completed successfully with a useful payload".into(),
            outcome: Outcome::Success,
            is_tool_success: true,
            payload: Value::from("ok"),
        });

        assert_eq!(working.events("s1").len(), 1);
        assert_eq!(episodic.len(), 1);
        assert_eq!(knowledge.len(), 1);
    }

    #[test]
    fn non_curated_event_still_reaches_working_and_episodic() {
        let working = Arc::new(WorkingMemoryStore::default());
        let episodic = Arc::new(EpisodicStore::new());
        let knowledge = Arc::new(KnowledgeGraph::new());
        let fanout = MemoryFanout::new(working.clone(), episodic.clone(), knowledge.clone());

        fanout.route(MemoryEvent {
            session_id: Some("s1".into()),
            source_or_type: "chat".into(),
            text: "a substantive chat message that nobody cares about".into(),
            outcome: Outcome::Event,
            is_tool_success: false,
            payload: Value::from("chat"),
        });

        assert_eq!(working.events("s1").len(), 1);
        assert_eq!(episodic.len(), 1);
        assert_eq!(knowledge.len(), 0);
    }
}
