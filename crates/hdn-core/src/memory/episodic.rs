//! Episodic memory (C6): semantic vector store of events and outcomes.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::memory::embedding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
    Event,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodicRecord {
    pub session_id: Option<String>,
    pub plan_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub outcome: Outcome,
    pub reward: f32,
    pub tags: Vec<String>,
    pub step_index: Option<u32>,
    pub text: String,
    pub metadata: HashMap<String, Value>,
}

/// A small metadata mapping alongside the deterministic embedding, indexed
/// by a generated id.
#[derive(Default)]
pub struct EpisodicStore {
    records: RwLock<Vec<(String, Vec<f32>, EpisodicRecord)>>,
}

impl EpisodicStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a text view of the record with its deterministic embedding.
    pub fn index(&self, record: EpisodicRecord) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let vector = embedding::embed(&record.text, embedding::DEFAULT_DIM);
        self.records.write().push((id.clone(), vector, record));
        id
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nearest records by Hamming-style distance over the toy embedding,
    /// for basic retrieval/testing; a real implementation swaps this for a
    /// vector-store query.
    pub fn nearest(&self, text: &str, k: usize) -> Vec<EpisodicRecord> {
        let query = embedding::embed(text, embedding::DEFAULT_DIM);
        let records = self.records.read();
        let mut scored: Vec<(f32, EpisodicRecord)> = records
            .iter()
            .map(|(_, v, r)| {
                let dist: f32 = v.iter().zip(&query).map(|(a, b)| (a - b).abs()).sum();
                (dist, r.clone())
            })
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        scored.into_iter().take(k).map(|(_, r)| r).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_retrievable_by_nearest() {
        let store = EpisodicStore::new();
        store.index(EpisodicRecord {
            session_id: Some("s1".into()),
            plan_id: None,
            timestamp: Utc::now(),
            outcome: Outcome::Success,
            reward: 1.0,
            tags: vec![],
            step_index: None,
            text: "build succeeded".into(),
            metadata: HashMap::new(),
        });
        assert_eq!(store.len(), 1);
        let nearest = store.nearest("build succeeded", 1);
        assert_eq!(nearest.len(), 1);
    }
}
