//! Working memory (C6): a bounded ring of recent event payloads per
//! session, a local-variable map, and the latest plan snapshot. TTL bounded
//! (default 6h).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde_json::Value;

pub const DEFAULT_RING_CAPACITY: usize = 100;
pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

struct SessionMemory {
    events: VecDeque<Value>,
    locals: HashMap<String, String>,
    plan: Option<Value>,
    last_touched: Instant,
}

impl SessionMemory {
    fn new() -> Self {
        Self {
            events: VecDeque::new(),
            locals: HashMap::new(),
            plan: None,
            last_touched: Instant::now(),
        }
    }
}

#[derive(Clone)]
pub struct WorkingMemoryStore {
    sessions: Arc<RwLock<HashMap<String, SessionMemory>>>,
    capacity: usize,
    ttl: Duration,
}

impl Default for WorkingMemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CAPACITY, DEFAULT_TTL)
    }
}

impl WorkingMemoryStore {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            capacity,
            ttl,
        }
    }

    /// Append an event, refreshing the session's TTL, bounded to `capacity`.
    pub fn append_event(&self, session_id: &str, event: Value) {
        let mut sessions = self.sessions.write();
        self.expire_locked(&mut sessions);
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionMemory::new);
        if session.events.len() >= self.capacity {
            session.events.pop_front();
        }
        session.events.push_back(event);
        session.last_touched = Instant::now();
    }

    pub fn set_local(&self, session_id: &str, key: &str, value: String) {
        let mut sessions = self.sessions.write();
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionMemory::new);
        session.locals.insert(key.to_string(), value);
        session.last_touched = Instant::now();
    }

    pub fn set_plan(&self, session_id: &str, plan: Value) {
        let mut sessions = self.sessions.write();
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionMemory::new);
        session.plan = Some(plan);
        session.last_touched = Instant::now();
    }

    pub fn events(&self, session_id: &str) -> Vec<Value> {
        self.sessions
            .read()
            .get(session_id)
            .map(|s| s.events.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn locals(&self, session_id: &str) -> HashMap<String, String> {
        self.sessions
            .read()
            .get(session_id)
            .map(|s| s.locals.clone())
            .unwrap_or_default()
    }

    pub fn plan(&self, session_id: &str) -> Option<Value> {
        self.sessions.read().get(session_id).and_then(|s| s.plan.clone())
    }

    fn expire_locked(&self, sessions: &mut HashMap<String, SessionMemory>) {
        let ttl = self.ttl;
        sessions.retain(|_, session| session.last_touched.elapsed() < ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_is_bounded_to_capacity() {
        let store = WorkingMemoryStore::new(2, DEFAULT_TTL);
        store.append_event("s1", Value::from(1));
        store.append_event("s1", Value::from(2));
        store.append_event("s1", Value::from(3));
        assert_eq!(store.events("s1"), vec![Value::from(2), Value::from(3)]);
    }

    #[test]
    fn sessions_are_independent() {
        let store = WorkingMemoryStore::default();
        store.set_local("s1", "x", "1".to_string());
        store.set_local("s2", "x", "2".to_string());
        assert_eq!(store.locals("s1").get("x"), Some(&"1".to_string()));
        assert_eq!(store.locals("s2").get("x"), Some(&"2".to_string()));
    }
}
