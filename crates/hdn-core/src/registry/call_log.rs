//! `ToolCallLog`: one record per invocation, created at dispatch and
//! finalized in a guaranteed post-dispatch step (see
//! [`crate::invocation::InvocationEngine`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::SafetyLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Pending,
    Success,
    Failure,
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallLog {
    pub id: String,
    pub tool_id: String,
    pub tool_name: String,
    pub params: Value,
    pub agent_id: Option<String>,
    pub project_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: Option<u64>,
    pub status: CallStatus,
    pub error: Option<String>,
    pub response: Option<Value>,
    pub permissions: Vec<String>,
    pub safety_level: SafetyLevel,
}

impl ToolCallLog {
    pub fn pending(
        tool_id: impl Into<String>,
        tool_name: impl Into<String>,
        params: Value,
        agent_id: Option<String>,
        project_id: Option<String>,
        permissions: Vec<String>,
        safety_level: SafetyLevel,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tool_id: tool_id.into(),
            tool_name: tool_name.into(),
            params,
            agent_id,
            project_id,
            started_at: Utc::now(),
            duration_ms: None,
            status: CallStatus::Pending,
            error: None,
            response: None,
            permissions,
            safety_level,
        }
    }

    /// Finalize the log with a non-pending status and the elapsed duration.
    /// Called exactly once per invocation, regardless of outcome.
    pub fn finalize(&mut self, status: CallStatus, response: Option<Value>, error: Option<String>) {
        debug_assert_ne!(status, CallStatus::Pending, "finalize requires a terminal status");
        self.status = status;
        self.response = response;
        self.error = error;
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        self.duration_ms = Some(elapsed.num_milliseconds().max(0) as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_sets_non_negative_duration() {
        let mut log = ToolCallLog::pending(
            "tool_test",
            "Test",
            Value::Null,
            None,
            None,
            vec![],
            SafetyLevel::Low,
        );
        log.finalize(CallStatus::Success, Some(Value::Null), None);
        assert_eq!(log.status, CallStatus::Success);
        assert!(log.duration_ms.is_some());
    }
}
