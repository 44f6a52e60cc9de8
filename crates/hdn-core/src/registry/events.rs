//! Registry events emitted on `register`, consumed by the memory fan-out
//! (C6) and any other interested subscriber.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryEventKind {
    ToolDiscovered,
    ToolCreated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEvent {
    pub kind: RegistryEventKind,
    pub tool_id: String,
    pub at: DateTime<Utc>,
}

impl RegistryEvent {
    pub fn discovered(tool_id: impl Into<String>) -> Self {
        Self {
            kind: RegistryEventKind::ToolDiscovered,
            tool_id: tool_id.into(),
            at: Utc::now(),
        }
    }

    pub fn created(tool_id: impl Into<String>) -> Self {
        Self {
            kind: RegistryEventKind::ToolCreated,
            tool_id: tool_id.into(),
            at: Utc::now(),
        }
    }

    /// Text view used by the memory fan-out's episodic indexing step.
    pub fn as_text(&self) -> String {
        match self.kind {
            RegistryEventKind::ToolDiscovered => format!("tool discovered: {}", self.tool_id),
            RegistryEventKind::ToolCreated => format!("tool created: {}", self.tool_id),
        }
    }
}
