//! `AgentInstance`: a configured agent plus its tool adapter bindings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A binding from the *original* tool id an agent was configured with to
/// the resolved skill/tool id used for execution. Preserving the original
/// id lets skill-layer renames happen without breaking agent configs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolAdapter {
    pub original_id: String,
    pub resolved_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub settings: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInstance {
    pub id: String,
    pub config: AgentConfig,
    pub tools: Vec<ToolAdapter>,
}

impl AgentInstance {
    pub fn new(id: impl Into<String>, config: AgentConfig) -> Self {
        Self {
            id: id.into(),
            config,
            tools: Vec::new(),
        }
    }

    pub fn bind_tool(&mut self, original_id: impl Into<String>, resolved_id: impl Into<String>) {
        self.tools.push(ToolAdapter {
            original_id: original_id.into(),
            resolved_id: resolved_id.into(),
        });
    }

    /// Look up a binding by the *original* configured id, never the
    /// resolved one, so agent configs are stable across skill renames.
    pub fn adapter_for(&self, original_id: &str) -> Option<&ToolAdapter> {
        self.tools.iter().find(|a| a.original_id == original_id)
    }
}

/// In-memory registry of configured agent instances.
#[derive(Default)]
pub struct AgentInstanceRegistry {
    agents: parking_lot::RwLock<HashMap<String, AgentInstance>>,
}

impl AgentInstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adding a duplicate agent id is a `Conflict`.
    pub fn add(&self, agent: AgentInstance) -> crate::error::Result<()> {
        let mut agents = self.agents.write();
        if agents.contains_key(&agent.id) {
            return Err(crate::error::Error::Conflict(format!(
                "agent {} already registered",
                agent.id
            )));
        }
        agents.insert(agent.id.clone(), agent);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<AgentInstance> {
        self.agents.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<AgentInstance> {
        self.agents.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_agent_id_is_a_conflict() {
        let registry = AgentInstanceRegistry::new();
        let agent = AgentInstance::new("a1", AgentConfig {
            name: "A".into(),
            description: String::new(),
            settings: HashMap::new(),
        });
        registry.add(agent.clone()).unwrap();
        let err = registry.add(agent).unwrap_err();
        assert!(matches!(err, crate::error::Error::Conflict(_)));
    }

    #[test]
    fn adapter_lookup_uses_original_id() {
        let mut agent = AgentInstance::new("a1", AgentConfig {
            name: "A".into(),
            description: String::new(),
            settings: HashMap::new(),
        });
        agent.bind_tool("search", "mcp_docs_search");
        assert_eq!(agent.adapter_for("search").unwrap().resolved_id, "mcp_docs_search");
        assert!(agent.adapter_for("mcp_docs_search").is_none());
    }
}
