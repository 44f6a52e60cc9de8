//! Tool Registry (C1): persist tool metadata, list/register/delete, and seed
//! built-in tools via `discover`.
//!
//! This is distinct from [`crate::tools::ToolRegistry`], which only wires a
//! name to an executable `Tool` impl for in-process dispatch. This registry
//! is the persisted catalogue the Invocation Engine (C2) consults, and the
//! one the REST surface's `/api/v1/tools*` routes operate on.

pub mod call_log;
pub mod events;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::store::Store;

pub use call_log::{CallStatus, ToolCallLog};
pub use events::RegistryEvent;

/// Safety level of a tool's execution spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Low,
    Medium,
    High,
}

impl Default for SafetyLevel {
    fn default() -> Self {
        SafetyLevel::Low
    }
}

/// Who created a tool. Only `Agent`-created tools may be deleted through the
/// public delete operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreatedBy {
    System,
    Agent,
    User,
}

impl CreatedBy {
    fn parse_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "system" => Some(CreatedBy::System),
            "agent" => Some(CreatedBy::Agent),
            "user" => Some(CreatedBy::User),
            _ => None,
        }
    }
}

/// Tagged execution backend for a tool, matching the wire shape
/// `{"type": "cmd"|"image"|"code", ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExecutionSpec {
    Cmd {
        path: String,
        #[serde(default)]
        args: Vec<String>,
    },
    Image {
        image: String,
    },
    Code {
        language: String,
        source: String,
    },
}

/// A registered capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_schema")]
    pub input_schema: Value,
    #[serde(default = "default_schema")]
    pub output_schema: Value,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub safety_level: SafetyLevel,
    pub created_by: CreatedBy,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub exec: Option<ExecutionSpec>,
}

fn default_schema() -> Value {
    Value::Object(Default::default())
}

/// Request payload for `register`, mirroring the REST body shape; `id` is
/// required, everything else defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_schema: Option<Value>,
    #[serde(default)]
    pub output_schema: Option<Value>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub safety_level: Option<SafetyLevel>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub exec: Option<ExecutionSpec>,
}

const REGISTRY_SET_KEY: &str = "tools:registry";

fn tool_key(id: &str) -> String {
    format!("tool:{id}")
}

/// The persisted Tool Registry (C1).
pub struct ToolRegistry {
    store: Arc<dyn Store>,
}

impl ToolRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// `register(tool)`: upserts by id, emits `tool.discovered` (system
    /// provenance) or `tool.created` (agent/user provenance).
    pub async fn register(&self, req: RegisterRequest) -> Result<(Tool, RegistryEvent)> {
        if req.id.trim().is_empty() {
            return Err(Error::InvalidArgument("tool id must not be blank".into()));
        }
        let created_by = match req.created_by.as_deref() {
            None => CreatedBy::User,
            Some(s) => CreatedBy::parse_loose(s)
                .ok_or_else(|| Error::InvalidArgument(format!("unknown created_by: {s}")))?,
        };
        let tool = Tool {
            id: req.id.clone(),
            name: req.name.unwrap_or_else(|| req.id.clone()),
            description: req.description,
            input_schema: req.input_schema.unwrap_or_else(default_schema),
            output_schema: req.output_schema.unwrap_or_else(default_schema),
            permissions: req.permissions,
            safety_level: req.safety_level.unwrap_or_default(),
            created_by,
            created_at: Utc::now(),
            exec: req.exec,
        };

        self.store
            .set(&tool_key(&tool.id), serde_json::to_value(&tool)?)
            .await;
        self.store.set_add(REGISTRY_SET_KEY, &tool.id).await;

        let event = match created_by {
            CreatedBy::System => RegistryEvent::discovered(&tool.id),
            _ => RegistryEvent::created(&tool.id),
        };
        tracing::debug!(tool_id = %tool.id, ?created_by, "tool registered");
        Ok((tool, event))
    }

    /// `delete(id)`: only permitted when `created_by == agent`.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let tool = self
            .get(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("tool {id} not found")))?;
        if tool.created_by != CreatedBy::Agent {
            return Err(Error::PermissionDenied(format!(
                "tool {id} was not created by an agent and cannot be deleted"
            )));
        }
        self.store.delete(&tool_key(id)).await;
        self.store.set_remove(REGISTRY_SET_KEY, id).await;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<Tool> {
        let v = self.store.get(&tool_key(id)).await?;
        serde_json::from_value(v).ok()
    }

    /// `list()`: persisted tools only. Synthesized `mcp_*` tools are layered
    /// on top by the caller (see [`crate::tools::mcp::McpBridge`]).
    pub async fn list(&self) -> Vec<Tool> {
        let mut out = Vec::new();
        for id in self.store.set_members(REGISTRY_SET_KEY).await {
            if let Some(tool) = self.get(&id).await {
                out.push(tool);
            }
        }
        out
    }

    /// `discover()`: seed built-in tools. We always seed the two baseline
    /// tools exercised by the end-to-end scenario (`tool_http_get`,
    /// `tool_wiki_bootstrapper`). Container/SSH executors are added
    /// conditionally: the container-exec tool when a local container
    /// runtime is available, and the SSH executor when the host is ARM64
    /// or `EXECUTION_METHOD` requests it.
    pub async fn discover(&self) -> Result<Vec<Tool>> {
        let mut seeded = Vec::new();

        for (id, name, description) in [
            (
                "tool_http_get",
                "HTTP GET",
                "Performs an HTTP GET request and returns the response body.",
            ),
            (
                "tool_wiki_bootstrapper",
                "Wiki Bootstrapper",
                "Seeds episodic/knowledge memory from a wiki-style article.",
            ),
        ] {
            let (tool, _event) = self
                .register(RegisterRequest {
                    id: id.to_string(),
                    name: Some(name.to_string()),
                    description: description.to_string(),
                    input_schema: None,
                    output_schema: None,
                    permissions: vec!["net:read".to_string()],
                    safety_level: Some(SafetyLevel::Low),
                    created_by: Some("system".to_string()),
                    exec: None,
                })
                .await?;
            seeded.push(tool);
        }

        if container_runtime_available() {
            let (tool, _event) = self
                .register(RegisterRequest {
                    id: "tool_container_exec".to_string(),
                    name: Some("Container Executor".to_string()),
                    description: "Runs code inside a local container runtime.".to_string(),
                    input_schema: None,
                    output_schema: None,
                    permissions: vec!["proc:exec".to_string()],
                    safety_level: Some(SafetyLevel::High),
                    created_by: Some("system".to_string()),
                    exec: None,
                })
                .await?;
            seeded.push(tool);
        }

        let wants_ssh = std::env::var("ENABLE_ARM64_TOOLS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false)
            || matches!(
                std::env::var("EXECUTION_METHOD").as_deref(),
                Ok("ssh") | Ok("drone")
            );
        let is_arm64 = cfg!(target_arch = "aarch64");
        let forced_container = std::env::var("EXECUTION_METHOD").as_deref() == Ok("docker");

        if (wants_ssh || is_arm64) && !(is_arm64 && forced_container) {
            let (tool, _event) = self
                .register(RegisterRequest {
                    id: "tool_ssh_exec".to_string(),
                    name: Some("SSH Executor".to_string()),
                    description: "Runs code on a remote host over SSH.".to_string(),
                    input_schema: None,
                    output_schema: None,
                    permissions: vec!["net:read".to_string(), "proc:exec".to_string()],
                    safety_level: Some(SafetyLevel::High),
                    created_by: Some("system".to_string()),
                    exec: None,
                })
                .await?;
            seeded.push(tool);
        }

        Ok(seeded)
    }
}

/// Whether a local container runtime (docker/podman) looks usable: forced on
/// by `EXECUTION_METHOD=docker`, forced off by `DISABLE_CONTAINER_TOOLS`,
/// otherwise detected by a PATH scan for either binary.
fn container_runtime_available() -> bool {
    if std::env::var("EXECUTION_METHOD").as_deref() == Ok("docker") {
        return true;
    }
    if std::env::var("DISABLE_CONTAINER_TOOLS")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false)
    {
        return false;
    }
    ["docker", "podman"].iter().any(|bin| binary_on_path(bin))
}

fn binary_on_path(bin: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(bin).is_file()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn registry() -> ToolRegistry {
        ToolRegistry::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn register_list_delete_echo_tool() {
        let registry = registry();
        let (tool, _) = registry
            .register(RegisterRequest {
                id: "tool_test_echo".to_string(),
                name: Some("Echo".to_string()),
                description: String::new(),
                input_schema: None,
                output_schema: None,
                permissions: vec![],
                safety_level: None,
                created_by: Some("agent".to_string()),
                exec: None,
            })
            .await
            .unwrap();
        assert_eq!(tool.id, "tool_test_echo");

        let listed = registry.list().await;
        assert!(listed.iter().any(|t| t.id == "tool_test_echo"));

        registry.delete("tool_test_echo").await.unwrap();
        assert!(registry.get("tool_test_echo").await.is_none());
    }

    #[tokio::test]
    async fn non_agent_tool_cannot_be_deleted() {
        let registry = registry();
        registry
            .register(RegisterRequest {
                id: "tool_system".to_string(),
                name: None,
                description: String::new(),
                input_schema: None,
                output_schema: None,
                permissions: vec![],
                safety_level: None,
                created_by: Some("system".to_string()),
                exec: None,
            })
            .await
            .unwrap();

        let err = registry.delete("tool_system").await.unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn blank_id_is_rejected() {
        let registry = registry();
        let err = registry
            .register(RegisterRequest {
                id: "   ".to_string(),
                name: None,
                description: String::new(),
                input_schema: None,
                output_schema: None,
                permissions: vec![],
                safety_level: None,
                created_by: None,
                exec: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn discover_seeds_baseline_tools() {
        let registry = registry();
        registry.discover().await.unwrap();
        let listed = registry.list().await;
        assert!(listed.iter().any(|t| t.id == "tool_http_get"));
        assert!(listed.iter().any(|t| t.id == "tool_wiki_bootstrapper"));
    }
}
