//! MCP tool bridge
//!
//! Wraps tools exposed by configured MCP servers as builtin `Tool`
//! implementations, and backs the raw MCP fallback step of the agent/skill
//! adapter's resolution chain (see `crate::agent::resolver`).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use hdn_mcp::client::{ClientInfo, McpClient};
use hdn_mcp::transport::StdioTransport;
use hdn_mcp::McpTool;

use crate::error::ToolError;
use crate::tools::{Tool, ToolOutput};

/// A single configured MCP server: the spawned stdio client plus its
/// advertised tool list, fetched once at connect time.
struct ConnectedServer {
    client: Mutex<McpClient<StdioTransport>>,
    tools: Vec<McpTool>,
}

/// Manages connections to configured MCP servers and bridges their tools
/// into the builtin tool system.
#[derive(Default)]
pub struct McpBridge {
    servers: HashMap<String, Arc<ConnectedServer>>,
}

impl McpBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `command args...` as an MCP server under `server_name`,
    /// initialize it, and cache its tool list.
    pub async fn connect(
        &mut self,
        server_name: &str,
        command: &str,
        args: &[&str],
    ) -> Result<usize, ToolError> {
        let transport = StdioTransport::spawn(command, args)
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("spawning MCP server: {}", e)))?;

        let mut client = McpClient::new(transport);
        client
            .initialize(ClientInfo {
                name: "hdn-execution-service".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            })
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("initializing MCP server: {}", e)))?;

        let tools = client
            .list_tools()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("listing MCP tools: {}", e)))?;

        let count = tools.len();
        self.servers.insert(
            server_name.to_string(),
            Arc::new(ConnectedServer {
                client: Mutex::new(client),
                tools,
            }),
        );
        Ok(count)
    }

    /// List every discovered (server, tool) pair, as `Arc<dyn Tool>` wrappers
    /// named `mcp_{server}_{tool}` (matching the prefix the agent/skill
    /// adapter's resolution chain expects).
    pub fn wrapped_tools(&self) -> Vec<Arc<dyn Tool>> {
        let mut out = Vec::new();
        for (server_name, server) in &self.servers {
            for tool in &server.tools {
                let prefixed_name = format!(
                    "mcp_{}_{}",
                    server_name.replace('-', "_"),
                    tool.name.replace('-', "_")
                );
                out.push(Arc::new(McpToolWrapper {
                    prefixed_name,
                    tool_name: tool.name.clone(),
                    description: tool.description.clone(),
                    input_schema: tool.input_schema.clone(),
                    server: server.clone(),
                }) as Arc<dyn Tool>);
            }
        }
        out
    }

    /// Raw fallback call used when no registered tool matched: invoke
    /// `tool_name` on `server_name` directly without going through a
    /// wrapper's static schema.
    pub async fn call_raw(
        &self,
        server_name: &str,
        tool_name: &str,
        arguments: Value,
    ) -> Result<ToolOutput, ToolError> {
        let server = self.servers.get(server_name).ok_or_else(|| {
            ToolError::NotFound(format!("MCP server '{}' not connected", server_name))
        })?;
        call_tool(server, tool_name, arguments).await
    }

    pub fn server_names(&self) -> Vec<String> {
        self.servers.keys().cloned().collect()
    }
}

async fn call_tool(
    server: &ConnectedServer,
    tool_name: &str,
    arguments: Value,
) -> Result<ToolOutput, ToolError> {
    let client = server.client.lock().await;
    let result = client
        .call_tool(tool_name, arguments)
        .await
        .map_err(|e| ToolError::ExecutionFailed(format!("MCP tool '{}' failed: {}", tool_name, e)))?;

    let texts: Vec<String> = result
        .content
        .iter()
        .filter_map(|item| item.text.clone())
        .collect();

    if result.is_error {
        return Ok(ToolOutput::error(if texts.is_empty() {
            "MCP tool execution failed".to_string()
        } else {
            texts.join("\n")
        }));
    }

    let content = if texts.is_empty() {
        Value::Null
    } else {
        Value::String(texts.join("\n"))
    };

    Ok(ToolOutput::success(content)
        .with_metadata("mcp_tool", Value::String(tool_name.to_string())))
}

/// Exposes a single MCP server tool as a builtin `Tool`.
struct McpToolWrapper {
    prefixed_name: String,
    tool_name: String,
    description: String,
    input_schema: Value,
    server: Arc<ConnectedServer>,
}

#[async_trait]
impl Tool for McpToolWrapper {
    fn name(&self) -> &str {
        &self.prefixed_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.input_schema.clone()
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        call_tool(&self.server, &self.tool_name, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_starts_empty() {
        let bridge = McpBridge::new();
        assert!(bridge.server_names().is_empty());
        assert!(bridge.wrapped_tools().is_empty());
    }
}
