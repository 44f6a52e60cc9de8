//! HDN Core - Hierarchical Task Network execution service
//!
//! This crate implements the core subsystems of the execution service:
//! - C1 Tool Registry ([`registry`])
//! - C2 Invocation Engine ([`invocation`])
//! - C3 Remote Execution + Sanitizer (`hdn-sandbox`, re-exported behind the
//!   `sandbox` feature)
//! - C4 Admission Controller ([`admission`])
//! - C5 Workflow Orchestrator ([`workflow`])
//! - C6 Memory Fan-out ([`memory`])
//! - C7 Agent/Skill Adapter ([`agent`])
//!
//! Builtin tool implementations backing the invocation engine live in
//! [`tools`]; human-in-the-loop approval policy lives in [`approval`].

pub mod admission;
pub mod agent;
pub mod approval;
pub mod config;
pub mod error;
pub mod invocation;
pub mod memory;
pub mod registry;
pub mod store;
pub mod tools;
pub mod workflow;

#[cfg(feature = "server")]
pub mod api;

pub use admission::{ExecutionAdmission, ExecutionPermit, LlmPriority, LlmQueue};
pub use agent::{AgentInstance, AgentInstanceRegistry, Resolved, SkillResolver};
pub use approval::{ApprovalLevel, ApprovalRequest, ToolApprovalConfig};
pub use config::Config;
pub use error::{Error, Result, ToolError};
pub use invocation::{InvocationEngine, InvokeHeaders};
pub use memory::{MemoryFanout, WorkingMemoryStore};
pub use registry::{Tool, ToolCallLog, ToolRegistry as PersistedToolRegistry};
pub use store::{MemoryStore, Store};
pub use tools::{Tool as BuiltinTool, ToolDefinition, ToolOutput, ToolRegistry};
pub use workflow::{Workflow, WorkflowOrchestrator, WorkflowStatus};
