//! Agent/Skill Adapter: resolves the tool ids an agent was configured with
//! to executable skills or raw MCP calls.

pub mod instance;
pub mod resolver;

pub use instance::{AgentConfig, AgentInstance, AgentInstanceRegistry, ToolAdapter};
pub use resolver::{Resolved, SkillResolver};
