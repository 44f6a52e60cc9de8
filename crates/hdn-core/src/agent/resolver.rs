//! Agent/Skill Adapter resolution chain.
//!
//! Every tool reference an agent is configured with is resolved by trying,
//! in order: exact match in the skill registry, match after stripping the
//! `mcp_` prefix, dispatch by prefix (`mcp_`, `n8n_`, `tool_`), and finally
//! a raw fallback to the MCP surface if present.

use std::sync::Arc;

use crate::tools::ToolRegistry as SkillRegistry;

pub const KNOWN_PREFIXES: &[&str] = &["mcp_", "n8n_", "tool_"];

/// Outcome of resolving an agent-configured tool reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Resolved to an id in the in-process skill registry.
    Skill(String),
    /// No registry match; fall back to a raw MCP call. `server` is `None`
    /// when the reference carries no recoverable server hint.
    RawMcp { server: Option<String>, tool: String },
    Unresolved,
}

pub struct SkillResolver {
    registry: Arc<SkillRegistry>,
    mcp_available: bool,
}

impl SkillResolver {
    pub fn new(registry: Arc<SkillRegistry>, mcp_available: bool) -> Self {
        Self {
            registry,
            mcp_available,
        }
    }

    /// Resolve `tool_ref` (the id an agent was configured with) to an
    /// executable target, without consuming `tool_ref` itself: callers keep
    /// the original id for matching and use the returned id for execution.
    pub fn resolve(&self, tool_ref: &str) -> Resolved {
        // 1. Exact match.
        if self.registry.get(tool_ref).is_some() {
            return Resolved::Skill(tool_ref.to_string());
        }

        // 2. Strip the `mcp_` prefix and retry exact match (covers tools
        // registered under their bare MCP tool name).
        if let Some(stripped) = tool_ref.strip_prefix("mcp_") {
            if self.registry.get(stripped).is_some() {
                return Resolved::Skill(stripped.to_string());
            }
        }

        // 3. Dispatch by prefix.
        for prefix in KNOWN_PREFIXES {
            if let Some(rest) = tool_ref.strip_prefix(prefix) {
                if self.registry.get(rest).is_some() {
                    return Resolved::Skill(rest.to_string());
                }
                if *prefix == "mcp_" {
                    // `mcp_{server}_{tool}`: best-effort split on the first
                    // underscore remaining; if ambiguous, treat the whole
                    // remainder as the tool name with no server hint.
                    return match rest.split_once('_') {
                        Some((server, tool)) => Resolved::RawMcp {
                            server: Some(server.to_string()),
                            tool: tool.to_string(),
                        },
                        None => Resolved::RawMcp {
                            server: None,
                            tool: rest.to_string(),
                        },
                    };
                }
            }
        }

        // 4. Raw MCP fallback, only if a surface is actually connected.
        if self.mcp_available {
            return Resolved::RawMcp {
                server: None,
                tool: tool_ref.to_string(),
            };
        }

        Resolved::Unresolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::web::WebFetch;
    use std::sync::Arc as StdArc;

    fn resolver_with_webfetch(mcp_available: bool) -> SkillResolver {
        let mut registry = SkillRegistry::new();
        registry.register(StdArc::new(WebFetch::new()));
        SkillResolver::new(Arc::new(registry), mcp_available)
    }

    #[test]
    fn exact_match_wins() {
        let resolver = resolver_with_webfetch(false);
        assert_eq!(resolver.resolve("WebFetch"), Resolved::Skill("WebFetch".to_string()));
    }

    #[test]
    fn strips_mcp_prefix_before_falling_back() {
        let resolver = resolver_with_webfetch(false);
        assert_eq!(
            resolver.resolve("mcp_WebFetch"),
            Resolved::Skill("WebFetch".to_string())
        );
    }

    #[test]
    fn unmatched_mcp_prefixed_ref_becomes_raw_mcp_with_server_split() {
        let resolver = resolver_with_webfetch(false);
        assert_eq!(
            resolver.resolve("mcp_docs_search"),
            Resolved::RawMcp {
                server: Some("docs".to_string()),
                tool: "search".to_string(),
            }
        );
    }

    #[test]
    fn unresolved_without_mcp_surface() {
        let resolver = resolver_with_webfetch(false);
        assert_eq!(resolver.resolve("totally_unknown"), Resolved::Unresolved);
    }

    #[test]
    fn raw_fallback_when_mcp_surface_present() {
        let resolver = resolver_with_webfetch(true);
        assert_eq!(
            resolver.resolve("totally_unknown"),
            Resolved::RawMcp {
                server: None,
                tool: "totally_unknown".to_string(),
            }
        );
    }
}
