//! Configuration for the HDN execution service.
//!
//! An optional TOML file supplies defaults; environment variables overlay
//! it and always take precedence over values loaded from the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default constants used throughout the service.
pub mod defaults {
    /// Default total execution slots (N in the admission controller).
    pub const MAX_CONCURRENT_EXECUTIONS: usize = 3;

    /// Default LLM priority-queue slot count.
    pub const LLM_MAX_CONCURRENT_REQUESTS: usize = 2;

    /// Default command execution timeout in seconds.
    pub const COMMAND_TIMEOUT_SECS: u64 = 30;

    /// Bounded-wait deadline for an async admission acquisition.
    pub const ADMISSION_DEADLINE_SECS: u64 = 60;

    /// Default approval level for tool execution.
    pub const DEFAULT_APPROVAL_LEVEL: &str = "low";
}

/// Backend bias for the invocation engine (`EXECUTION_METHOD`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMethod {
    #[default]
    Unset,
    Docker,
    Ssh,
    Drone,
}

impl ExecutionMethod {
    fn from_env_value(v: &str) -> Self {
        match v.to_ascii_lowercase().as_str() {
            "docker" => Self::Docker,
            "ssh" => Self::Ssh,
            "drone" => Self::Drone,
            _ => Self::Unset,
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Remote/backend endpoints consumed by C3 and the memory/knowledge
/// subsystems. All optional: absence just disables that integration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Endpoints {
    pub rpi_host: Option<String>,
    pub drone_token: Option<String>,
    pub drone_repo: Option<String>,
    pub rag_adapter_url: Option<String>,
    pub weaviate_url: Option<String>,
    pub neo4j_uri: Option<String>,
    pub neo4j_user: Option<String>,
    pub neo4j_pass: Option<String>,
    pub redis_url: Option<String>,
    pub nats_url: Option<String>,
    pub goal_manager_url: Option<String>,
    pub agi_project_root: Option<PathBuf>,
}

impl Endpoints {
    fn overlay_env(&mut self) {
        macro_rules! overlay {
            ($field:ident, $var:literal) => {
                if let Ok(v) = std::env::var($var) {
                    self.$field = Some(v);
                }
            };
        }
        overlay!(rpi_host, "RPI_HOST");
        overlay!(drone_token, "DRONE_TOKEN");
        overlay!(drone_repo, "DRONE_REPO");
        overlay!(rag_adapter_url, "RAG_ADAPTER_URL");
        overlay!(weaviate_url, "WEAVIATE_URL");
        overlay!(neo4j_uri, "NEO4J_URI");
        overlay!(neo4j_user, "NEO4J_USER");
        overlay!(neo4j_pass, "NEO4J_PASS");
        overlay!(redis_url, "REDIS_URL");
        overlay!(nats_url, "NATS_URL");
        overlay!(goal_manager_url, "GOAL_MANAGER_URL");
        if let Ok(v) = std::env::var("AGI_PROJECT_ROOT") {
            self.agi_project_root = Some(PathBuf::from(v));
        }
    }
}

/// Admission controller tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    #[serde(default = "default_max_executions")]
    pub max_concurrent_executions: usize,
    #[serde(default = "default_llm_slots")]
    pub llm_max_concurrent_requests: usize,
    #[serde(default)]
    pub disable_background_llm: bool,
}

fn default_max_executions() -> usize {
    defaults::MAX_CONCURRENT_EXECUTIONS
}

fn default_llm_slots() -> usize {
    defaults::LLM_MAX_CONCURRENT_REQUESTS
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_executions: default_max_executions(),
            llm_max_concurrent_requests: default_llm_slots(),
            disable_background_llm: false,
        }
    }
}

impl AdmissionConfig {
    fn overlay_env(&mut self) {
        if let Ok(v) = std::env::var("HDN_MAX_CONCURRENT_EXECUTIONS") {
            if let Ok(n) = v.parse() {
                self.max_concurrent_executions = n;
            }
        }
        if let Ok(v) = std::env::var("LLM_MAX_CONCURRENT_REQUESTS") {
            if let Ok(n) = v.parse() {
                self.llm_max_concurrent_requests = n;
            }
        }
        if std::env::var("DISABLE_BACKGROUND_LLM").is_ok() {
            self.disable_background_llm = env_flag("DISABLE_BACKGROUND_LLM");
        }
    }
}

/// Invocation engine backend selection and permission filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub method: ExecutionMethod,
    #[serde(default)]
    pub enable_arm64_tools: bool,
    /// Comma-separated allow-list for the permission filter; unset (`None`)
    /// means permissive (every permission allowed).
    #[serde(default)]
    pub allowed_tool_perms: Option<Vec<String>>,
}

impl ExecutionConfig {
    fn overlay_env(&mut self) {
        if let Ok(v) = std::env::var("EXECUTION_METHOD") {
            self.method = ExecutionMethod::from_env_value(&v);
        }
        if std::env::var("ENABLE_ARM64_TOOLS").is_ok() {
            self.enable_arm64_tools = env_flag("ENABLE_ARM64_TOOLS");
        }
        if let Ok(v) = std::env::var("ALLOWED_TOOL_PERMS") {
            self.allowed_tool_perms = Some(
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
    }

    /// Whether `perm` is allowed. Permissive (always true) when no
    /// allow-list was configured.
    pub fn permits(&self, perm: &str) -> bool {
        match &self.allowed_tool_perms {
            None => true,
            Some(allowed) => allowed.iter().any(|p| p == perm),
        }
    }
}

/// Approval policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    pub auto_approve_level: String,
    pub show_dialogs: bool,
    pub timeout_secs: u64,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            auto_approve_level: defaults::DEFAULT_APPROVAL_LEVEL.to_string(),
            show_dialogs: true,
            timeout_secs: 300,
        }
    }
}

/// General service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub log_level: String,
    /// Suppress noisy `set -x`-style output in remote shells (`QUIET=1`).
    pub quiet: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            quiet: false,
        }
    }
}

impl GeneralConfig {
    fn overlay_env(&mut self) {
        if std::env::var("QUIET").is_ok() {
            self.quiet = env_flag("QUIET");
        }
        if let Ok(v) = std::env::var("RUST_LOG") {
            self.log_level = v;
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub admission: AdmissionConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub approval: ApprovalConfig,
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl Config {
    /// Load the config file at `path` if it exists (falling back to
    /// defaults otherwise), then overlay environment variables, which
    /// always take precedence over the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => Self::from_file(p)?,
            _ => Self::default(),
        };
        config.overlay_env();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config: {e}")))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("failed to parse config: {e}")))
    }

    fn overlay_env(&mut self) {
        self.admission.overlay_env();
        self.execution.overlay_env();
        self.general.overlay_env();
        self.endpoints.overlay_env();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.admission.max_concurrent_executions, 3);
        assert_eq!(config.admission.llm_max_concurrent_requests, 2);
        assert!(!config.admission.disable_background_llm);
        assert_eq!(config.execution.method, ExecutionMethod::Unset);
    }

    #[test]
    fn permissive_when_no_allow_list_configured() {
        let config = ExecutionConfig::default();
        assert!(config.permits("anything"));
    }

    #[test]
    fn allow_list_restricts_permissions() {
        let mut config = ExecutionConfig::default();
        config.allowed_tool_perms = Some(vec!["read".to_string(), "write".to_string()]);
        assert!(config.permits("read"));
        assert!(!config.permits("exec"));
    }

    #[test]
    fn env_overlay_takes_precedence_over_file_defaults() {
        // SAFETY: test runs in isolation, no concurrent access to this env var
        unsafe { std::env::set_var("HDN_MAX_CONCURRENT_EXECUTIONS", "7") };
        let config = Config::load(None).unwrap();
        assert_eq!(config.admission.max_concurrent_executions, 7);
        // SAFETY: test runs in isolation, no concurrent access to this env var
        unsafe { std::env::remove_var("HDN_MAX_CONCURRENT_EXECUTIONS") };
    }

    #[test]
    fn execution_method_parses_from_env_value() {
        assert_eq!(ExecutionMethod::from_env_value("docker"), ExecutionMethod::Docker);
        assert_eq!(ExecutionMethod::from_env_value("SSH"), ExecutionMethod::Ssh);
        assert_eq!(ExecutionMethod::from_env_value("bogus"), ExecutionMethod::Unset);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            parsed.admission.max_concurrent_executions,
            config.admission.max_concurrent_executions
        );
    }
}
