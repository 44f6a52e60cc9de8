//! Invocation Engine (C2): dispatch a tool call to the correct backend,
//! enforce policy, capture metrics.

use std::sync::Arc;

use serde_json::Value;

use crate::admission::ExecutionAdmission;
use crate::error::{Error, Result};
use crate::registry::{CallStatus, ExecutionSpec, ToolCallLog, ToolRegistry};
use crate::tools::ToolRegistry as BuiltinRegistry;

/// Per-request headers the engine consumes (`X-Agent-ID`, `X-Project-ID`).
#[derive(Debug, Clone, Default)]
pub struct InvokeHeaders {
    pub agent_id: Option<String>,
    pub project_id: Option<String>,
}

/// Policy predicate consulted before dispatch ("principles gate").
pub trait PolicyGate: Send + Sync {
    fn check(&self, tool_id: &str, params: &Value) -> std::result::Result<(), String>;
}

/// Permissive default: approves everything. A real deployment supplies its
/// own gate (e.g. consulting an external policy service).
pub struct AllowAll;

impl PolicyGate for AllowAll {
    fn check(&self, _tool_id: &str, _params: &Value) -> std::result::Result<(), String> {
        Ok(())
    }
}

pub struct InvocationEngine {
    registry: Arc<ToolRegistry>,
    builtins: Arc<BuiltinRegistry>,
    admission: Arc<ExecutionAdmission>,
    policy: Arc<dyn PolicyGate>,
    store: Arc<dyn crate::store::Store>,
}

impl InvocationEngine {
    pub fn new(
        registry: Arc<ToolRegistry>,
        builtins: Arc<BuiltinRegistry>,
        admission: Arc<ExecutionAdmission>,
        store: Arc<dyn crate::store::Store>,
    ) -> Self {
        Self {
            registry,
            builtins,
            admission,
            policy: Arc::new(AllowAll),
            store,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn PolicyGate>) -> Self {
        self.policy = policy;
        self
    }

    /// `invoke(tool_id, params, headers) -> result`, following the six-step
    /// flow.
    pub async fn invoke(
        &self,
        tool_id: &str,
        params: Value,
        headers: InvokeHeaders,
        interactive: bool,
    ) -> Result<Value> {
        // Step 1: parse id / decode params (params already decoded by caller;
        // a missing body is represented by `Value::Null` which we normalize
        // to an empty object).
        let params = if params.is_null() {
            Value::Object(Default::default())
        } else {
            params
        };

        // Step 2: initialize the call log. Finalization happens in every
        // exit path below, guaranteeing exactly one non-pending log per
        // invocation.
        let metadata = self.registry.get(tool_id).await;
        let (permissions, safety_level) = metadata
            .as_ref()
            .map(|t| (t.permissions.clone(), t.safety_level))
            .unwrap_or_default();
        let mut log = ToolCallLog::pending(
            tool_id,
            metadata.as_ref().map(|t| t.name.as_str()).unwrap_or(tool_id),
            params.clone(),
            headers.agent_id.clone(),
            headers.project_id.clone(),
            permissions.clone(),
            safety_level,
        );

        let result = self
            .invoke_inner(tool_id, &params, &metadata, &permissions, interactive)
            .await;

        match &result {
            Ok(value) => log.finalize(CallStatus::Success, Some(value.clone()), None),
            Err(Error::PermissionDenied(reason)) => {
                log.finalize(CallStatus::Blocked, None, Some(reason.clone()))
            }
            Err(e) => log.finalize(CallStatus::Failure, None, Some(e.to_string())),
        }

        self.store
            .set(&format!("call_log:{}", log.id), serde_json::to_value(&log)?)
            .await;
        self.store.incr("metrics:total_executions", 1).await;
        if matches!(log.status, CallStatus::Success) {
            self.store.incr("metrics:successful_executions", 1).await;
        }
        self.store
            .set(
                "metrics:last_execution",
                Value::String(log.started_at.to_rfc3339()),
            )
            .await;
        if let Some(duration_ms) = log.duration_ms {
            self.record_avg_execution_time(duration_ms as f64).await;
        }

        result
    }

    /// Maintains a running mean in `metrics:avg_execution_time` from the
    /// count already tracked in `metrics:total_executions`.
    async fn record_avg_execution_time(&self, duration_ms: f64) {
        let count = self
            .store
            .get("metrics:total_executions")
            .await
            .and_then(|v| v.as_i64())
            .unwrap_or(1)
            .max(1) as f64;
        let previous_avg = self
            .store
            .get("metrics:avg_execution_time")
            .await
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let new_avg = previous_avg + (duration_ms - previous_avg) / count;
        self.store
            .set(
                "metrics:avg_execution_time",
                serde_json::json!(new_avg),
            )
            .await;
    }

    async fn invoke_inner(
        &self,
        tool_id: &str,
        params: &Value,
        metadata: &Option<crate::registry::Tool>,
        permissions: &[String],
        interactive: bool,
    ) -> Result<Value> {
        // Step 4: principles gate.
        self.policy
            .check(tool_id, params)
            .map_err(|reason| Error::PermissionDenied(format!("blocked by principles: {reason}")))?;

        // Step 5: sandbox permission filter, driven by ALLOWED_TOOL_PERMS.
        if let Ok(allow_list) = std::env::var("ALLOWED_TOOL_PERMS") {
            let allowed: std::collections::HashSet<&str> =
                allow_list.split(',').map(str::trim).collect();
            for perm in permissions {
                if !allowed.contains(perm.as_str()) {
                    return Err(Error::PermissionDenied(format!(
                        "permission '{perm}' is not in ALLOWED_TOOL_PERMS"
                    )));
                }
            }
        }

        // Admission: acquire an execution slot for the duration of dispatch.
        let _permit = self
            .admission
            .acquire(interactive)
            .await
            .map_err(|_| Error::Overloaded("execution slots exhausted".into()))?;

        // Step 6: dispatch. A fixed set of well-known ids gets dedicated
        // handling ahead of the generic by-name builtin lookup, either
        // because no builtin exists under that exact name (`tool_http_get`,
        // `tool_ssh_exec`, `tool_telegram_send`) or because the builtin is
        // registered under its native name rather than the well-known id
        // (file read/write/list, shell exec).
        match tool_id {
            "tool_http_get" => return self.dispatch_http_get(params).await,
            "tool_ssh_exec" => return self.dispatch_ssh_exec(params).await,
            "tool_telegram_send" => return self.dispatch_telegram_send(params).await,
            _ => {}
        }

        let builtin_name = well_known_builtin_name(tool_id).unwrap_or(tool_id);
        if let Some(tool) = self.builtins.get(builtin_name) {
            let output = tool
                .execute(params.clone())
                .await
                .map_err(Error::from)?;
            return if output.success {
                Ok(output.content)
            } else {
                Err(Error::BackendFailure(
                    output.error.unwrap_or_else(|| "tool execution failed".into()),
                ))
            };
        }

        match metadata.as_ref().and_then(|t| t.exec.as_ref()) {
            Some(ExecutionSpec::Cmd { path, args }) => {
                self.dispatch_cmd(path, args, params).await
            }
            Some(ExecutionSpec::Image { image }) => self.dispatch_image(image, params).await,
            Some(ExecutionSpec::Code { language, source }) => {
                self.dispatch_code(language, source, params).await
            }
            None => Err(Error::NotImplemented(format!(
                "tool {tool_id} has no execution spec and no built-in handler matches"
            ))),
        }
    }

    /// Fetches a URL with only `url` required (§4.2's `tool_http_get`
    /// handler, distinct from the richer `WebFetch` builtin which also
    /// requires a `prompt`).
    async fn dispatch_http_get(&self, params: &Value) -> Result<Value> {
        let url = params["url"]
            .as_str()
            .ok_or_else(|| Error::InvalidArgument("url is required".into()))?;
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::InvalidArgument(format!("invalid url: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::PermissionDenied(
                "only http/https URLs are allowed".into(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("hdn-execution-service/1.0")
            .build()
            .map_err(|e| Error::BackendFailure(format!("building http client: {e}")))?;
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::BackendFailure(format!("fetching {url}: {e}")))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::BackendFailure(format!("reading response body: {e}")))?;

        Ok(serde_json::json!({
            "url": url,
            "status": status,
            "body": body,
        }))
    }

    /// SSH executor (§4.2): delegates the run to C3 over the configured
    /// remote host, then attempts a best-effort remote CI submission whose
    /// result is embedded under `drone_submission` per §7's demotion
    /// contract — submission failures never fail a call whose local run
    /// already succeeded.
    async fn dispatch_ssh_exec(&self, params: &Value) -> Result<Value> {
        #[cfg(feature = "sandbox")]
        {
            let code = params["code"]
                .as_str()
                .ok_or_else(|| Error::InvalidArgument("code is required".into()))?;
            let language = params["language"].as_str().unwrap_or("bash");

            let mut env = std::collections::HashMap::new();
            env.insert(
                "HDN_TOOL_PARAMS".to_string(),
                serde_json::to_string(params).unwrap_or_default(),
            );

            let config = hdn_sandbox::remote::RemoteConfig {
                host: std::env::var("RPI_HOST").unwrap_or_default(),
                ..Default::default()
            };
            let request = hdn_sandbox::remote::RemoteRunRequest {
                code: code.to_string(),
                language: hdn_sandbox::remote::RemoteLanguage::from_str_loose(language),
                image: None,
                env,
                previous_output: None,
            };
            let result = hdn_sandbox::remote::run_remote(&config, request)
                .await
                .map_err(Error::from)?;

            let succeeded = result.success;
            let mut value = serde_json::to_value(&result)?;
            let drone_submission = self.submit_to_drone(language, code).await;
            if succeeded {
                if let Value::Object(ref mut map) = value {
                    map.insert("drone_submission".to_string(), drone_submission);
                }
            }
            Ok(value)
        }
        #[cfg(not(feature = "sandbox"))]
        {
            let _ = params;
            Err(Error::NotImplemented("sandbox feature disabled".into()))
        }
    }

    /// Best-effort remote CI submission for the SSH executor. Never
    /// propagates an error: failures are demoted to `{success: false,
    /// error: ...}` so they don't fail a call whose local run succeeded.
    #[cfg(feature = "sandbox")]
    async fn submit_to_drone(&self, language: &str, code: &str) -> Value {
        let (token, repo) = match (
            std::env::var("DRONE_TOKEN"),
            std::env::var("DRONE_REPO"),
        ) {
            (Ok(token), Ok(repo)) => (token, repo),
            _ => {
                return serde_json::json!({
                    "success": false,
                    "error": "DRONE_TOKEN/DRONE_REPO not configured",
                })
            }
        };

        let client = reqwest::Client::new();
        let url = format!("https://drone.io/api/repos/{repo}/builds");
        match client
            .post(&url)
            .bearer_auth(&token)
            .json(&serde_json::json!({ "language": language, "source": code }))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => serde_json::json!({ "success": true }),
            Ok(resp) => serde_json::json!({
                "success": false,
                "error": format!("drone submission returned status {}", resp.status()),
            }),
            Err(e) => serde_json::json!({ "success": false, "error": e.to_string() }),
        }
    }

    /// Sends a message through the Telegram Bot API. Requires a configured
    /// `TELEGRAM_BOT_TOKEN`; `chat_id` and `text` come from params.
    async fn dispatch_telegram_send(&self, params: &Value) -> Result<Value> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").map_err(|_| {
            Error::BackendFailure("TELEGRAM_BOT_TOKEN is not configured".into())
        })?;
        let chat_id = params["chat_id"]
            .as_str()
            .map(str::to_string)
            .or_else(|| params["chat_id"].as_i64().map(|n| n.to_string()))
            .ok_or_else(|| Error::InvalidArgument("chat_id is required".into()))?;
        let text = params["text"]
            .as_str()
            .ok_or_else(|| Error::InvalidArgument("text is required".into()))?;

        let client = reqwest::Client::new();
        let url = format!("https://api.telegram.org/bot{token}/sendMessage");
        let response = client
            .post(&url)
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| Error::BackendFailure(format!("sending telegram message: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .unwrap_or_else(|_| Value::String(String::new()));
        if !status.is_success() {
            return Err(Error::BackendFailure(format!(
                "telegram API returned status {status}: {body}"
            )));
        }
        Ok(body)
    }

    async fn dispatch_cmd(&self, path: &str, args: &[String], params: &Value) -> Result<Value> {
        let substituted: Vec<String> = args
            .iter()
            .map(|a| substitute_placeholders(a, params))
            .collect();

        #[cfg(feature = "sandbox")]
        {
            let direct_path = std::path::Path::new(path);
            let tools_dir_path = std::env::var("TOOLS_DIR")
                .ok()
                .map(|dir| std::path::PathBuf::from(dir).join(path))
                .filter(|p| p.exists());

            let resolved = if direct_path.exists() {
                Some(direct_path.to_path_buf())
            } else {
                tools_dir_path
            };

            let resolved = match resolved {
                Some(p) => p,
                None => {
                    let code = params.get("code").and_then(Value::as_str);
                    let language = params.get("language").and_then(Value::as_str);
                    match (code, language) {
                        (Some(code), Some(language)) => {
                            return self.dispatch_code(language, code, params).await;
                        }
                        _ => {
                            return Err(Error::InvalidArgument(format!(
                                "cmd path '{path}' does not exist; provide code+language or an \
                                 allow-listed path under TOOLS_DIR"
                            )));
                        }
                    }
                }
            };

            let config = hdn_sandbox::SandboxConfig::default();
            let arg_refs: Vec<&str> = substituted.iter().map(String::as_str).collect();
            let result =
                hdn_sandbox::process::execute_sandboxed(&config, &resolved.to_string_lossy(), &arg_refs)
                    .await
                    .map_err(Error::from)?;
            Ok(serde_json::json!({
                "stdout": result.stdout,
                "stderr": result.stderr,
                "exit_code": result.exit_code,
            }))
        }
        #[cfg(not(feature = "sandbox"))]
        {
            let _ = (path, substituted, params);
            Err(Error::NotImplemented("sandbox feature disabled".into()))
        }
    }

    async fn dispatch_image(&self, _image: &str, _params: &Value) -> Result<Value> {
        Err(Error::BackendFailure(
            "no local container runtime available for image execution".into(),
        ))
    }

    async fn dispatch_code(&self, language: &str, source: &str, params: &Value) -> Result<Value> {
        #[cfg(feature = "sandbox")]
        {
            let mut env = std::collections::HashMap::new();
            env.insert(
                "HDN_TOOL_PARAMS".to_string(),
                serde_json::to_string(params).unwrap_or_default(),
            );
            let config = hdn_sandbox::remote::RemoteConfig::default();
            let request = hdn_sandbox::remote::RemoteRunRequest {
                code: source.to_string(),
                language: hdn_sandbox::remote::RemoteLanguage::from_str_loose(language),
                image: None,
                env,
                previous_output: None,
            };
            let result = hdn_sandbox::remote::run_remote(&config, request)
                .await
                .map_err(Error::from)?;
            Ok(serde_json::to_value(result)?)
        }
        #[cfg(not(feature = "sandbox"))]
        {
            let _ = (language, source, params);
            Err(Error::NotImplemented("sandbox feature disabled".into()))
        }
    }
}

/// Maps a spec-level well-known id to the builtin's native registered name,
/// for the cases where they differ (the builtin predates the well-known id
/// convention). Ids with no native-name builtin counterpart (HTTP GET, SSH
/// exec, Telegram send, `mcp_`-prefixed bridge tools) are handled elsewhere.
fn well_known_builtin_name(tool_id: &str) -> Option<&'static str> {
    match tool_id {
        "tool_read_file" => Some("read_file"),
        "tool_write_file" => Some("Write"),
        "tool_list_dir" => Some("ListDirectory"),
        "tool_shell_exec" => Some("execute_command"),
        _ => None,
    }
}

/// `{key}` -> JSON-serialized value of `params[key]` (unquoted if already a
/// string).
fn substitute_placeholders(arg: &str, params: &Value) -> String {
    let mut out = arg.to_string();
    if let Value::Object(map) = params {
        for (key, value) in map {
            let needle = format!("{{{key}}}");
            if out.contains(&needle) {
                let replacement = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                out = out.replace(&needle, &replacement);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_substitution_unquotes_strings() {
        let params = serde_json::json!({"name": "world", "count": 3});
        assert_eq!(substitute_placeholders("hello {name}", &params), "hello world");
        assert_eq!(substitute_placeholders("n={count}", &params), "n=3");
    }

    #[tokio::test]
    async fn unknown_tool_without_spec_is_not_implemented() {
        let store = crate::store::MemoryStore::new();
        let registry = Arc::new(ToolRegistry::new(store.clone()));
        let builtins = Arc::new(BuiltinRegistry::new());
        let admission = Arc::new(ExecutionAdmission::new(3));
        let engine = InvocationEngine::new(registry, builtins, admission, store);

        let err = engine
            .invoke("tool_unknown", Value::Null, InvokeHeaders::default(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotImplemented(_)));
    }
}
