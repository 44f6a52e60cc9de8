//! Remote code execution over a plain SSH shell
//!
//! This is the backend invoked when the invocation engine has no local
//! container runtime available: the source is written to a temp file on a
//! remote host and run there using a stripped, `env -i`-cleaned shell so
//! user profile hooks can't pollute the captured output.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::sanitizer;
use crate::SandboxError;

/// Language of the snippet to run remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteLanguage {
    Go,
    Python,
    Bash,
    Javascript,
    Java,
    Other,
}

impl RemoteLanguage {
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "go" | "golang" => Self::Go,
            "python" | "python3" | "py" => Self::Python,
            "bash" | "sh" | "shell" => Self::Bash,
            "javascript" | "js" | "node" | "nodejs" => Self::Javascript,
            "java" => Self::Java,
            _ => Self::Other,
        }
    }

    fn file_extension(&self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::Python => "py",
            Self::Bash => "sh",
            Self::Javascript => "js",
            Self::Java => "java",
            Self::Other => "sh",
        }
    }
}

/// Configuration for reaching the remote host.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Host to SSH into, e.g. `RPI_HOST`.
    pub host: String,
    pub user: Option<String>,
    pub tmp_dir: String,
    /// Extra `ssh` CLI options (e.g. `-i /path/key`, `-p 2222`).
    pub ssh_opts: Vec<String>,
    /// Whether a local container runtime (docker/podman) is available, used
    /// to decide whether go/javascript prefer a container toolchain.
    pub local_container_available: bool,
    /// Suppress `set -x`-style tracing in the generated bash wrapper.
    pub quiet: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            user: None,
            tmp_dir: "/tmp".to_string(),
            ssh_opts: Vec::new(),
            local_container_available: false,
            quiet: false,
        }
    }
}

/// A request to run a snippet on the remote host.
#[derive(Debug, Clone)]
pub struct RemoteRunRequest {
    pub code: String,
    pub language: RemoteLanguage,
    pub image: Option<String>,
    pub env: HashMap<String, String>,
    pub previous_output: Option<String>,
}

/// Outcome of a remote run, already sanitized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRunResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub exit_code: i32,
    pub duration_ms: u64,
    pub method: String,
    pub host: String,
}

/// Quoting rule centralized here to avoid per-language escaping bugs:
/// backslash, dollar, backtick and double-quote are escaped, the value is
/// wrapped in double quotes.
pub fn shell_escape_export(key: &str, value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('$', "\\$")
        .replace('`', "\\`")
        .replace('"', "\\\"");
    format!("export {}=\"{}\"", key, escaped)
}

fn build_env_exports(env: &HashMap<String, String>) -> String {
    let mut keys: Vec<&String> = env.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|k| shell_escape_export(k, &env[k]))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Build the language-specific command run against the uploaded file.
fn build_run_command(req: &RemoteRunRequest, remote_file: &str, cfg: &RemoteConfig) -> String {
    let exports = build_env_exports(&req.env);
    let exports = if exports.is_empty() { String::new() } else { format!("{}; ", exports) };

    let body = match req.language {
        RemoteLanguage::Go => {
            if cfg.local_container_available {
                format!("docker run --rm -v {dir}:/src -w /src golang:1.22 go run {file}",
                    dir = cfg.tmp_dir, file = remote_file)
            } else {
                let stdin_pipe = req
                    .previous_output
                    .as_deref()
                    .map(|_| " < \"$PREV_OUTPUT_FILE\"")
                    .unwrap_or("");
                format!("cd {} && go run {}{}", cfg.tmp_dir, remote_file, stdin_pipe)
            }
        }
        RemoteLanguage::Python => {
            let venv = format!("{}/hdn-venv", cfg.tmp_dir);
            format!(
                "test -d {venv} || python3 -m venv {venv}; . {venv}/bin/activate && python3 {file}",
                venv = venv,
                file = remote_file
            )
        }
        RemoteLanguage::Bash => format!("bash {}", remote_file),
        RemoteLanguage::Javascript => {
            if cfg.local_container_available {
                format!("docker run --rm -v {dir}:/src -w /src node:20 node {file}",
                    dir = cfg.tmp_dir, file = remote_file)
            } else {
                format!("node {}", remote_file)
            }
        }
        RemoteLanguage::Java => {
            format!("cd {} && javac {file} && java {class}",
                cfg.tmp_dir,
                file = remote_file,
                class = remote_file.trim_end_matches(".java").rsplit('/').next().unwrap_or("Main"))
        }
        RemoteLanguage::Other => format!("sh {}", remote_file),
    };

    let set_opts = if cfg.quiet { "set -euo pipefail" } else { "set -eu -x" };

    format!("{}{}; {}", exports, set_opts, body)
}

/// Run `code` on the configured remote host and return sanitized output.
pub async fn run_remote(
    cfg: &RemoteConfig,
    req: RemoteRunRequest,
) -> Result<RemoteRunResult, SandboxError> {
    let start = Instant::now();
    let id = uuid::Uuid::new_v4();
    let remote_file = format!(
        "{}/hdn-remote-{}.{}",
        cfg.tmp_dir,
        id,
        req.language.file_extension()
    );

    let encoded = base64::engine::general_purpose::STANDARD.encode(req.code.as_bytes());
    let write_cmd = format!(
        "mkdir -p {dir} && printf '%s' '{b64}' | base64 -d > {file}",
        dir = cfg.tmp_dir,
        b64 = encoded,
        file = remote_file
    );

    run_ssh(cfg, &write_cmd).await?;

    let run_cmd = build_run_command(&req, &remote_file, cfg);
    let wrapped = format!("env -i PATH=/usr/local/bin:/usr/bin:/bin HOME=/tmp USER=hdn sh -c {}",
        shell_single_quote(&run_cmd));

    let output = run_ssh_captured(cfg, &wrapped, req.previous_output.as_deref()).await;

    // best-effort cleanup, never fails the call
    let _ = run_ssh(cfg, &format!("rm -f {}", remote_file)).await;

    let duration_ms = start.elapsed().as_millis() as u64;

    match output {
        Ok((stdout, stderr, exit_code)) => {
            let sanitized = sanitizer::sanitize(&stdout, &stderr, exit_code);
            let success = sanitizer::is_success(exit_code);
            Ok(RemoteRunResult {
                success,
                output: sanitized,
                error: if success { None } else { Some(format!("exit code {}", exit_code)) },
                exit_code,
                duration_ms,
                method: "ssh".to_string(),
                host: cfg.host.clone(),
            })
        }
        Err(e) => Err(e),
    }
}

fn shell_single_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

async fn run_ssh(cfg: &RemoteConfig, remote_command: &str) -> Result<(), SandboxError> {
    let (_, stderr, code) = run_ssh_captured(cfg, remote_command, None).await?;
    if code != 0 {
        return Err(SandboxError::Execution(format!(
            "remote command failed ({}): {}",
            code, stderr
        )));
    }
    Ok(())
}

async fn run_ssh_captured(
    cfg: &RemoteConfig,
    remote_command: &str,
    stdin_data: Option<&str>,
) -> Result<(String, String, i32), SandboxError> {
    let target = match &cfg.user {
        Some(user) => format!("{}@{}", user, cfg.host),
        None => cfg.host.clone(),
    };

    let mut cmd = Command::new("ssh");
    cmd.args(&cfg.ssh_opts)
        .arg(target)
        .arg(remote_command)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if stdin_data.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }

    let mut child = cmd.spawn().map_err(|e| SandboxError::Execution(e.to_string()))?;

    if let Some(data) = stdin_data {
        use tokio::io::AsyncWriteExt;
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(data.as_bytes()).await;
        }
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| SandboxError::Execution(e.to_string()))?;

    Ok((
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    ))
}

/// Host-side temp directory helper, namespaced per host to avoid collisions
/// between concurrent invocations targeting different machines.
pub fn host_tmp_dir(base: &str, host: &str) -> PathBuf {
    PathBuf::from(base).join(host.replace([':', '/'], "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_handles_special_characters() {
        let escaped = shell_escape_export("FOO", "a\"b`c$d\\e");
        assert_eq!(escaped, "export FOO=\"a\\\"b\\`c\\$d\\\\e\"");
    }

    #[test]
    fn language_detection_is_case_insensitive() {
        assert_eq!(RemoteLanguage::from_str_loose("PYTHON"), RemoteLanguage::Python);
        assert_eq!(RemoteLanguage::from_str_loose("js"), RemoteLanguage::Javascript);
        assert_eq!(RemoteLanguage::from_str_loose("weird"), RemoteLanguage::Other);
    }

    #[test]
    fn bash_command_respects_quiet_mode() {
        let cfg = RemoteConfig { quiet: true, ..Default::default() };
        let req = RemoteRunRequest {
            code: "echo hi".into(),
            language: RemoteLanguage::Bash,
            image: None,
            env: HashMap::new(),
            previous_output: None,
        };
        let cmd = build_run_command(&req, "/tmp/x.sh", &cfg);
        assert!(cmd.contains("set -euo pipefail"));

        let cfg_loud = RemoteConfig { quiet: false, ..Default::default() };
        let cmd_loud = build_run_command(&req, "/tmp/x.sh", &cfg_loud);
        assert!(cmd_loud.contains("set -eu -x"));
    }
}
