//! Shell tool tests
//!
//! Tests for ExecuteCommand and the background shell registry/KillShell.

use hdn_core::tools::shell::{ExecuteCommand, KillShell, ShellProcessRegistry};
use hdn_core::tools::Tool;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn setup_workspace() -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    std::fs::write(dir.path().join("marker.txt"), "present").unwrap();
    dir
}

#[tokio::test]
async fn execute_command_returns_stdout() {
    let dir = setup_workspace();
    let tool = ExecuteCommand::new(dir.path().to_path_buf());
    let output = tool
        .execute(json!({"command": "echo hello"}))
        .await
        .unwrap();
    assert!(output.success);
    assert!(output.content["stdout"].as_str().unwrap().contains("hello"));
    assert_eq!(output.content["exit_code"].as_i64(), Some(0));
}

#[tokio::test]
async fn execute_command_rejects_blocked_pattern() {
    let dir = setup_workspace();
    let tool = ExecuteCommand::new(dir.path().to_path_buf());
    let err = tool.execute(json!({"command": "sudo rm -rf /"})).await;
    assert!(err.is_err());
}

#[tokio::test]
async fn execute_command_runs_in_workspace_working_dir() {
    let dir = setup_workspace();
    let tool = ExecuteCommand::new(dir.path().to_path_buf());
    let output = tool
        .execute(json!({"command": "ls marker.txt"}))
        .await
        .unwrap();
    assert!(output.content["stdout"].as_str().unwrap().contains("marker.txt"));
}

#[tokio::test]
async fn background_command_registers_and_can_be_killed() {
    let dir = setup_workspace();
    let registry = Arc::new(ShellProcessRegistry::new());
    let tool = ExecuteCommand::new(dir.path().to_path_buf()).with_registry(registry.clone());

    let output = tool
        .execute(json!({"command": "sleep 5", "run_in_background": true}))
        .await
        .unwrap();
    let shell_id = output.content["shell_id"].as_str().unwrap().to_string();
    assert_eq!(registry.get(&shell_id).await, Some(hdn_core::tools::shell::ShellStatus::Running));

    let kill = KillShell::new(registry.clone());
    let kill_output = kill.execute(json!({"shell_id": shell_id})).await.unwrap();
    assert!(kill_output.success);
}
