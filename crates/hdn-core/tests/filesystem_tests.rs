//! Filesystem tool tests
//!
//! Tests for ReadFile, WriteFile, GlobFiles, and GrepFiles.

use hdn_core::tools::filesystem::{GlobFiles, GrepFiles, ReadFile, WriteFile};
use hdn_core::tools::Tool;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn setup_workspace() -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    let base = dir.path();
    fs::create_dir_all(base.join("src")).unwrap();
    fs::write(base.join("src/main.rs"), "fn main() {\n    println!(\"hello\");\n}\n").unwrap();
    fs::write(base.join("README.md"), "# sample\n").unwrap();
    dir
}

#[tokio::test]
async fn read_file_returns_contents() {
    let dir = setup_workspace();
    let tool = ReadFile::new(dir.path().to_path_buf());
    let output = tool
        .execute(json!({"path": "src/main.rs"}))
        .await
        .unwrap();
    assert!(output.success);
    assert!(output.content["content"].as_str().unwrap().contains("hello"));
}

#[tokio::test]
async fn read_file_rejects_path_outside_workspace() {
    let dir = setup_workspace();
    let tool = ReadFile::new(dir.path().to_path_buf());
    let err = tool.execute(json!({"path": "../../etc/passwd"})).await;
    assert!(err.is_err());
}

#[tokio::test]
async fn write_file_creates_new_file() {
    let dir = setup_workspace();
    let tool = WriteFile::new(dir.path().to_path_buf());
    let output = tool
        .execute(json!({"file_path": "out.txt", "content": "hi there"}))
        .await
        .unwrap();
    assert!(output.success);
    let written = fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert_eq!(written, "hi there");
}

#[tokio::test]
async fn write_file_rejects_missing_content() {
    let dir = setup_workspace();
    let tool = WriteFile::new(dir.path().to_path_buf());
    let err = tool.execute(json!({"file_path": "out.txt"})).await;
    assert!(err.is_err());
}

#[tokio::test]
async fn glob_finds_rust_files() {
    let dir = setup_workspace();
    let tool = GlobFiles::new(dir.path().to_path_buf());
    let output = tool.execute(json!({"pattern": "**/*.rs"})).await.unwrap();
    let files = output.content["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn grep_finds_matching_line() {
    let dir = setup_workspace();
    let tool = GrepFiles::new(dir.path().to_path_buf());
    let output = tool
        .execute(json!({"pattern": "println", "output_mode": "files_with_matches"}))
        .await
        .unwrap();
    let files = output.content["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn grep_reports_no_matches_for_absent_pattern() {
    let dir = setup_workspace();
    let tool = GrepFiles::new(dir.path().to_path_buf());
    let output = tool
        .execute(json!({"pattern": "definitely_not_present_xyz", "output_mode": "files_with_matches"}))
        .await
        .unwrap();
    let files = output.content["files"].as_array().unwrap();
    assert!(files.is_empty());
}
