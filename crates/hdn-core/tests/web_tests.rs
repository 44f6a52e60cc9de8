//! Web tool tests
//!
//! Tests for WebFetch and WebSearch, limited to validation paths that don't
//! require live network access.

use hdn_core::tools::web::{WebFetch, WebSearch};
use hdn_core::tools::Tool;
use serde_json::json;

#[tokio::test]
async fn web_fetch_rejects_non_http_scheme() {
    let tool = WebFetch::new();
    let err = tool
        .execute(json!({"url": "ftp://example.com/file", "prompt": "summarize"}))
        .await;
    assert!(err.is_err());
}

#[tokio::test]
async fn web_fetch_rejects_invalid_url() {
    let tool = WebFetch::new();
    let err = tool
        .execute(json!({"url": "not a url", "prompt": "summarize"}))
        .await;
    assert!(err.is_err());
}

#[tokio::test]
async fn web_fetch_requires_prompt() {
    let tool = WebFetch::new();
    let err = tool.execute(json!({"url": "https://example.com"})).await;
    assert!(err.is_err());
}

#[tokio::test]
async fn web_search_without_api_endpoint_returns_placeholder_result() {
    let tool = WebSearch::new();
    let output = tool.execute(json!({"query": "rust async traits"})).await.unwrap();
    assert!(output.success);
    let results = output.content["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0]["snippet"].as_str().unwrap().contains("not configured"));
}

#[tokio::test]
async fn web_search_requires_query() {
    let tool = WebSearch::new();
    let err = tool.execute(json!({})).await;
    assert!(err.is_err());
}
