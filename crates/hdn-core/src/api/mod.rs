//! REST surface, rendered as an `axum` router. Route bodies
//! are thin adapters over the C1–C7 services; all actual logic lives in
//! `crate::registry`, `crate::invocation`, `crate::workflow`, and
//! `crate::memory`.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::admission::ExecutionAdmission;
use crate::error::Error;
use crate::invocation::{InvocationEngine, InvokeHeaders};
use crate::memory::{MemoryEvent, MemoryFanout, Outcome};
use crate::registry::{RegisterRequest, ToolRegistry};
use crate::store::Store;
use crate::workflow::{LaunchRequest, WorkflowOrchestrator};

#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<ToolRegistry>,
    pub invocation: Arc<InvocationEngine>,
    pub workflows: Arc<WorkflowOrchestrator>,
    pub memory: Arc<MemoryFanout>,
    pub admission: Arc<ExecutionAdmission>,
    pub store: Arc<dyn Store>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/tools", get(list_tools).post(register_tool))
        .route("/api/v1/tools/discover", post(discover_tools))
        .route("/api/v1/tools/metrics", get(registry_metrics))
        .route("/api/v1/tools/calls/recent", get(recent_calls))
        .route("/api/v1/tools/{id}", delete(delete_tool))
        .route("/api/v1/tools/{id}/invoke", post(invoke_tool))
        .route("/api/v1/tools/{id}/metrics", get(tool_metrics))
        .route("/api/v1/hierarchical/execute", post(launch_workflow))
        .route("/api/v1/hierarchical/workflow/{id}/status", get(workflow_status))
        .route("/api/v1/hierarchical/workflow/{id}/details", get(workflow_details))
        .route("/api/v1/hierarchical/workflow/{id}/pause", post(workflow_pause))
        .route("/api/v1/hierarchical/workflow/{id}/resume", post(workflow_resume))
        .route("/api/v1/hierarchical/workflow/{id}/cancel", post(workflow_cancel))
        .route("/api/v1/hierarchical/workflows", get(list_workflows))
        .route(
            "/api/v1/state/session/{id}/working_memory",
            get(working_memory),
        )
        .route(
            "/api/v1/state/session/{id}/locals",
            post(set_working_memory_local),
        )
        .route(
            "/api/v1/state/session/{id}/plan",
            post(set_working_memory_plan),
        )
        .with_state(state)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, Error>;

async fn list_tools(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let tools = state.registry.list().await;
    Ok(Json(json!({ "tools": tools })))
}

async fn register_tool(
    State(state): State<ApiState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<Value>> {
    let (tool, _event) = state.registry.register(req).await?;
    Ok(Json(serde_json::to_value(tool)?))
}

async fn delete_tool(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.registry.delete(&id).await?;
    Ok(StatusCode::OK)
}

async fn discover_tools(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let seeded = state.registry.discover().await?;
    Ok(Json(json!({ "discovered": seeded })))
}

async fn registry_metrics(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let total = state.store.get("metrics:total_executions").await;
    let success = state.store.get("metrics:successful_executions").await;
    let last = state.store.get("metrics:last_execution").await;
    Ok(Json(json!({
        "total_executions": total.unwrap_or(Value::from(0)),
        "successful_executions": success.unwrap_or(Value::from(0)),
        "last_execution": last,
    })))
}

async fn recent_calls(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let keys = state.store.keys_with_prefix("call_log:").await;
    let mut logs = Vec::new();
    for key in keys {
        if let Some(v) = state.store.get(&key).await {
            logs.push(v);
        }
    }
    Ok(Json(json!({ "calls": logs })))
}

async fn tool_metrics(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let keys = state.store.keys_with_prefix("call_log:").await;
    let (mut total, mut successful, mut failed, mut blocked) = (0u64, 0u64, 0u64, 0u64);
    let mut duration_ms_sum = 0u64;
    for key in keys {
        let Some(v) = state.store.get(&key).await else {
            continue;
        };
        let Some(log) = serde_json::from_value::<crate::registry::ToolCallLog>(v).ok() else {
            continue;
        };
        if log.tool_id != id {
            continue;
        }
        total += 1;
        duration_ms_sum += log.duration_ms.unwrap_or(0);
        match log.status {
            crate::registry::CallStatus::Success => successful += 1,
            crate::registry::CallStatus::Failure => failed += 1,
            crate::registry::CallStatus::Blocked => blocked += 1,
            crate::registry::CallStatus::Pending => {}
        }
    }
    let avg_duration_ms = if total > 0 { duration_ms_sum / total } else { 0 };
    Ok(Json(json!({
        "tool_id": id,
        "total_calls": total,
        "successful_calls": successful,
        "failed_calls": failed,
        "blocked_calls": blocked,
        "avg_duration_ms": avg_duration_ms,
    })))
}

fn interactive_from(headers: &HeaderMap, query: &InteractiveQuery) -> bool {
    headers
        .get("X-Request-Source")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "ui")
        .unwrap_or(false)
        || query.context.as_deref() == Some("ui")
}

#[derive(Deserialize)]
struct InteractiveQuery {
    context: Option<String>,
}

async fn invoke_tool(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(query): Query<InteractiveQuery>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> ApiResult<Json<Value>> {
    let agent_id = headers
        .get("X-Agent-ID")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let project_id = headers
        .get("X-Project-ID")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let interactive = interactive_from(&headers, &query);
    let params = body.map(|Json(v)| v).unwrap_or(Value::Null);

    let result = state
        .invocation
        .invoke(
            &id,
            params,
            InvokeHeaders { agent_id, project_id },
            interactive,
        )
        .await?;

    state.memory.route(MemoryEvent {
        session_id: None,
        source_or_type: id.clone(),
        text: result.to_string(),
        outcome: Outcome::Success,
        is_tool_success: true,
        payload: result.clone(),
    });

    Ok(Json(result))
}

async fn launch_workflow(
    State(state): State<ApiState>,
    Json(req): Json<LaunchRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let id = state.workflows.launch_async(req).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "workflow_id": id }))))
}

async fn workflow_status(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let status = state.workflows.get_status(&id).await?;
    Ok(Json(json!({ "status": status })))
}

async fn workflow_details(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let workflow = state.workflows.get_details(&id).await?;
    Ok(Json(serde_json::to_value(workflow)?))
}

async fn workflow_pause(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let w = state.workflows.pause(&id).await?;
    Ok(Json(serde_json::to_value(w)?))
}

async fn workflow_resume(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let w = state.workflows.resume(&id).await?;
    Ok(Json(serde_json::to_value(w)?))
}

async fn workflow_cancel(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let w = state.workflows.cancel(&id).await?;
    Ok(Json(serde_json::to_value(w)?))
}

async fn list_workflows(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let active = state.workflows.list_active().await;
    Ok(Json(json!({ "active": active })))
}

async fn working_memory(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let working = state.memory.working();
    Ok(Json(json!({
        "session_id": id,
        "events": working.events(&id),
        "locals": working.locals(&id),
        "plan": working.plan(&id),
    })))
}

#[derive(Deserialize)]
struct SetLocalRequest {
    key: String,
    value: String,
}

async fn set_working_memory_local(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<SetLocalRequest>,
) -> ApiResult<StatusCode> {
    state.memory.working().set_local(&id, &req.key, req.value);
    Ok(StatusCode::OK)
}

async fn set_working_memory_plan(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(plan): Json<Value>,
) -> ApiResult<StatusCode> {
    state.memory.working().set_plan(&id, plan);
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::InvocationEngine;
    use crate::memory::{EpisodicStore, KnowledgeGraph, WorkingMemoryStore};
    use crate::store::MemoryStore;
    use crate::tools::ToolRegistry as BuiltinRegistry;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state() -> ApiState {
        let store = MemoryStore::new();
        let registry = Arc::new(ToolRegistry::new(store.clone()));
        let builtins = Arc::new(BuiltinRegistry::new());
        let admission = Arc::new(ExecutionAdmission::new(3));
        let invocation = Arc::new(InvocationEngine::new(
            registry.clone(),
            builtins,
            admission.clone(),
            store.clone(),
        ));
        let workflows = Arc::new(WorkflowOrchestrator::new(store.clone()));
        let memory = Arc::new(MemoryFanout::new(
            Arc::new(WorkingMemoryStore::default()),
            Arc::new(EpisodicStore::new()),
            Arc::new(KnowledgeGraph::new()),
        ));
        ApiState {
            registry,
            invocation,
            workflows,
            memory,
            admission,
            store,
        }
    }

    #[tokio::test]
    async fn register_then_list_then_delete_echo_tool() {
        let app = router(test_state());

        let register = Request::builder()
            .method("POST")
            .uri("/api/v1/tools")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"id": "tool_test_echo", "name": "Echo", "created_by": "agent"}).to_string(),
            ))
            .unwrap();
        let resp = app.clone().oneshot(register).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let list = Request::builder()
            .uri("/api/v1/tools")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(list).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let delete_req = Request::builder()
            .method("DELETE")
            .uri("/api/v1/tools/tool_test_echo")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(delete_req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn non_agent_tool_delete_is_rejected() {
        let app = router(test_state());

        let register = Request::builder()
            .method("POST")
            .uri("/api/v1/tools")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"id": "tool_system", "created_by": "system"}).to_string(),
            ))
            .unwrap();
        app.clone().oneshot(register).await.unwrap();

        let delete_req = Request::builder()
            .method("DELETE")
            .uri("/api/v1/tools/tool_system")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(delete_req).await.unwrap();
        assert_ne!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn working_memory_write_then_read_round_trips() {
        let app = router(test_state());

        let set_local = Request::builder()
            .method("POST")
            .uri("/api/v1/state/session/s1/locals")
            .header("content-type", "application/json")
            .body(Body::from(json!({"key": "x", "value": "1"}).to_string()))
            .unwrap();
        let resp = app.clone().oneshot(set_local).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let set_plan = Request::builder()
            .method("POST")
            .uri("/api/v1/state/session/s1/plan")
            .header("content-type", "application/json")
            .body(Body::from(json!({"steps": ["a", "b"]}).to_string()))
            .unwrap();
        let resp = app.clone().oneshot(set_plan).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let read = Request::builder()
            .uri("/api/v1/state/session/s1/working_memory")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(read).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["locals"]["x"], json!("1"));
        assert_eq!(parsed["plan"]["steps"], json!(["a", "b"]));
    }

    #[tokio::test]
    async fn tool_metrics_reflects_a_failed_invocation() {
        let app = router(test_state());

        let register = Request::builder()
            .method("POST")
            .uri("/api/v1/tools")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"id": "tool_no_exec", "created_by": "agent"}).to_string(),
            ))
            .unwrap();
        app.clone().oneshot(register).await.unwrap();

        let invoke = Request::builder()
            .method("POST")
            .uri("/api/v1/tools/tool_no_exec/invoke")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(invoke).await.unwrap();
        assert_ne!(resp.status(), StatusCode::OK);

        let metrics = Request::builder()
            .uri("/api/v1/tools/tool_no_exec/metrics")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(metrics).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["total_calls"], json!(1));
        assert_eq!(parsed["failed_calls"], json!(1));
    }
}
