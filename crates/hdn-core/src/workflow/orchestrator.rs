//! Workflow Orchestrator (C5): launch, status, pause/resume/cancel, and the
//! hierarchical <-> intelligent id mapping.

use std::sync::{Arc, atomic::{AtomicU64, Ordering}};

use base64::Engine;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::workflow::types::{ArtifactDescriptor, LaunchRequest, Workflow, WorkflowStatus};

const ACTIVE_SET_KEY: &str = "active_workflows";

fn workflow_key(id: &str) -> String {
    format!("workflow:{id}")
}

fn mapping_key(hierarchical_id: &str) -> String {
    format!("workflow_mapping:{hierarchical_id}")
}

fn reverse_mapping_key(intelligent_id: &str) -> String {
    format!("workflow_mapping_reverse:{intelligent_id}")
}

fn project_key(workflow_id: &str) -> String {
    format!("workflow_project:{workflow_id}")
}

fn artifact_content_key(stored_content_id: &str) -> String {
    format!("artifact_content:{stored_content_id}")
}

/// Filesystem-safe slug for a task name, used as part of a timestamped
/// artifact filename.
fn slug(text: &str) -> String {
    let slug: String = text
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "task".to_string()
    } else {
        slug
    }
}

fn guess_content_type(filename: &str) -> String {
    match filename.rsplit('.').next().unwrap_or("").to_lowercase().as_str() {
        "txt" | "log" => "text/plain",
        "json" => "application/json",
        "csv" => "text/csv",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "pdf" => "application/pdf",
        "html" => "text/html",
        _ => "application/octet-stream",
    }
    .to_string()
}

pub struct WorkflowOrchestrator {
    store: Arc<dyn Store>,
    intelligent_seq: AtomicU64,
    goal_manager_url: Option<String>,
}

impl WorkflowOrchestrator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            intelligent_seq: AtomicU64::new(1),
            goal_manager_url: std::env::var("GOAL_MANAGER_URL").ok(),
        }
    }

    /// `launch_async(request) -> workflow_id`. Persists an initial record
    /// (running, progress 0, empty steps/files) and returns its stable id.
    pub async fn launch_async(&self, request: LaunchRequest) -> Result<String> {
        let stable_id = request
            .hierarchical_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let workflow = Workflow::new(
            stable_id.clone(),
            request.task_name,
            request.description,
            request.context_hints.clone(),
        );
        self.store
            .set(&workflow_key(&stable_id), serde_json::to_value(&workflow)?)
            .await;
        self.store.set_add(ACTIVE_SET_KEY, &stable_id).await;

        if request.hierarchical_id.is_some() {
            let n = self.intelligent_seq.fetch_add(1, Ordering::SeqCst);
            let intelligent_id = format!("intelligent_{n}");
            self.store
                .set(&mapping_key(&stable_id), Value::String(intelligent_id.clone()))
                .await;
            self.store
                .set(&reverse_mapping_key(&intelligent_id), Value::String(stable_id.clone()))
                .await;
        }

        if let Some(project_id) = &request.project_id {
            self.link_project(&stable_id, project_id).await;
        }

        tracing::debug!(workflow_id = %stable_id, "workflow launched");
        Ok(stable_id)
    }

    /// `resolve(id)`: hierarchical and intelligent ids are inverses of each
    /// other when a mapping exists; both forms resolve to the same stable
    /// storage key.
    pub async fn resolve(&self, id: &str) -> String {
        if let Some(Value::String(hierarchical)) = self.store.get(&reverse_mapping_key(id)).await {
            return hierarchical;
        }
        id.to_string()
    }

    pub async fn get_status(&self, id: &str) -> Result<WorkflowStatus> {
        Ok(self.get_details(id).await?.status)
    }

    pub async fn get_details(&self, id: &str) -> Result<Workflow> {
        let resolved = self.resolve(id).await;
        let v = self
            .store
            .get(&workflow_key(&resolved))
            .await
            .ok_or_else(|| Error::NotFound(format!("workflow {id} not found")))?;
        Ok(serde_json::from_value(v)?)
    }

    async fn update<F>(&self, id: &str, f: F) -> Result<Workflow>
    where
        F: FnOnce(&mut Workflow),
    {
        let resolved = self.resolve(id).await;
        let mut workflow = self.get_details(&resolved).await?;
        f(&mut workflow);
        self.store
            .set(&workflow_key(&resolved), serde_json::to_value(&workflow)?)
            .await;
        if workflow.status.is_terminal() {
            self.store.set_remove(ACTIVE_SET_KEY, &resolved).await;
        }
        Ok(workflow)
    }

    pub async fn pause(&self, id: &str) -> Result<Workflow> {
        self.update(id, |w| {
            if w.status == WorkflowStatus::Running {
                w.merge_completion(WorkflowStatus::Paused, w.progress, None);
            }
        })
        .await
    }

    pub async fn resume(&self, id: &str) -> Result<Workflow> {
        self.update(id, |w| {
            if w.status == WorkflowStatus::Paused {
                w.merge_completion(WorkflowStatus::Running, w.progress, None);
            }
        })
        .await
    }

    /// Cancel is advisory: status transitions to `cancelled` regardless of
    /// whether any in-flight subprocess has exited.
    pub async fn cancel(&self, id: &str) -> Result<Workflow> {
        self.update(id, |w| {
            if !w.status.is_terminal() {
                w.merge_completion(WorkflowStatus::Cancelled, w.progress, None);
            }
        })
        .await
    }

    pub async fn list_active(&self) -> Vec<String> {
        self.store.set_members(ACTIVE_SET_KEY).await
    }

    async fn link_project(&self, workflow_id: &str, project_name: &str) {
        // Idempotent by name: the project id is derived deterministically
        // from its name rather than allocated, so repeated links agree.
        let project_id = format!("project_{project_name}");
        self.store
            .set(&project_key(workflow_id), Value::String(project_id))
            .await;
    }

    /// Completion merges fields into the existing record (preserving
    /// artifacts written during execution), links the workflow to a
    /// project, stores a generated-source artifact and the run's textual
    /// result, optionally materializes extra artifacts declared by
    /// `context_hints` at launch, and fires an auto-achieve call when
    /// eligible.
    ///
    /// `result_text` is the mandatory textual-result artifact: whenever
    /// present it is stored under a unique, task-and-time-stamped filename
    /// so results from different tasks never collide.
    pub async fn complete(
        &self,
        id: &str,
        success: bool,
        error: Option<String>,
        project_name: Option<&str>,
        generated_source: Option<(&str, &str)>, // (language, source)
        result_text: Option<&str>,
        goal_id: Option<&str>,
    ) -> Result<Workflow> {
        let resolved = self.resolve(id).await;
        let status = if success {
            WorkflowStatus::Completed
        } else {
            WorkflowStatus::Failed
        };

        let workflow = self
            .update(&resolved, |w| {
                w.merge_completion(status, 100, error);
            })
            .await?;

        if let Some(name) = project_name {
            self.link_project(&resolved, name).await;
        }

        let context_hints = workflow.context_hints.clone();
        let explicit_filename = context_hints
            .as_ref()
            .and_then(|h| h.get("filename"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut artifact_written = false;

        if let Some((language, source)) = generated_source {
            let filename =
                explicit_filename.unwrap_or_else(|| format!("main.{}", source_extension(language)));
            let artifact = ArtifactDescriptor {
                filename,
                content_type: "text/plain".to_string(),
                size: source.len() as u64,
                stored_content_id: uuid::Uuid::new_v4().to_string(),
                created_at: chrono::Utc::now(),
            };
            self.update(&resolved, |w| w.add_artifact(artifact)).await?;
            artifact_written = true;
        }

        if let Some(text) = result_text {
            let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f");
            let filename = format!("{}-{}-result.txt", slug(&workflow.task_name), stamp);
            let stored_content_id = uuid::Uuid::new_v4().to_string();
            self.store
                .set(&artifact_content_key(&stored_content_id), Value::String(text.to_string()))
                .await;
            let artifact = ArtifactDescriptor {
                filename,
                content_type: "text/plain".to_string(),
                size: text.len() as u64,
                stored_content_id,
                created_at: chrono::Utc::now(),
            };
            self.update(&resolved, |w| w.add_artifact(artifact)).await?;
            artifact_written = true;
        }

        if let Some(hints) = &context_hints {
            if let Some(names) = hints.get("extra_artifacts").and_then(Value::as_array) {
                for name in names.iter().filter_map(Value::as_str) {
                    let artifact = ArtifactDescriptor {
                        filename: name.to_string(),
                        content_type: guess_content_type(name),
                        size: 0,
                        stored_content_id: uuid::Uuid::new_v4().to_string(),
                        created_at: chrono::Utc::now(),
                    };
                    self.update(&resolved, |w| w.add_artifact(artifact)).await?;
                    artifact_written = true;
                }
            }

            let wants_pdf_summary = match hints.get("pdf_summary") {
                Some(Value::Bool(b)) => *b,
                Some(Value::String(s)) => !s.is_empty(),
                _ => false,
            };
            if wants_pdf_summary {
                if let Some(artifact) = self.render_pdf_summary(&workflow).await {
                    self.update(&resolved, |w| w.add_artifact(artifact)).await?;
                    artifact_written = true;
                }
            }
        }

        if success && artifact_written {
            if let Some(goal_id) = goal_id {
                self.auto_achieve(goal_id).await;
            }
        }

        self.get_details(&resolved).await.or(Ok(workflow))
    }

    /// Renders a one-page PDF summary of the workflow's outcome. Best-effort:
    /// if no usable system font is found, logs a warning and returns `None`
    /// rather than failing completion.
    async fn render_pdf_summary(&self, workflow: &Workflow) -> Option<ArtifactDescriptor> {
        let task_name = workflow.task_name.clone();
        let status = format!("{:?}", workflow.status);
        let error = workflow.error.clone();

        let bytes = match tokio::task::spawn_blocking(move || {
            render_summary_pdf(&task_name, &status, error.as_deref())
        })
        .await
        {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "pdf summary rendering failed; skipping");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "pdf summary render task panicked; skipping");
                return None;
            }
        };

        let stored_content_id = uuid::Uuid::new_v4().to_string();
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        self.store
            .set(&artifact_content_key(&stored_content_id), Value::String(encoded))
            .await;

        Some(ArtifactDescriptor {
            filename: "summary.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size: bytes.len() as u64,
            stored_content_id,
            created_at: chrono::Utc::now(),
        })
    }

    /// Best-effort auto-achieve call to the goal service; failures are
    /// logged, never propagated (matching the memory fan-out's posture).
    async fn auto_achieve(&self, goal_id: &str) {
        let Some(base_url) = &self.goal_manager_url else {
            return;
        };
        let url = format!("{base_url}/api/v1/goals/{goal_id}/achieve");
        let client = reqwest::Client::new();
        if let Err(e) = client.post(&url).send().await {
            tracing::warn!(goal_id, error = %e, "auto-achieve call failed");
        }
    }
}

/// Renders a minimal outcome summary to PDF bytes in-memory. Mirrors the
/// teacher's document-export font-discovery fallback chain, since this
/// process has no guaranteed font directory.
fn render_summary_pdf(task_name: &str, status: &str, error: Option<&str>) -> anyhow::Result<Vec<u8>> {
    use genpdf::{elements, fonts, style, Document};

    let font_family = fonts::from_files("/usr/share/fonts/truetype/dejavu", "DejaVuSans", None)
        .or_else(|_| fonts::from_files("/usr/share/fonts/truetype/liberation", "LiberationSans", None))
        .or_else(|_| fonts::from_files("/System/Library/Fonts", "Helvetica", None))
        .or_else(|_| fonts::from_files("C:\\Windows\\Fonts", "arial", None))
        .map_err(|e| anyhow::anyhow!("no suitable font found for pdf rendering: {e}"))?;

    let mut doc = Document::new(font_family);
    doc.set_title(task_name);

    let title_style = style::Style::new().with_font_size(18).bold();
    doc.push(elements::Paragraph::new(task_name).styled(title_style));
    doc.push(elements::Break::new(1));
    doc.push(elements::Paragraph::new(format!("Status: {status}")));
    if let Some(error) = error {
        doc.push(elements::Paragraph::new(format!("Error: {error}")));
    }

    let mut bytes = Vec::new();
    doc.render(&mut bytes)?;
    Ok(bytes)
}

fn source_extension(language: &str) -> &'static str {
    match language.to_lowercase().as_str() {
        "python" => "py",
        "javascript" | "node" => "js",
        "go" => "go",
        "java" => "java",
        "bash" | "shell" => "sh",
        _ => "txt",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn orchestrator() -> WorkflowOrchestrator {
        WorkflowOrchestrator::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn launch_then_complete_preserves_artifacts_written_during_execution() {
        let orchestrator = orchestrator();
        let id = orchestrator
            .launch_async(LaunchRequest {
                task_name: "demo".to_string(),
                description: String::new(),
                project_id: None,
                hierarchical_id: None,
                goal_id: None,
                context_hints: None,
            })
            .await
            .unwrap();

        // An artifact written mid-execution (simulated directly).
        orchestrator
            .update(&id, |w| {
                w.add_artifact(ArtifactDescriptor {
                    filename: "progress.log".to_string(),
                    content_type: "text/plain".to_string(),
                    size: 3,
                    stored_content_id: "abc".to_string(),
                    created_at: chrono::Utc::now(),
                })
            })
            .await
            .unwrap();

        let workflow = orchestrator
            .complete(&id, true, None, None, Some(("python", "print(1)")), None, None)
            .await
            .unwrap();

        assert_eq!(workflow.status, WorkflowStatus::Completed);
        assert_eq!(workflow.files.len(), 2);
    }

    #[tokio::test]
    async fn hierarchical_and_intelligent_ids_are_inverses() {
        let orchestrator = orchestrator();
        let hierarchical_id = "h-1".to_string();
        orchestrator
            .launch_async(LaunchRequest {
                task_name: "demo".to_string(),
                description: String::new(),
                project_id: None,
                hierarchical_id: Some(hierarchical_id.clone()),
                goal_id: None,
                context_hints: None,
            })
            .await
            .unwrap();

        let Value::String(intelligent_id) = orchestrator
            .store
            .get(&mapping_key(&hierarchical_id))
            .await
            .unwrap()
        else {
            panic!("expected string mapping");
        };

        assert_eq!(orchestrator.resolve(&intelligent_id).await, hierarchical_id);
        assert_eq!(orchestrator.resolve(&hierarchical_id).await, hierarchical_id);
    }

    #[tokio::test]
    async fn cancel_is_terminal_and_removes_from_active_set() {
        let orchestrator = orchestrator();
        let id = orchestrator
            .launch_async(LaunchRequest {
                task_name: "demo".to_string(),
                description: String::new(),
                project_id: None,
                hierarchical_id: None,
                goal_id: None,
                context_hints: None,
            })
            .await
            .unwrap();

        assert!(orchestrator.list_active().await.contains(&id));
        orchestrator.cancel(&id).await.unwrap();
        assert!(!orchestrator.list_active().await.contains(&id));
        assert_eq!(orchestrator.get_status(&id).await.unwrap(), WorkflowStatus::Cancelled);
    }

    #[tokio::test]
    async fn completion_stores_textual_result_under_a_timestamped_name() {
        let orchestrator = orchestrator();
        let id = orchestrator
            .launch_async(LaunchRequest {
                task_name: "nightly report".to_string(),
                description: String::new(),
                project_id: None,
                hierarchical_id: None,
                goal_id: None,
                context_hints: None,
            })
            .await
            .unwrap();

        let workflow = orchestrator
            .complete(&id, true, None, None, None, Some("the final answer is 42"), None)
            .await
            .unwrap();

        assert_eq!(workflow.files.len(), 1);
        let artifact = &workflow.files[0];
        assert!(artifact.filename.starts_with("nightly-report-"));
        assert!(artifact.filename.ends_with("-result.txt"));
        assert_eq!(artifact.size, "the final answer is 42".len() as u64);

        let stored = orchestrator
            .store
            .get(&artifact_content_key(&artifact.stored_content_id))
            .await
            .unwrap();
        assert_eq!(stored, Value::String("the final answer is 42".to_string()));
    }

    #[tokio::test]
    async fn context_hints_override_filename_and_add_extra_artifacts() {
        let orchestrator = orchestrator();
        let id = orchestrator
            .launch_async(LaunchRequest {
                task_name: "demo".to_string(),
                description: String::new(),
                project_id: None,
                hierarchical_id: None,
                goal_id: None,
                context_hints: Some(serde_json::json!({
                    "filename": "solution.py",
                    "extra_artifacts": ["chart.png", "notes.txt"],
                })),
            })
            .await
            .unwrap();

        let workflow = orchestrator
            .complete(&id, true, None, None, Some(("python", "print(1)")), None, None)
            .await
            .unwrap();

        assert!(workflow.files.iter().any(|f| f.filename == "solution.py"));
        assert!(workflow.files.iter().any(|f| f.filename == "chart.png" && f.content_type == "image/png"));
        assert!(workflow.files.iter().any(|f| f.filename == "notes.txt"));
    }
}
