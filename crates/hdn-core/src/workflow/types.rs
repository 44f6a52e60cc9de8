//! Workflow record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
    Paused,
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub stored_content_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub name: String,
    pub status: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub task_name: String,
    pub description: String,
    pub status: WorkflowStatus,
    pub progress: u8,
    pub steps: Vec<WorkflowStep>,
    pub files: Vec<ArtifactDescriptor>,
    pub project_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error: Option<String>,
    /// Hints supplied at launch that `complete()` consults when
    /// materializing result artifacts (explicit filename, extra artifact
    /// names, a PDF summary request).
    #[serde(default)]
    pub context_hints: Option<Value>,
}

impl Workflow {
    pub fn new(
        id: impl Into<String>,
        task_name: impl Into<String>,
        description: impl Into<String>,
        context_hints: Option<Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            task_name: task_name.into(),
            description: description.into(),
            status: WorkflowStatus::Running,
            progress: 0,
            steps: Vec::new(),
            files: Vec::new(),
            project_id: None,
            started_at: now,
            updated_at: now,
            error: None,
            context_hints,
        }
    }

    /// Merge completion fields into `self` without discarding artifacts
    /// written concurrently during execution.
    pub fn merge_completion(&mut self, status: WorkflowStatus, progress: u8, error: Option<String>) {
        self.status = status;
        self.progress = progress;
        self.error = error;
        self.touch();
    }

    pub fn add_artifact(&mut self, artifact: ArtifactDescriptor) {
        self.files.push(artifact);
        self.touch();
    }

    fn touch(&mut self) {
        let now = Utc::now();
        // updated_at is monotonically non-decreasing.
        self.updated_at = now.max(self.updated_at);
    }
}

/// Launch request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchRequest {
    pub task_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub hierarchical_id: Option<String>,
    #[serde(default)]
    pub goal_id: Option<String>,
    #[serde(default)]
    pub context_hints: Option<Value>,
}
