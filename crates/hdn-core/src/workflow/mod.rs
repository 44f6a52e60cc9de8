//! Workflow Orchestrator: launches, tracks, and transitions workflows
//! through their state machine.

pub mod orchestrator;
pub mod types;

pub use orchestrator::WorkflowOrchestrator;
pub use types::{ArtifactDescriptor, LaunchRequest, Workflow, WorkflowStatus, WorkflowStep};
