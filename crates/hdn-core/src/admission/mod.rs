//! Admission Controller: bounds concurrent tool execution and arbitrates
//! LLM request priority.

pub mod execution_slots;
pub mod llm_queue;

pub use execution_slots::{ExecutionAdmission, ExecutionPermit};
pub use llm_queue::{LlmPriority, LlmQueue, LlmTicketGuard};
