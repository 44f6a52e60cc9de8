//! Error types for the HDN execution service core.
//!
//! Each variant maps to a stable HTTP status in [`Error::status_code`], so
//! clients see a consistent status code plus a JSON error envelope
//! regardless of which subsystem raised the error.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing/invalid id, missing required param. 400.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown tool, file, or workflow. 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// Policy gate, permission filter, or non-agent delete. 403.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Duplicate id where uniqueness is required.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Tool lacks an execution spec and no built-in matches. 501.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Admission rejection. 429.
    #[error("overloaded: {0}")]
    Overloaded(String),

    /// Remote shell, sandbox, or store failure. 500.
    #[error("backend failure: {0}")]
    BackendFailure(String),

    /// Cooperative cancellation.
    #[error("cancelled")]
    Cancelled,

    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// HTTP status for the REST surface. A pure function of the variant.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidArgument(_) => 400,
            Error::NotFound(_) => 404,
            Error::PermissionDenied(_) => 403,
            Error::Conflict(_) => 409,
            Error::NotImplemented(_) => 501,
            Error::Overloaded(_) => 429,
            Error::BackendFailure(_) => 500,
            Error::Cancelled => 499,
            Error::Tool(e) => e.status_code(),
            Error::Config(_) | Error::Io(_) | Error::Serialization(_) => 500,
        }
    }
}

#[cfg(feature = "sandbox")]
impl From<hdn_sandbox::SandboxError> for Error {
    fn from(e: hdn_sandbox::SandboxError) -> Self {
        Error::BackendFailure(e.to_string())
    }
}

#[cfg(feature = "mcp")]
impl From<hdn_mcp::McpError> for Error {
    fn from(e: hdn_mcp::McpError) -> Self {
        Error::BackendFailure(e.to_string())
    }
}

/// Tool-specific errors, propagated into [`Error::Tool`] at the invocation
/// boundary.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("rejected by user: {0}")]
    Rejected(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    pub fn status_code(&self) -> u16 {
        match self {
            ToolError::NotFound(_) | ToolError::ResourceNotFound(_) => 404,
            ToolError::InvalidParams(_) => 400,
            ToolError::PermissionDenied(_) | ToolError::Rejected(_) => 403,
            ToolError::NotImplemented(_) => 501,
            ToolError::ExecutionFailed(_) | ToolError::Io(_) => 500,
        }
    }
}
