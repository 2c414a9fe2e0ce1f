use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything a [`crate::registry::Tool`] can go wrong in. The registry
/// boundary converts this, and any panic-free failure inside `execute`, into
/// the `{error: {kind, message}}` shape spec.md §4.6/§7 requires — tools
/// never raise past the registry.
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("tool timed out after {0}ms")]
    Timeout(u64),

    #[error("{0}")]
    Execution(String),
}

/// The on-the-wire error payload embedded in a tool's JSON result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolErrorPayload {
    pub kind: &'static str,
    pub message: String,
}

impl From<&ToolError> for ToolErrorPayload {
    fn from(err: &ToolError) -> Self {
        let kind = match err {
            ToolError::UnknownTool(_) => "configuration",
            ToolError::InvalidArgs(_) => "configuration",
            ToolError::Timeout(_) => "transient",
            ToolError::Execution(_) => "external",
        };
        Self { kind, message: err.to_string() }
    }
}
