use thiserror::Error;

/// Errors surfaced by an [`crate::LlmClient`]. Callers classify these against
/// spec.md §7's taxonomy: a timeout or transport hiccup is a `Transient`
/// failure the caller retries; an unreachable backend after the retry budget
/// is exhausted becomes `External`.
#[derive(Debug, Error, Clone)]
pub enum LlmError {
    #[error("llm request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("llm backend unreachable: {0}")]
    Unreachable(String),

    #[error("llm backend returned an error: {0}")]
    Backend(String),

    #[error("vision invocation not supported by this client")]
    VisionUnsupported,
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Timeout(_) | LlmError::Unreachable(_))
    }
}
