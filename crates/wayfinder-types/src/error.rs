//! Five-kind error taxonomy shared across the workspace (spec.md §7).

use thiserror::Error;

use crate::model::ErrorKind;

#[derive(Debug, Error, Clone)]
pub enum WayfinderError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("external failure: {0}")]
    External(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("planner failure: {0}")]
    Planner(String),

    #[error("partial success: {0}")]
    PartialSuccess(String),
}

impl WayfinderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WayfinderError::Configuration(_) => ErrorKind::Configuration,
            WayfinderError::External(_) => ErrorKind::External,
            WayfinderError::Transient(_) => ErrorKind::Transient,
            WayfinderError::Planner(_) => ErrorKind::Planner,
            WayfinderError::PartialSuccess(_) => ErrorKind::PartialSuccess,
        }
    }

    pub fn message(&self) -> String {
        match self {
            WayfinderError::Configuration(m)
            | WayfinderError::External(m)
            | WayfinderError::Transient(m)
            | WayfinderError::Planner(m)
            | WayfinderError::PartialSuccess(m) => m.clone(),
        }
    }

    /// A short remediation hint, surfaced in `TaskResult::error::suggestion`.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            WayfinderError::External(m) if m.contains("LLM") => {
                Some("check that the configured LLM backend is reachable".to_string())
            }
            WayfinderError::External(m) if m.contains("navigat") => {
                Some("verify the URL is reachable and not blocked by the network".to_string())
            }
            WayfinderError::Configuration(_) => {
                Some("check the run options / environment configuration".to_string())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let err = WayfinderError::Transient("timeout".into());
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[test]
    fn external_llm_error_has_suggestion() {
        let err = WayfinderError::External("LLM backend not responding".into());
        assert!(err.suggestion().unwrap().contains("LLM backend"));
    }
}
