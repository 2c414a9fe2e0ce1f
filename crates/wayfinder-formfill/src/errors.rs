use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormFillError {
    #[error("dom interaction failed: {0}")]
    Dom(String),
    #[error("llm invocation failed: {0}")]
    Llm(String),
}
