use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("dom signal scan failed: {0}")]
    DomScan(String),
    #[error("llm validation failed: {0}")]
    Llm(String),
}
