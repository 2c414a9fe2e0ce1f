///! Semantic analysis used by the Hierarchical Planner's Level 1 step.
///!
///! - Content type classification (`page_type`: form / product_listing /
///!   article / other), used directly by `wayfinder-planner`.
///! - Lightweight language detection, keyword extraction, and summarization
///!   used by the Run Logger and the Iterative Extractor's candidate
///!   sample-text payloads.
pub mod classifier;
pub mod errors;
pub mod keywords;
pub mod language;
pub mod models;
pub mod summarizer;

pub use classifier::Classifier;
pub use errors::{Result, SemanticError};
pub use keywords::KeywordExtractor;
pub use language::LanguageDetector;
pub use models::*;
pub use summarizer::Summarizer;
