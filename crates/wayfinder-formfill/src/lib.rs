//! Per-field form filler with LLM-guided values and adaptive validation
//! retry (spec.md §4.5).
//!
//! [`filler::PerFieldFormFiller`] is the entry point; the sibling modules
//! hold the pure decision logic the filler drives: field ordering
//! ([`priority`]), DOM JS snippets ([`dom_ops`]), validation-error detection
//! ([`validation`]), email/default remediation ([`remediation`]), the
//! consent checkbox heuristic ([`consent`]), submit detection ([`submit`]),
//! and the LLM prompt/response contract ([`llm`]).

pub mod consent;
pub mod dom_ops;
pub mod errors;
pub mod filler;
pub mod llm;
pub mod priority;
pub mod remediation;
pub mod submit;
pub mod validation;

pub use errors::FormFillError;
pub use filler::PerFieldFormFiller;
pub use llm::{build_prompt, parse_decision, FieldDecision, FieldLlm};
