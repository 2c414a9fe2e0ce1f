//! The LLM-backend contract of spec.md §6: [`LlmClient`] is the uniform
//! text/vision interface every other `wayfinder-*` crate consults through,
//! [`http::HttpLlmClient`] the `reqwest`-backed reference implementation,
//! and [`json_repair`] the shared "ask for JSON, survive a bad reply" logic
//! the hierarchical planner, the per-field form filler, and the semantic
//! validator all lean on.

pub mod client;
pub mod errors;
pub mod http;
pub mod json_repair;

pub use client::{invoke_with_retry, LlmClient, LlmOptions, MockLlmClient};
pub use errors::LlmError;
pub use http::{HttpLlmClient, HttpLlmClientConfig};
