use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};
use wayfinder_browser::{Cdp, PageId};
use wayfinder_extract::SemanticValidator;
use wayfinder_formfill::llm::FieldLlm;
use wayfinder_types::model::FieldDescriptor;

use crate::errors::{ToolError, ToolErrorPayload};

/// Everything a tool needs to act on the current page, threaded through by
/// the registry rather than owned by any one tool. Cheap to clone: the
/// adapter handle and the LLM clients are `Arc`-wrapped.
pub struct ToolContext<C: Cdp + Send + Sync + 'static> {
    pub cdp: Arc<C>,
    pub page: PageId,
    pub run_dir: PathBuf,
    pub site_domain: String,
    pub instruction: String,
    pub field_llm: Arc<dyn FieldLlm>,
    pub semantic_validator: Option<Arc<dyn SemanticValidator>>,
    pub tool_timeout: Duration,
    pub max_same_error: u32,
    pub submit_wait_ms: u64,
    pub current_form_fields: Vec<FieldDescriptor>,
}

impl<C: Cdp + Send + Sync + 'static> ToolContext<C> {
    pub fn new(
        cdp: Arc<C>,
        page: PageId,
        run_dir: PathBuf,
        site_domain: impl Into<String>,
        instruction: impl Into<String>,
        field_llm: Arc<dyn FieldLlm>,
    ) -> Self {
        Self {
            cdp,
            page,
            run_dir,
            site_domain: site_domain.into(),
            instruction: instruction.into(),
            field_llm,
            semantic_validator: None,
            tool_timeout: Duration::from_millis(15_000),
            max_same_error: 2,
            submit_wait_ms: 1_500,
            current_form_fields: Vec::new(),
        }
    }

    pub fn with_semantic_validator(mut self, validator: Arc<dyn SemanticValidator>) -> Self {
        self.semantic_validator = Some(validator);
        self
    }

    /// Overrides the per-tool timeout, stall-retry cutoff, and submit-wait
    /// defaults with the caller's configured `RunOptions` (spec.md §6:
    /// `step_timeout_ms`, `max_same_error`, `submit_wait_ms`).
    pub fn with_timeouts(mut self, tool_timeout: Duration, max_same_error: u32, submit_wait_ms: u64) -> Self {
        self.tool_timeout = tool_timeout;
        self.max_same_error = max_same_error;
        self.submit_wait_ms = submit_wait_ms;
        self
    }
}

/// A named, schema-checked side-effectful operation on the page. Tools never
/// see the planner's JSON directly; the registry deserializes `args` against
/// `input_schema` before `execute` is called.
#[async_trait]
pub trait Tool<C: Cdp + Send + Sync + 'static>: Send + Sync {
    fn name(&self) -> &'static str;
    fn input_schema(&self) -> Value;
    fn output_schema(&self) -> Value;
    async fn execute(&self, ctx: &ToolContext<C>, args: Value) -> Result<Value, ToolError>;
}

/// Maps tool names to their implementations and enforces the per-tool
/// timeout and the `{error: {kind, message}}` boundary shape on every
/// invocation, so a planner never has to distinguish "tool panicked",
/// "tool timed out", and "tool returned a typed failure".
pub struct ToolRegistry<C: Cdp + Send + Sync + 'static> {
    tools: HashMap<&'static str, Arc<dyn Tool<C>>>,
}

impl<C: Cdp + Send + Sync + 'static> Default for ToolRegistry<C> {
    fn default() -> Self {
        Self { tools: HashMap::new() }
    }
}

impl<C: Cdp + Send + Sync + 'static> ToolRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool<C>>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    pub fn schema_for(&self, name: &str) -> Option<(Value, Value)> {
        self.tools
            .get(name)
            .map(|t| (t.input_schema(), t.output_schema()))
    }

    /// Invokes `name` with `args`, always returning a JSON value: either the
    /// tool's own successful payload, or `{"error": {kind, message}}`. Never
    /// returns `Err` so callers can log and move on without a match arm per
    /// failure mode.
    pub async fn invoke(&self, ctx: &ToolContext<C>, name: &str, args: Value) -> Value {
        let Some(tool) = self.tools.get(name) else {
            let err = ToolError::UnknownTool(name.to_string());
            warn!(tool = name, "unknown tool requested");
            return error_payload(&err);
        };

        let timeout_ms = ctx.tool_timeout.as_millis() as u64;
        let fut = tool.execute(ctx, args);
        match tokio::time::timeout(ctx.tool_timeout, fut).await {
            Ok(Ok(value)) => {
                info!(tool = name, "tool completed");
                value
            }
            Ok(Err(err)) => {
                warn!(tool = name, error = %err, "tool failed");
                error_payload(&err)
            }
            Err(_) => {
                let err = ToolError::Timeout(timeout_ms);
                warn!(tool = name, timeout_ms, "tool timed out");
                error_payload(&err)
            }
        }
    }
}

fn error_payload(err: &ToolError) -> Value {
    let payload = ToolErrorPayload::from(err);
    serde_json::json!({ "error": payload })
}
