use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use wayfinder_browser::Cdp;

use crate::errors::ToolError;
use crate::registry::{Tool, ToolContext};

#[derive(Deserialize)]
struct Args {
    url: String,
}

pub struct NavigateTool {
    pub deadline: Duration,
}

impl Default for NavigateTool {
    fn default() -> Self {
        Self { deadline: Duration::from_millis(20_000) }
    }
}

#[async_trait]
impl<C: Cdp + Send + Sync + 'static> Tool<C> for NavigateTool {
    fn name(&self) -> &'static str {
        "dom.navigate"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "required": ["url"], "properties": {"url": {"type": "string"}}})
    }

    fn output_schema(&self) -> Value {
        json!({"type": "object", "properties": {"url": {"type": "string"}, "title": {"type": "string"}}})
    }

    async fn execute(&self, ctx: &ToolContext<C>, args: Value) -> Result<Value, ToolError> {
        let args: Args = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidArgs(e.to_string()))?;

        ctx.cdp
            .navigate(ctx.page, &args.url, self.deadline)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let title = ctx
            .cdp
            .evaluate_script(ctx.page, "document.title")
            .await
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();

        Ok(json!({"url": args.url, "title": title}))
    }
}
