use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use wayfinder_browser::Cdp;

use crate::errors::ToolError;
use crate::registry::{Tool, ToolContext};

#[derive(Deserialize, Default)]
struct Args {
    #[serde(default)]
    full: bool,
}

pub struct ScreenshotTool {
    pub deadline: Duration,
}

impl Default for ScreenshotTool {
    fn default() -> Self {
        Self { deadline: Duration::from_millis(10_000) }
    }
}

#[async_trait]
impl<C: Cdp + Send + Sync + 'static> Tool<C> for ScreenshotTool {
    fn name(&self) -> &'static str {
        "dom.screenshot"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {"full": {"type": "boolean"}}})
    }

    fn output_schema(&self) -> Value {
        json!({"type": "object", "required": ["path"], "properties": {"path": {"type": "string"}}})
    }

    async fn execute(&self, ctx: &ToolContext<C>, args: Value) -> Result<Value, ToolError> {
        let _args: Args = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidArgs(e.to_string()))?;

        let bytes = ctx
            .cdp
            .screenshot(ctx.page, self.deadline)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let file_name = format!("screenshot-{}.png", ctx.page.0);
        let path = ctx.run_dir.join(&file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ToolError::Execution(format!("writing {}: {e}", path.display())))?;

        Ok(json!({"path": path.display().to_string()}))
    }
}
