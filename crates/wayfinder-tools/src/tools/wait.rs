use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use wayfinder_browser::Cdp;

use crate::errors::ToolError;
use crate::registry::{Tool, ToolContext};

#[derive(Deserialize, Default)]
struct Args {
    ms: Option<u64>,
    selector: Option<String>,
    timeout: Option<u64>,
}

#[derive(Default)]
pub struct WaitTool;

#[async_trait]
impl<C: Cdp + Send + Sync + 'static> Tool<C> for WaitTool {
    fn name(&self) -> &'static str {
        "dom.wait"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ms": {"type": "integer"},
                "selector": {"type": "string"},
                "timeout": {"type": "integer"},
            },
        })
    }

    fn output_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn execute(&self, ctx: &ToolContext<C>, args: Value) -> Result<Value, ToolError> {
        let args: Args = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidArgs(e.to_string()))?;

        if let Some(selector) = args.selector {
            let timeout = Duration::from_millis(args.timeout.unwrap_or(10_000));
            ctx.cdp
                .wait_basic(ctx.page, format!("selector:{selector}"), timeout)
                .await
                .map_err(|e| ToolError::Execution(e.to_string()))?;
            return Ok(json!({}));
        }

        let ms = args.ms.unwrap_or(1_000);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(json!({}))
    }
}
