use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use wayfinder_browser::Cdp;

use crate::errors::ToolError;
use crate::registry::{Tool, ToolContext};

#[derive(Deserialize)]
struct Args {
    selector: Option<String>,
    text: Option<String>,
}

const CLICK_BY_TEXT_JS: &str = r#"
(() => {
  const needle = %NEEDLE%;
  const nodes = Array.from(document.querySelectorAll('a, button, [role="button"], input[type="submit"], input[type="button"], label, span, div'));
  for (const el of nodes) {
    const text = (el.innerText || el.value || '').trim();
    if (text && text.toLowerCase().includes(needle.toLowerCase())) {
      el.click();
      return true;
    }
  }
  return false;
})()
"#;

pub struct ClickTool {
    pub deadline: Duration,
}

impl Default for ClickTool {
    fn default() -> Self {
        Self { deadline: Duration::from_millis(10_000) }
    }
}

#[async_trait]
impl<C: Cdp + Send + Sync + 'static> Tool<C> for ClickTool {
    fn name(&self) -> &'static str {
        "dom.click"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"selector": {"type": "string"}, "text": {"type": "string"}},
        })
    }

    fn output_schema(&self) -> Value {
        json!({"type": "object", "required": ["clicked"], "properties": {"clicked": {"type": "boolean"}}})
    }

    async fn execute(&self, ctx: &ToolContext<C>, args: Value) -> Result<Value, ToolError> {
        let args: Args = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidArgs(e.to_string()))?;

        if let Some(selector) = &args.selector {
            return match ctx.cdp.click(ctx.page, selector, self.deadline).await {
                Ok(()) => Ok(json!({"clicked": true})),
                Err(e) => Ok(json!({"clicked": false, "reason": e.to_string()})),
            };
        }

        let Some(text) = args.text else {
            return Err(ToolError::InvalidArgs("neither selector nor text provided".into()));
        };

        let needle = serde_json::to_string(&text).unwrap_or_else(|_| "\"\"".to_string());
        let script = CLICK_BY_TEXT_JS.replace("%NEEDLE%", &needle);
        let result = ctx
            .cdp
            .evaluate_script(ctx.page, &script)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let clicked = result.as_bool().unwrap_or(false);
        Ok(json!({"clicked": clicked}))
    }
}
