use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use wayfinder_browser::Cdp;

use crate::errors::ToolError;
use crate::registry::{Tool, ToolContext};

const COLLECT_LINKS_JS: &str = r#"
(() => {
  const anchors = Array.from(document.querySelectorAll('a[href]'));
  return anchors
    .map(a => ({ text: (a.innerText || '').trim(), href: a.href }))
    .filter(l => l.href && !l.href.startsWith('javascript:'));
})()
"#;

#[derive(Deserialize, Serialize, Clone)]
struct Link {
    text: String,
    href: String,
}

#[derive(Default)]
pub struct ExtractLinksTool;

#[async_trait]
impl<C: Cdp + Send + Sync + 'static> Tool<C> for ExtractLinksTool {
    fn name(&self) -> &'static str {
        "extract.links"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object"})
    }

    fn output_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["links"],
            "properties": {
                "links": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {"text": {"type": "string"}, "href": {"type": "string"}},
                    },
                },
            },
        })
    }

    async fn execute(&self, ctx: &ToolContext<C>, _args: Value) -> Result<Value, ToolError> {
        let raw = ctx
            .cdp
            .evaluate_script(ctx.page, COLLECT_LINKS_JS)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let links: Vec<Link> = serde_json::from_value(raw)
            .map_err(|e| ToolError::Execution(format!("unexpected link collection shape: {e}")))?;

        Ok(json!({"links": links}))
    }
}
