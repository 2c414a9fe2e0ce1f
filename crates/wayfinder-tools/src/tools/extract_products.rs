use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use wayfinder_browser::Cdp;
use wayfinder_extract::IterativeExtractor;

use crate::errors::ToolError;
use crate::registry::{Tool, ToolContext};

#[derive(Deserialize, Default)]
struct Args {
    max_items: Option<usize>,
}

#[derive(Default)]
pub struct ExtractProductsTool;

#[async_trait]
impl<C: Cdp + Send + Sync + 'static> Tool<C> for ExtractProductsTool {
    fn name(&self) -> &'static str {
        "extract.products"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "max_items": {"type": "integer"},
                "filters": {"type": "object"},
            },
        })
    }

    fn output_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["products", "count"],
            "properties": {
                "products": {"type": "array"},
                "count": {"type": "integer"},
                "reason": {"type": "string"},
            },
        })
    }

    async fn execute(&self, ctx: &ToolContext<C>, args: Value) -> Result<Value, ToolError> {
        let args: Args = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidArgs(e.to_string()))?;

        let extractor = IterativeExtractor::new(ctx.cdp.clone());
        let validator = ctx.semantic_validator.as_deref();
        let result = extractor
            .extract(ctx.page, &ctx.instruction, args.max_items, validator)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        Ok(json!({
            "products": result.products,
            "count": result.count,
            "reason": result.reason,
        }))
    }
}
