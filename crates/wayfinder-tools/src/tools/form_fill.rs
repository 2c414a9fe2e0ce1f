use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Value};
use wayfinder_browser::Cdp;
use wayfinder_formfill::PerFieldFormFiller;

use crate::errors::ToolError;
use crate::registry::{Tool, ToolContext};

#[derive(Default)]
pub struct FormFillTool;

#[async_trait]
impl<C: Cdp + Send + Sync + 'static> Tool<C> for FormFillTool {
    fn name(&self) -> &'static str {
        "form.fill"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "additionalProperties": {"type": "string"}})
    }

    fn output_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["filled", "submitted"],
            "properties": {
                "filled": {"type": "object"},
                "submitted": {"type": "boolean"},
                "errors": {"type": "array", "items": {"type": "string"}},
            },
        })
    }

    async fn execute(&self, ctx: &ToolContext<C>, args: Value) -> Result<Value, ToolError> {
        let instruction_values: BTreeMap<String, String> = match args {
            Value::Object(map) => map
                .into_iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
                .collect(),
            Value::Null => BTreeMap::new(),
            _ => return Err(ToolError::InvalidArgs("expected a JSON object of field values".into())),
        };

        if ctx.current_form_fields.is_empty() {
            return Err(ToolError::Execution("no form detected on the current page".into()));
        }

        let filler = PerFieldFormFiller::new(
            &*ctx.cdp,
            ctx.site_domain.clone(),
            ctx.max_same_error,
            ctx.submit_wait_ms,
        );

        let result = filler
            .fill_form(
                ctx.page,
                &ctx.instruction,
                &ctx.current_form_fields,
                &instruction_values,
                &*ctx.field_llm,
            )
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        Ok(json!({
            "filled": result.fields_filled,
            "filled_count": result.filled_count,
            "submitted": result.submitted,
            "errors": result.errors,
        }))
    }
}
