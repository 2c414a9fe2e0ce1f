//! The Result Aggregator (spec.md §4.1 "Aggregation"): assembles the final
//! result from the last successful tool outputs. Extraction tools overwrite
//! the running result, navigation tools contribute nothing, and form tools
//! contribute a submission status.

use serde_json::Value;

/// Accumulates the task's data result across loop iterations. Only the
/// *last* successful extraction/form-fill result is kept — later tool
/// outputs overwrite earlier ones of the same kind, matching spec.md's
/// "last successful tool outputs" framing.
#[derive(Default)]
pub struct ResultAggregator {
    data: Value,
    screenshots: Vec<String>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self { data: Value::Null, screenshots: Vec::new() }
    }

    /// Folds one tool's output into the running result, based on the tool
    /// name's namespace. `dom.navigate`/`dom.wait`/`dom.click` contribute no
    /// data; `dom.screenshot` is tracked separately; everything else
    /// (`form.fill`, `extract.products`, `extract.links`) overwrites `data`.
    pub fn record_tool_result(&mut self, tool_name: &str, output: &Value) {
        match tool_name {
            "dom.navigate" | "dom.wait" | "dom.click" => {}
            "dom.screenshot" => {
                if let Some(path) = output.get("path").and_then(Value::as_str) {
                    self.screenshots.push(path.to_string());
                }
            }
            _ => {
                if output.get("error").is_none() {
                    self.data = output.clone();
                }
            }
        }
    }

    /// A `{type: "complete", result, ...}` plan step always wins outright,
    /// overriding anything tools have accumulated so far.
    pub fn record_explicit_result(&mut self, result: Value) {
        if !result.is_null() {
            self.data = result;
        }
    }

    pub fn data(&self) -> Value {
        self.data.clone()
    }

    pub fn screenshots(&self) -> Vec<String> {
        self.screenshots.clone()
    }

    /// Best-effort summary used when the loop exhausts `max_steps` without
    /// an explicit `complete` step (spec.md §4.1 step 6).
    pub fn is_empty(&self) -> bool {
        self.data.is_null()
    }
}
