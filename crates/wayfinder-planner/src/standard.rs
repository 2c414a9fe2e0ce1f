//! The standard single-shot planner (spec.md §4.2 "standard planner" used
//! when the hierarchical protocol is not activated). One LLM call sees the
//! full serialized [`PageContext`] and replies with a concrete [`PlanStep`]
//! directly — no Level 1/Level 2 split. Used when
//! `should_use_hierarchical` returns `false`.

use serde::Deserialize;
use serde_json::Value;

use wayfinder_llm::{invoke_with_retry, json_repair, LlmClient, LlmOptions};
use wayfinder_types::model::{PageContext, PlanStep, ToolHistory};

use crate::errors::AgentError;

pub struct StandardPlanner<'a> {
    llm: &'a dyn LlmClient,
    options: LlmOptions,
    max_retries: u32,
}

impl<'a> StandardPlanner<'a> {
    pub fn new(llm: &'a dyn LlmClient, options: LlmOptions, max_retries: u32) -> Self {
        Self { llm, options, max_retries }
    }

    /// One LLM round trip (plus at most one repair re-prompt, spec.md §4.2
    /// "Failure modes") producing the next [`PlanStep`] directly from the
    /// full page context.
    pub async fn decide(
        &self,
        instruction: &str,
        context: &PageContext,
        history: &ToolHistory,
        step_index: u32,
    ) -> Result<PlanStep, AgentError> {
        let prompt = single_shot_prompt(instruction, context, history, step_index);
        let reply = self.call_with_repair(&prompt).await?;
        let parsed: StandardReply = json_repair::try_parse(&reply)
            .ok_or_else(|| AgentError::invalid_request("standard planner reply unparseable after repair"))?;
        Ok(parsed.into())
    }

    async fn call_with_repair(&self, prompt: &str) -> Result<String, AgentError> {
        let first = invoke_with_retry(self.llm, prompt, &self.options, self.max_retries)
            .await
            .map_err(|e| AgentError::invalid_request(format!("llm unreachable: {e}")))?;

        if json_repair::extract_json_object(&first).is_some()
            || serde_json::from_str::<Value>(first.trim()).is_ok()
        {
            return Ok(first);
        }

        let repair = json_repair::repair_prompt(prompt, &first, "not valid JSON");
        invoke_with_retry(self.llm, &repair, &self.options, self.max_retries)
            .await
            .map_err(|e| AgentError::invalid_request(format!("llm unreachable on repair: {e}")))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StandardReply {
    Tool {
        tool_name: String,
        #[serde(default)]
        args: Value,
        #[serde(default)]
        reason: String,
    },
    Navigate { url: String },
    Complete {
        #[serde(default)]
        reason: String,
        #[serde(default)]
        result: Value,
    },
    Error {
        #[serde(default)]
        reason: String,
    },
}

impl From<StandardReply> for PlanStep {
    fn from(reply: StandardReply) -> Self {
        match reply {
            StandardReply::Tool { tool_name, args, reason } => {
                PlanStep::Tool { tool_name, args, reason }
            }
            StandardReply::Navigate { url } => PlanStep::Navigate { url },
            StandardReply::Complete { reason, result } => PlanStep::Complete { reason, result },
            StandardReply::Error { reason } => PlanStep::Error { reason },
        }
    }
}

fn single_shot_prompt(
    instruction: &str,
    context: &PageContext,
    history: &ToolHistory,
    step_index: u32,
) -> String {
    format!(
        "You are the planner for a browser automation agent.\n\
         Instruction: {instruction}\n\
         Step: {step_index}\n\
         Page context (JSON): {}\n\
         Recent tool history: {:?}\n\n\
         Reply with ONLY a JSON object of one of these shapes:\n\
         {{\"type\": \"tool\", \"tool_name\": \"<registered tool>\", \"args\": {{...}}, \"reason\": \"<brief>\"}}\n\
         {{\"type\": \"navigate\", \"url\": \"<url>\"}}\n\
         {{\"type\": \"complete\", \"reason\": \"<brief>\", \"result\": <json>}}\n\
         {{\"type\": \"error\", \"reason\": \"<brief>\"}}",
        serde_json::to_string(context).unwrap_or_default(),
        history.recent_tool_errors(3)
    )
}
