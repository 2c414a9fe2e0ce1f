//! The Hierarchical Planner (spec.md §4.2): a three-level progressive
//! disclosure protocol that keeps the LLM's input small. Level 1 sees a
//! compressed [`PageOutline`] and returns a coarse decision plus, optionally,
//! a list of substructure paths it wants ("need_details"); if it asks for
//! none, the planner maps the decision straight to a tool call via the
//! fast-path key=value parser instead of spending a second LLM call. If it
//! does ask for details, Level 2 gets exactly those substructures and
//! returns a concrete tool invocation. Level 3 is not an LLM call at all —
//! it's just handing the resulting [`PlanStep`] back to the caller.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use wayfinder_llm::{invoke_with_retry, json_repair, LlmClient, LlmOptions};
use wayfinder_semantic::{models::ExtractedText, Classifier};
use wayfinder_types::model::{FormOutline, PageContext, PageType, PlanStep, ToolHistory};

use crate::errors::AgentError;

/// Verbs/nouns whose presence in the instruction suggests form-filling
/// intent; used by the activation heuristic when the caller hasn't forced
/// hierarchical mode on or off (spec.md §4.2 "When activated").
static FORM_INTENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(fill|submit|sign ?up|register|subscribe|contact|apply|form)\b").unwrap()
});

/// Tolerant `key=value` / `key: value` pairs, split on commas or newlines,
/// case-insensitive keys (spec.md §4.2 "Fast path").
static KV_PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([a-z_][a-z0-9_ ]*?)\s*[:=]\s*([^,\n]+)").unwrap());

/// Decides whether the hierarchical (three-level) protocol should be used
/// for this step, versus the standard single-shot planner. `override_` lets
/// `RunOptions::hierarchical_planner` force the decision either way.
pub fn should_use_hierarchical(
    instruction: &str,
    context_chars: usize,
    threshold_chars: usize,
    override_: Option<bool>,
) -> bool {
    if let Some(forced) = override_ {
        return forced;
    }
    context_chars > threshold_chars || FORM_INTENT_RE.is_match(instruction)
}

/// Parses `name=John Doe, email=john@example.com` style instructions into a
/// case-insensitive key/value map. Keys are lowercased; values are trimmed.
pub fn parse_instruction_kv(instruction: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for caps in KV_PAIR_RE.captures_iter(instruction) {
        let key = caps[1].trim().to_lowercase().replace(' ', "_");
        let value = caps[2].trim().to_string();
        if !key.is_empty() && !value.is_empty() {
            out.insert(key, value);
        }
    }
    out
}

/// A coarse, compressed view of a form (no `fields`) — what Level 1 sees.
#[derive(Clone, Debug, Serialize)]
pub struct FormOutlineLite {
    pub id: Option<String>,
    pub field_count: usize,
    pub field_types: BTreeMap<String, usize>,
}

impl From<&FormOutline> for FormOutlineLite {
    fn from(f: &FormOutline) -> Self {
        Self {
            id: f.id.clone(),
            field_count: f.field_count,
            field_types: f.field_types.clone(),
        }
    }
}

/// The Level 1 payload: everything the strategic prompt needs and nothing
/// more (spec.md §4.2 Level 1).
#[derive(Clone, Debug, Serialize)]
pub struct PageOutline {
    pub title: String,
    pub url: String,
    pub page_type: PageType,
    pub forms: Vec<FormOutlineLite>,
    pub headings: Vec<String>,
}

impl PageOutline {
    pub fn from_context(ctx: &PageContext, page_type: PageType) -> Self {
        Self {
            title: ctx.title.clone(),
            url: ctx.url.clone(),
            page_type,
            forms: ctx.forms.iter().map(FormOutlineLite::from).collect(),
            headings: ctx.headings.iter().take(10).cloned().collect(),
        }
    }
}

/// Infers the coarse page category the Level 1 prompt is told about,
/// reusing `wayfinder-semantic`'s content classifier over the title,
/// headings, and truncated body text already captured in the
/// [`PageContext`] (no extra DOM round trip).
pub fn infer_page_type(ctx: &PageContext) -> PageType {
    let classifier = Classifier::new();
    let extracted = ExtractedText {
        body: ctx.text.clone(),
        title: Some(ctx.title.clone()),
        description: None,
        headings: ctx.headings.clone(),
        links: Vec::new(),
        char_count: ctx.text.len(),
    };
    match classifier.classify_content_type(&extracted) {
        Ok(wayfinder_semantic::models::ContentType::Form) => PageType::Form,
        Ok(wayfinder_semantic::models::ContentType::Product) => PageType::ProductListing,
        Ok(wayfinder_semantic::models::ContentType::Article) => PageType::Article,
        _ if ctx.has_forms() => PageType::Form,
        _ => PageType::Other,
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Level1Reply {
    decision: String,
    #[serde(default)]
    need_details: Option<Vec<String>>,
    #[serde(default)]
    reason: String,
    /// Not part of spec.md's literal Level 1 schema; tolerated so a
    /// `"decision": "navigate"` reply can carry its destination without a
    /// second LLM round trip when the model already knows it.
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Level2Reply {
    tool_name: String,
    #[serde(default)]
    args: Value,
    #[serde(default)]
    reason: String,
}

fn level1_prompt(instruction: &str, outline: &PageOutline, step_index: u32) -> String {
    format!(
        "You are the strategic planner for a browser automation agent.\n\
         Instruction: {instruction}\n\
         Step: {step_index}\n\
         Page outline (JSON): {}\n\n\
         Reply with ONLY a JSON object of the shape:\n\
         {{\"decision\": \"use_form\"|\"extract_articles\"|\"extract_products\"|\"navigate\"|\"complete\"|\"other\", \
         \"need_details\": [<path strings>]|null, \"reason\": \"<brief>\"}}\n\
         Supported detail paths: forms[N].fields, interactive, headings, dom_preview[range].\n\
         Use null for need_details only if you have enough information to act without them.",
        serde_json::to_string(outline).unwrap_or_default()
    )
}

fn level2_prompt(instruction: &str, decision: &str, details: &Value, history: &ToolHistory) -> String {
    format!(
        "You are the tactical planner for a browser automation agent.\n\
         Instruction: {instruction}\n\
         Strategic decision: {decision}\n\
         Requested details (JSON): {}\n\
         Recent tool history: {:?}\n\n\
         Reply with ONLY a JSON object of the shape:\n\
         {{\"tool_name\": \"<registered tool>\", \"args\": {{...}}, \"reason\": \"<brief>\"}}",
        serde_json::to_string(details).unwrap_or_default(),
        history.recent_tool_errors(3)
    )
}

/// Disclosed substructures keyed by the path the Level 1 reply requested,
/// built by the caller (who owns the live `PageSnapshot` this planner has no
/// access to) and handed to [`HierarchicalPlanner::decide`].
pub type Disclosures = BTreeMap<String, Value>;

pub struct HierarchicalPlanner<'a> {
    llm: &'a dyn LlmClient,
    options: LlmOptions,
    max_retries: u32,
}

impl<'a> HierarchicalPlanner<'a> {
    pub fn new(llm: &'a dyn LlmClient, options: LlmOptions, max_retries: u32) -> Self {
        Self { llm, options, max_retries }
    }

    /// Runs Level 1, and — only if it asks for details — Level 2, returning
    /// the requested substructure paths for the caller to disclose via
    /// `disclose()` (from `wayfinder-context`) before a second call is
    /// needed. Returns `NeedsDetails` when Level 2 must be driven by the
    /// caller with disclosed payloads in hand.
    pub async fn level_one(
        &self,
        instruction: &str,
        outline: &PageOutline,
        step_index: u32,
    ) -> Result<Level1Outcome, AgentError> {
        let prompt = level1_prompt(instruction, outline, step_index);
        let reply = self.call_with_repair(&prompt).await?;
        let parsed: Level1Reply = json_repair::try_parse(&reply)
            .ok_or_else(|| AgentError::invalid_request("level 1 reply unparseable after repair"))?;

        if let Some(paths) = parsed.need_details {
            if !paths.is_empty() {
                return Ok(Level1Outcome::NeedsDetails {
                    decision: parsed.decision,
                    paths,
                });
            }
        }

        Ok(Level1Outcome::Resolved(self.resolve_without_level2(
            &parsed.decision,
            parsed.url,
            instruction,
            parsed.reason,
        )))
    }

    /// Level 2: given the disclosures the caller gathered for the paths
    /// Level 1 asked for, get a concrete tool invocation.
    pub async fn level_two(
        &self,
        instruction: &str,
        decision: &str,
        disclosures: &Disclosures,
        history: &ToolHistory,
    ) -> Result<PlanStep, AgentError> {
        let details = serde_json::to_value(disclosures).unwrap_or(Value::Null);
        let prompt = level2_prompt(instruction, decision, &details, history);
        let reply = self.call_with_repair(&prompt).await?;
        let parsed: Level2Reply = json_repair::try_parse(&reply)
            .ok_or_else(|| AgentError::invalid_request("level 2 reply unparseable after repair"))?;

        Ok(PlanStep::Tool {
            tool_name: parsed.tool_name,
            args: parsed.args,
            reason: parsed.reason,
        })
    }

    /// need_details was null: map the decision straight to a tool call,
    /// using the fast-path key=value parser for form filling rather than a
    /// second LLM round trip (spec.md §4.2 "Fast path").
    fn resolve_without_level2(
        &self,
        decision: &str,
        url: Option<String>,
        instruction: &str,
        reason: String,
    ) -> PlanStep {
        match decision {
            "use_form" => {
                let kv = parse_instruction_kv(instruction);
                PlanStep::Tool {
                    tool_name: "form.fill".to_string(),
                    args: serde_json::to_value(kv).unwrap_or(Value::Object(Default::default())),
                    reason: "fast-path key=value parse from instruction".to_string(),
                }
            }
            "extract_products" => PlanStep::Tool {
                tool_name: "extract.products".to_string(),
                args: serde_json::json!({}),
                reason,
            },
            "extract_articles" => PlanStep::Tool {
                tool_name: "extract.links".to_string(),
                args: serde_json::json!({}),
                reason,
            },
            "navigate" => match url {
                Some(url) => PlanStep::Navigate { url },
                None => PlanStep::Error {
                    reason: "navigate decision without a url".to_string(),
                },
            },
            "complete" => PlanStep::Complete {
                reason,
                result: Value::Null,
            },
            _ => PlanStep::Error { reason },
        }
    }

    /// One call, with a single repair re-prompt on unparseable JSON
    /// (spec.md §4.2 "Failure modes").
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

#[derive(Debug, Clone)]
pub enum Level1Outcome {
    Resolved(PlanStep),
    NeedsDetails { decision: String, paths: Vec<String> },
}
