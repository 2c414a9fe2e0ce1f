//! Shared data model for the planning & execution engine: [`Task`],
//! [`PageContext`], the [`PlanStep`] protocol, and the extraction/form-fill
//! record types. These are the nouns every other `wayfinder-*` crate passes
//! around; none of them reach back into a live browser handle once captured.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one end-to-end `run_task` invocation.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// `run-YYYYMMDD-HHMMSS-xxxx`, matching the on-disk log naming scheme.
    pub fn new(now: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "run-{}-{}",
            now.format("%Y%m%d-%H%M%S"),
            &suffix[..4]
        ))
    }
}

/// Identifier for persisted browser state (cookies, localStorage) reused
/// across tasks. Namespaces `workspace/sessions/<key>/` on disk.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SessionKey(pub String);

/// Options threaded through a single `run_task` call (spec.md §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub visual_mode: bool,
    pub stealth_mode: bool,
    pub headless: bool,
    pub max_steps: u32,
    pub step_timeout_ms: u64,
    pub llm_timeout_ms: u64,
    pub llm_max_retries: u32,
    pub context_max_chars: usize,
    /// `None` = auto (size/intent heuristic decides); `Some(x)` forces on/off.
    pub hierarchical_planner: Option<bool>,
    pub hierarchical_threshold_chars: usize,
    pub session_key: Option<SessionKey>,
    pub dom_max_chars: usize,
    pub max_same_error: u32,
    pub submit_wait_ms: u64,
    /// Overall wall-clock budget for the task; `None` means no deadline.
    pub deadline: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            visual_mode: false,
            stealth_mode: false,
            headless: true,
            max_steps: 20,
            step_timeout_ms: 25_000,
            llm_timeout_ms: 300_000,
            llm_max_retries: 3,
            context_max_chars: 60_000,
            hierarchical_planner: None,
            hierarchical_threshold_chars: 25_000,
            session_key: None,
            dom_max_chars: 20_000,
            max_same_error: 2,
            submit_wait_ms: 2_000,
            deadline: Some(Duration::from_secs(180)),
        }
    }
}

/// One end-to-end task invocation. Exactly one browser page is bound to a
/// `Task` for its lifetime; the Task owns its `PageContext`, `ToolHistory`,
/// and run log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub instruction: String,
    pub url: String,
    pub options: RunOptions,
    pub session_key: Option<SessionKey>,
    pub run_id: RunId,
}

impl Task {
    pub fn new(url: impl Into<String>, instruction: impl Into<String>, options: RunOptions) -> Self {
        let session_key = options.session_key.clone();
        Self {
            instruction: instruction.into(),
            url: url.into(),
            options,
            session_key,
            run_id: RunId::new(Utc::now()),
        }
    }
}

// ---------------------------------------------------------------------
// PageContext
// ---------------------------------------------------------------------

/// One field within a form (spec.md §3 `FieldDescriptor`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: Option<String>,
    pub id: Option<String>,
    pub field_type: String,
    pub required: bool,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub options: Vec<String>,
}

/// Per-form summary; `fields` is populated lazily (only when the planner
/// requests `forms[N].fields` at Level 2).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FormOutline {
    pub id: Option<String>,
    pub action: Option<String>,
    pub method: Option<String>,
    pub field_count: usize,
    pub field_types: BTreeMap<String, usize>,
    pub fields: Option<Vec<FieldDescriptor>>,
}

/// One element surfaced in the bounded `dom_preview`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomElement {
    pub tag: String,
    pub text: Option<String>,
    pub attrs: BTreeMap<String, String>,
    pub depth: u32,
}

/// Iframe metadata only — no recursive snapshot (spec.md §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IframeInfo {
    pub name: Option<String>,
    pub src: Option<String>,
    pub is_captcha: bool,
}

/// Buttons/links summary surfaced to the planner without full DOM detail.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InteractiveSummary {
    pub buttons: Vec<String>,
    pub links: Vec<String>,
}

/// An immutable snapshot of the page, captured before every planning
/// decision (spec.md §3). A fresh one is captured after any tool invocation
/// that may have changed the DOM.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageContext {
    pub title: String,
    pub url: String,
    pub headings: Vec<String>,
    pub forms: Vec<FormOutline>,
    pub dom_preview: Vec<DomElement>,
    pub iframes: Vec<IframeInfo>,
    pub interactive: InteractiveSummary,
    pub text: String,
    pub captured_at: DateTime<Utc>,
}

impl PageContext {
    /// Approximate serialized size used for the hierarchical-planner
    /// activation threshold (spec.md §4.2); cheaper than a real
    /// `serde_json::to_string` round trip on every step.
    pub fn approx_serialized_chars(&self) -> usize {
        let mut total = self.title.len() + self.url.len() + self.text.len();
        for h in &self.headings {
            total += h.len();
        }
        for f in &self.forms {
            total += 64 + f.field_types.len() * 24;
            if let Some(fields) = &f.fields {
                total += fields.len() * 96;
            }
        }
        for el in &self.dom_preview {
            total += 32 + el.text.as_ref().map(|t| t.len()).unwrap_or(0);
            total += el.attrs.iter().map(|(k, v)| k.len() + v.len() + 4).sum::<usize>();
        }
        total += self.iframes.len() * 48;
        total += self.interactive.buttons.iter().map(|s| s.len()).sum::<usize>();
        total += self.interactive.links.iter().map(|s| s.len()).sum::<usize>();
        total
    }

    pub fn has_forms(&self) -> bool {
        !self.forms.is_empty()
    }
}

// ---------------------------------------------------------------------
// Planner protocol
// ---------------------------------------------------------------------

/// Inferred coarse page category, used by Level 1 of the hierarchical
/// planner (spec.md §4.2).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Form,
    ProductListing,
    Article,
    Other,
}

/// One planner output for a single loop iteration (spec.md §3 `PlanStep`).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanStep {
    Tool {
        tool_name: String,
        args: serde_json::Value,
        reason: String,
    },
    Navigate {
        url: String,
    },
    Complete {
        reason: String,
        result: serde_json::Value,
    },
    Error {
        reason: String,
    },
}

/// One entry in the bounded tool-call history fed back to the planner.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolHistoryEntry {
    pub step_index: u32,
    pub tool_name: String,
    pub args_summary: String,
    pub result_summary: String,
    pub error: Option<String>,
}

/// Bounded, append-only record of tool invocations for one task.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ToolHistory {
    pub entries: Vec<ToolHistoryEntry>,
    pub capacity: usize,
}

impl ToolHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, entry: ToolHistoryEntry) {
        self.entries.push(entry);
        if self.entries.len() > self.capacity {
            let overflow = self.entries.len() - self.capacity;
            self.entries.drain(0..overflow);
        }
    }

    /// Rolling window of the last `n` (tool, error_signature) pairs, for
    /// stall detection (spec.md §4.1 step 5).
    pub fn recent_tool_errors(&self, n: usize) -> Vec<(String, String)> {
        self.entries
            .iter()
            .rev()
            .take(n)
            .filter_map(|e| e.error.as_ref().map(|err| (e.tool_name.clone(), error_signature(err))))
            .collect()
    }
}

/// Normalizes an error message to a coarse signature for stall detection —
/// strips dynamic content (numbers, quoted strings) so transient
/// differences in a timeout error don't defeat repeat detection.
pub fn error_signature(message: &str) -> String {
    let mut sig = String::with_capacity(message.len());
    let mut in_digits = false;
    for ch in message.chars() {
        if ch.is_ascii_digit() {
            if !in_digits {
                sig.push('#');
                in_digits = true;
            }
        } else {
            in_digits = false;
            sig.push(ch.to_ascii_lowercase());
        }
    }
    sig.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------

/// One repeated structural pattern plausibly representing a single product
/// (spec.md §3 `ContainerCandidate`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContainerCandidate {
    pub selector: String,
    pub count: usize,
    pub depth: u32,
    pub has_price: bool,
    pub has_link: bool,
    pub has_image: bool,
    pub sample_texts: Vec<String>,
    pub statistical_score: f64,
    pub llm_confidence: Option<f64>,
    pub combined_confidence: f64,
}

/// One extracted item; keys are discovered dynamically (commonly `name`,
/// `price`, `url`, `image`).
pub type ProductRecord = BTreeMap<String, serde_json::Value>;

/// Outcome of `extract.products` / the iterative extractor (spec.md §4.4).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub products: Vec<ProductRecord>,
    pub count: usize,
    pub reason: Option<String>,
    pub container: Option<ContainerCandidate>,
    pub metadata: serde_json::Value,
}

// ---------------------------------------------------------------------
// Form filling
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldFillStatus {
    Filled,
    Failed,
    Skipped,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldFillRecord {
    pub status: FieldFillStatus,
    pub value: Option<String>,
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// Outcome of `form.fill` / the per-field filler (spec.md §4.5).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormFillResult {
    pub fields_filled: BTreeMap<String, FieldFillRecord>,
    pub filled_count: usize,
    pub submitted: bool,
    pub errors: Vec<String>,
}

// ---------------------------------------------------------------------
// Final result
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    External,
    Transient,
    Planner,
    PartialSuccess,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResultError {
    pub kind: ErrorKind,
    pub message: String,
    pub suggestion: Option<String>,
}

/// The shape returned by `run_task` (spec.md §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: bool,
    pub result: serde_json::Value,
    pub steps_taken: u32,
    pub run_log: String,
    pub screenshots: Vec<String>,
    pub error: Option<ResultError>,
    pub evaluation: Option<serde_json::Value>,
}
