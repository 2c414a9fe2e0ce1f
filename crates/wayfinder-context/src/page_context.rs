//! The Page Context Collector (spec.md §4.3).
//!
//! Produces an immutable [`PageContext`] from the live page via a single
//! bulk DOM-walk `evaluate_script` call, then applies the size discipline
//! (progressive `dom_preview` reduction, iframe dedup, CAPTCHA flagging,
//! body-text truncation) in pure Rust so it is unit-testable without a
//! browser. Grounded on this crate's own `sampler`/`differ` shape (one bulk
//! sample per step, reduced and diffed afterward) though the structural
//! perceiver's AX/DOM snapshot pair is not reused directly — the planner
//! needs page-semantic structure (forms, headings, interactive summary),
//! not accessibility-tree anchors.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use wayfinder_browser::{Cdp, PageId};
use wayfinder_types::model::{
    DomElement, FieldDescriptor, FormOutline, IframeInfo, InteractiveSummary, PageContext,
};

use crate::errors::PerceiverError;

/// The JS payload evaluated in the page. Deliberately over-collects (a
/// generous dom element cap) so the Rust side can apply the progressive
/// reduction schedule without a second round trip.
pub const DOM_WALK_SCRIPT: &str = include_str!("dom_walk.js");

static CAPTCHA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)captcha|recaptcha|hcaptcha|turnstile|funcaptcha").unwrap()
});

/// Raw JSON shape produced by [`DOM_WALK_SCRIPT`]; mirrors its object keys.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawField {
    pub name: Option<String>,
    pub id: Option<String>,
    pub field_type: String,
    pub required: bool,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub options: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawForm {
    pub id: Option<String>,
    pub action: Option<String>,
    pub method: Option<String>,
    pub fields: Vec<RawField>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawDomElement {
    pub tag: String,
    pub text: Option<String>,
    pub attrs: BTreeMap<String, String>,
    pub depth: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawIframe {
    pub name: Option<String>,
    pub src: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPageSnapshot {
    pub title: String,
    pub url: String,
    pub headings: Vec<String>,
    pub forms: Vec<RawForm>,
    pub dom_preview: Vec<RawDomElement>,
    pub iframes: Vec<RawIframe>,
    pub interactive_buttons: Vec<String>,
    pub interactive_links: Vec<String>,
    pub text: String,
}

/// A [`PageContext`] plus the full per-form field detail the Level-1 outline
/// omits. The Hierarchical Planner's Level 2 step discloses slices of this
/// on demand via [`disclose`].
#[derive(Clone, Debug)]
pub struct PageSnapshot {
    pub context: PageContext,
    full_form_fields: Vec<Vec<FieldDescriptor>>,
    full_dom_preview: Vec<DomElement>,
}

const MAX_HEADINGS: usize = 20;
const MAX_TEXT_CHARS: usize = 5_000;
const DEFAULT_DOM_PREVIEW_CAP: usize = 500;
const DOM_PREVIEW_REDUCTION_FACTOR: f64 = 0.6;
const DOM_PREVIEW_FLOOR: usize = 40;

/// Monotonic reduction schedule for `dom_preview` size (spec.md §4.3): after
/// step 1, shrink by a fixed factor per step, never below a floor.
pub fn dom_preview_budget(step_index: u32, base_cap: usize) -> usize {
    if step_index == 0 {
        return base_cap;
    }
    let mut cap = base_cap as f64;
    for _ in 0..step_index {
        cap *= DOM_PREVIEW_REDUCTION_FACTOR;
    }
    (cap.round() as usize).max(DOM_PREVIEW_FLOOR).min(base_cap)
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}

fn is_captcha_iframe(iframe: &RawIframe) -> bool {
    let name_hit = iframe
        .name
        .as_deref()
        .map(|n| CAPTCHA_PATTERN.is_match(n))
        .unwrap_or(false);
    let src_hit = iframe
        .src
        .as_deref()
        .map(|s| CAPTCHA_PATTERN.is_match(s))
        .unwrap_or(false);
    name_hit || src_hit
}

fn dedup_iframes(raw: Vec<RawIframe>) -> Vec<IframeInfo> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for iframe in raw {
        let key = iframe.src.clone().unwrap_or_default();
        if !key.is_empty() && !seen.insert(key) {
            continue;
        }
        out.push(IframeInfo {
            is_captcha: is_captcha_iframe(&iframe),
            name: iframe.name,
            src: iframe.src,
        });
    }
    out
}

/// Builds a [`PageSnapshot`] from the raw JS payload, applying the size
/// discipline of spec.md §4.3. `step_index` drives the progressive
/// `dom_preview` reduction; `form_focus` drops unrelated sections (headings,
/// `dom_preview`) for form-oriented tasks, keeping forms/interactive intact.
pub fn build_snapshot(
    raw: RawPageSnapshot,
    step_index: u32,
    dom_preview_base_cap: usize,
    form_focus: bool,
) -> PageSnapshot {
    let dom_cap = dom_preview_budget(step_index, dom_preview_base_cap);

    let full_dom_preview: Vec<DomElement> = raw
        .dom_preview
        .iter()
        .map(|e| DomElement {
            tag: e.tag.clone(),
            text: e.text.clone(),
            attrs: e.attrs.clone(),
            depth: e.depth,
        })
        .collect();

    let dom_preview = if form_focus {
        Vec::new()
    } else {
        full_dom_preview.iter().take(dom_cap).cloned().collect()
    };

    let headings = if form_focus {
        Vec::new()
    } else {
        raw.headings.into_iter().take(MAX_HEADINGS).collect()
    };

    let mut full_form_fields = Vec::with_capacity(raw.forms.len());
    let mut forms = Vec::with_capacity(raw.forms.len());
    for form in raw.forms {
        let mut field_types: BTreeMap<String, usize> = BTreeMap::new();
        let mut fields = Vec::with_capacity(form.fields.len());
        for f in &form.fields {
            *field_types.entry(f.field_type.clone()).or_insert(0) += 1;
            fields.push(FieldDescriptor {
                name: f.name.clone(),
                id: f.id.clone(),
                field_type: f.field_type.clone(),
                required: f.required,
                label: f.label.clone(),
                placeholder: f.placeholder.clone(),
                options: f.options.clone(),
            });
        }
        let field_count = fields.len();
        full_form_fields.push(fields);
        forms.push(FormOutline {
            id: form.id,
            action: form.action,
            method: form.method,
            field_count,
            field_types,
            fields: None,
        });
    }

    let text = if form_focus && forms.is_empty() {
        String::new()
    } else {
        truncate_chars(&raw.text, MAX_TEXT_CHARS)
    };

    let context = PageContext {
        title: raw.title,
        url: raw.url,
        headings,
        forms,
        dom_preview,
        iframes: dedup_iframes(raw.iframes),
        interactive: InteractiveSummary {
            buttons: raw.interactive_buttons,
            links: raw.interactive_links,
        },
        text,
        captured_at: chrono::Utc::now(),
    };

    PageSnapshot {
        context,
        full_form_fields,
        full_dom_preview,
    }
}

/// Disclose exactly the substructure named by `path`, per the Hierarchical
/// Planner's Level-2 contract (spec.md §4.2). Unknown/out-of-range paths
/// return `Value::Null` rather than failing — the planner continues with an
/// empty substructure.
pub fn disclose(snapshot: &PageSnapshot, path: &str) -> Value {
    if path == "interactive" {
        return serde_json::to_value(&snapshot.context.interactive).unwrap_or(Value::Null);
    }
    if path == "headings" {
        return serde_json::to_value(&snapshot.context.headings).unwrap_or(Value::Null);
    }
    if let Some(rest) = path.strip_prefix("forms[") {
        if let Some((idx_str, rest)) = rest.split_once(']') {
            if let Ok(idx) = idx_str.parse::<usize>() {
                if rest == ".fields" {
                    return snapshot
                        .full_form_fields
                        .get(idx)
                        .map(|fields| serde_json::to_value(fields).unwrap_or(Value::Null))
                        .unwrap_or(Value::Null);
                }
            }
        }
    }
    if let Some(rest) = path.strip_prefix("dom_preview[") {
        if let Some((range_str, _)) = rest.split_once(']') {
            if let Some((start_str, end_str)) = range_str.split_once("..") {
                let start: usize = start_str.parse().unwrap_or(0);
                let end: usize = end_str
                    .parse()
                    .unwrap_or(snapshot.full_dom_preview.len());
                let end = end.min(snapshot.full_dom_preview.len());
                if start <= end {
                    return serde_json::to_value(&snapshot.full_dom_preview[start..end])
                        .unwrap_or(Value::Null);
                }
            }
        }
    }
    Value::Null
}

/// Best-effort text match against visible buttons/links/role=button elements
/// for the handful of verbs that almost every cookie-consent banner uses.
/// Deliberately generic (no site-specific selector) per spec.md §4.1 step 1.
const COOKIE_BANNER_DISMISS_SCRIPT: &str = r#"
(() => {
  const patterns = [/accept/i, /agree/i, /got it/i, /allow all/i, /i understand/i, /^ok$/i, /^okay$/i, /dismiss/i, /close/i];
  const nodes = Array.from(document.querySelectorAll('button, a, [role="button"], input[type="button"], input[type="submit"]'));
  for (const el of nodes) {
    const rect = el.getBoundingClientRect();
    if (rect.width === 0 || rect.height === 0) continue;
    const text = (el.innerText || el.value || '').trim();
    if (!text || text.length > 40) continue;
    if (patterns.some((p) => p.test(text))) {
      el.click();
      return true;
    }
  }
  return false;
})()
"#;

/// Collects a [`PageSnapshot`] from a live page via a single `evaluate_script`
/// round trip.
pub struct ContextCollector<C: Cdp + Send + Sync> {
    adapter: Arc<C>,
}

impl<C: Cdp + Send + Sync> ContextCollector<C> {
    pub fn new(adapter: Arc<C>) -> Self {
        Self { adapter }
    }

    /// Dismisses a cookie-consent banner, if one is showing, by clicking the
    /// first visible element whose text matches a generic consent verb.
    /// Non-fatal: any failure (no match, evaluate error) is swallowed and
    /// reported as `false` rather than propagated (spec.md §4.1 step 1).
    pub async fn dismiss_cookie_banner(&self, page: PageId) -> bool {
        match self.adapter.evaluate_script(page, COOKIE_BANNER_DISMISS_SCRIPT).await {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(_) => false,
        }
    }

    pub async fn collect(
        &self,
        page: PageId,
        step_index: u32,
        form_focus: bool,
    ) -> Result<PageSnapshot, PerceiverError> {
        let raw_value = self
            .adapter
            .evaluate_script(page, DOM_WALK_SCRIPT)
            .await
            .map_err(|err| PerceiverError::internal(format!("dom walk failed: {:?}", err.kind)))?;
        let raw: RawPageSnapshot = serde_json::from_value(raw_value)
            .map_err(|err| PerceiverError::internal(format!("dom walk payload malformed: {err}")))?;
        Ok(build_snapshot(
            raw,
            step_index,
            DEFAULT_DOM_PREVIEW_CAP,
            form_focus,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_raw() -> RawPageSnapshot {
        RawPageSnapshot {
            title: "Contact us".into(),
            url: "https://example.com/contact".into(),
            headings: (0..30).map(|i| format!("Heading {i}")).collect(),
            forms: vec![RawForm {
                id: Some("contact".into()),
                action: Some("/submit".into()),
                method: Some("post".into()),
                fields: vec![
                    RawField {
                        name: Some("name".into()),
                        field_type: "text".into(),
                        required: true,
                        ..Default::default()
                    },
                    RawField {
                        name: Some("email".into()),
                        field_type: "email".into(),
                        required: true,
                        ..Default::default()
                    },
                ],
            }],
            dom_preview: (0..1_000)
                .map(|i| RawDomElement {
                    tag: "div".into(),
                    text: Some(format!("item {i}")),
                    attrs: BTreeMap::new(),
                    depth: 1,
                })
                .collect(),
            iframes: vec![
                RawIframe {
                    name: Some("recaptcha-widget".into()),
                    src: Some("https://google.com/recaptcha/frame".into()),
                },
                RawIframe {
                    name: None,
                    src: Some("https://google.com/recaptcha/frame".into()),
                },
            ],
            interactive_buttons: vec!["Submit".into()],
            interactive_links: vec!["Home".into()],
            text: "x".repeat(10_000),
        }
    }

    #[test]
    fn headings_capped_at_twenty() {
        let snapshot = build_snapshot(sample_raw(), 0, 500, false);
        assert_eq!(snapshot.context.headings.len(), 20);
    }

    #[test]
    fn text_truncated_to_hard_limit() {
        let snapshot = build_snapshot(sample_raw(), 0, 500, false);
        assert_eq!(snapshot.context.text.chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn dom_preview_shrinks_progressively_across_steps() {
        let cap0 = dom_preview_budget(0, 500);
        let cap1 = dom_preview_budget(1, 500);
        let cap2 = dom_preview_budget(2, 500);
        assert_eq!(cap0, 500);
        assert!(cap1 < cap0);
        assert!(cap2 < cap1);
        assert!(cap2 >= DOM_PREVIEW_FLOOR);
    }

    #[test]
    fn dom_preview_floor_holds_after_many_steps() {
        let cap = dom_preview_budget(50, 500);
        assert_eq!(cap, DOM_PREVIEW_FLOOR);
    }

    #[test]
    fn form_outline_omits_fields_but_counts_types() {
        let snapshot = build_snapshot(sample_raw(), 0, 500, false);
        let form = &snapshot.context.forms[0];
        assert!(form.fields.is_none());
        assert_eq!(form.field_count, 2);
        assert_eq!(form.field_types.get("text"), Some(&1));
        assert_eq!(form.field_types.get("email"), Some(&1));
    }

    #[test]
    fn disclose_forms_fields_returns_full_detail() {
        let snapshot = build_snapshot(sample_raw(), 0, 500, false);
        let value = disclose(&snapshot, "forms[0].fields");
        let fields: Vec<FieldDescriptor> = serde_json::from_value(value).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name.as_deref(), Some("name"));
    }

    #[test]
    fn disclose_unknown_path_is_null_not_error() {
        let snapshot = build_snapshot(sample_raw(), 0, 500, false);
        assert_eq!(disclose(&snapshot, "forms[99].fields"), Value::Null);
        assert_eq!(disclose(&snapshot, "nonsense"), Value::Null);
    }

    #[test]
    fn iframes_deduplicated_by_src_and_captcha_flagged() {
        let snapshot = build_snapshot(sample_raw(), 0, 500, false);
        assert_eq!(snapshot.context.iframes.len(), 1);
        assert!(snapshot.context.iframes[0].is_captcha);
    }

    #[test]
    fn form_focus_drops_headings_and_dom_preview() {
        let snapshot = build_snapshot(sample_raw(), 0, 500, true);
        assert!(snapshot.context.headings.is_empty());
        assert!(snapshot.context.dom_preview.is_empty());
        assert!(!snapshot.context.forms.is_empty());
    }
}
