//! Step 2: the per-field LLM prompt and its `{value, skip, reason, confidence}`
//! response contract. Prompts stay small (a few hundred tokens) regardless of
//! form size because only the already-filled summary and the current field's
//! descriptor are included, never the whole form.

use async_trait::async_trait;
use wayfinder_types::model::FieldDescriptor;

#[async_trait]
pub trait FieldLlm: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<String, crate::errors::FormFillError>;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldDecision {
    pub value: Option<String>,
    pub skip: bool,
    pub reason: Option<String>,
    pub confidence: f64,
}

pub fn build_prompt(
    instruction: &str,
    already_filled: &[(String, String)],
    field: &FieldDescriptor,
    last_error: Option<&str>,
) -> String {
    let filled_summary = if already_filled.is_empty() {
        "(none yet)".to_string()
    } else {
        already_filled
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut prompt = format!(
        "Instruction: {instruction}\n\
         Fields already filled: {filled_summary}\n\
         Current field: name={:?} type={} label={:?} required={} placeholder={:?}\n",
        field.name, field.field_type, field.label, field.required, field.placeholder
    );

    if !field.options.is_empty() {
        prompt.push_str(&format!("Allowed options: {}\n", field.options.join(", ")));
    }
    if let Some(err) = last_error {
        prompt.push_str(&format!("Previous attempt was rejected with: {err}\n"));
    }
    prompt.push_str(
        "Reply with JSON only: {\"value\": string or null, \"skip\": bool, \"reason\": string, \"confidence\": number 0-1}",
    );
    prompt
}

/// Parses the model's JSON reply. An unparseable reply degrades to a
/// low-confidence skip rather than propagating an error, so one bad
/// completion never aborts the whole field-fill loop (spec.md §4.5 failure
/// modes: three unparseable replies in a row mark the field `skipped`).
pub fn parse_decision(raw: &str) -> Option<FieldDecision> {
    #[derive(serde::Deserialize)]
    struct Raw {
        value: Option<String>,
        #[serde(default)]
        skip: bool,
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        confidence: f64,
    }

    let trimmed = raw.trim();
    let json_slice = extract_json_object(trimmed)?;
    let parsed: Raw = serde_json::from_str(json_slice).ok()?;
    Some(FieldDecision {
        value: parsed.value,
        skip: parsed.skip,
        reason: parsed.reason,
        confidence: parsed.confidence.clamp(0.0, 1.0),
    })
}

/// Models often wrap JSON in prose or a code fence; take the first balanced
/// `{...}` span instead of requiring the whole reply to be valid JSON.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0i32;
    for (i, c) in text[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
