//! Every LLM-assisted component asks for a JSON reply and must survive a
//! model that doesn't quite deliver one (spec.md §4.2 "Failure modes", §9
//! "Free-form LLM responses → structured replies with repair"). This module
//! holds the two pieces every caller needs: pulling a JSON object out of a
//! reply that wraps it in prose or a markdown fence, and building the
//! one-shot repair prompt.

/// Extracts the first top-level `{...}` object from `raw`, tolerating a
/// ```` ```json ... ``` ```` fence or leading/trailing prose. Returns `None`
/// if no balanced brace pair is found.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let bytes = raw.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Best-effort parse: try the raw reply, then the extracted object.
pub fn try_parse<T: serde::de::DeserializeOwned>(raw: &str) -> Option<T> {
    serde_json::from_str(raw.trim())
        .ok()
        .or_else(|| extract_json_object(raw).and_then(|obj| serde_json::from_str(obj).ok()))
}

/// The one-shot repair prompt: re-states the original ask plus the parse
/// error, so the model gets one chance to produce conforming JSON before the
/// caller falls back to a simpler heuristic.
pub fn repair_prompt(original_prompt: &str, bad_reply: &str, parse_error: &str) -> String {
    format!(
        "Your previous reply could not be parsed as JSON.\n\
         Parse error: {parse_error}\n\
         Your reply was:\n{bad_reply}\n\n\
         Reply again to the original request below with ONLY a single valid JSON object, \
         no markdown fence, no prose before or after.\n\n{original_prompt}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Decision {
        decision: String,
    }

    #[test]
    fn parses_clean_json() {
        let parsed: Decision = try_parse(r#"{"decision":"complete"}"#).unwrap();
        assert_eq!(parsed.decision, "complete");
    }

    #[test]
    fn extracts_object_from_markdown_fence() {
        let raw = "Here you go:\n```json\n{\"decision\": \"use_form\"}\n```\nLet me know!";
        let parsed: Decision = try_parse(raw).unwrap();
        assert_eq!(parsed.decision, "use_form");
    }

    #[test]
    fn handles_nested_braces_in_strings() {
        let raw = r#"{"decision": "other", "reason": "text with a { brace }"}"#;
        let obj = extract_json_object(raw).unwrap();
        assert_eq!(obj, raw);
    }

    #[test]
    fn returns_none_for_unbalanced_input() {
        assert!(extract_json_object("not json at all").is_none());
    }
}
