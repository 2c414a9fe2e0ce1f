//! Step 4: detect whether a field is showing a validation error, from
//! signals that are generic across form frameworks rather than tied to any
//! one site's markup.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A small, deliberately generic set of error-class prefixes used across
/// common form frameworks. These are signals, never site-specific selectors.
const ERROR_CLASS_PREFIXES: &[&str] = &["error", "invalid", "is-invalid", "has-error", "field-error"];

static INVALID_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(required|invalid|must (?:be|contain|match)|please (?:enter|provide|correct)|this field)\b").unwrap()
});

/// Mirrors the per-field signal bundle collected via `evaluate_script`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMarkers {
    pub aria_invalid: bool,
    #[serde(default)]
    pub class_list: Vec<String>,
    pub adjacent_text: Option<String>,
}

/// Returns a human-readable reason if the field looks invalid, or `None` if
/// it looks clean.
pub fn detect_validation_error(markers: &ValidationMarkers) -> Option<String> {
    if markers.aria_invalid {
        return Some("aria-invalid".to_string());
    }
    if let Some(class) = markers
        .class_list
        .iter()
        .find(|c| ERROR_CLASS_PREFIXES.iter().any(|p| c.to_lowercase().starts_with(p)))
    {
        return Some(format!("error class: {class}"));
    }
    if let Some(text) = &markers.adjacent_text {
        if INVALID_TEXT_RE.is_match(text) {
            return Some(text.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aria_invalid_is_detected() {
        let markers = ValidationMarkers { aria_invalid: true, ..Default::default() };
        assert!(detect_validation_error(&markers).is_some());
    }

    #[test]
    fn error_class_prefix_is_detected() {
        let markers = ValidationMarkers {
            class_list: vec!["is-invalid".to_string()],
            ..Default::default()
        };
        assert!(detect_validation_error(&markers).is_some());
    }

    #[test]
    fn adjacent_text_pattern_is_detected() {
        let markers = ValidationMarkers {
            adjacent_text: Some("This field is required".to_string()),
            ..Default::default()
        };
        assert!(detect_validation_error(&markers).is_some());
    }

    #[test]
    fn clean_field_has_no_error() {
        let markers = ValidationMarkers {
            class_list: vec!["form-control".to_string()],
            adjacent_text: Some("Optional, used for shipping updates".to_string()),
            ..Default::default()
        };
        assert!(detect_validation_error(&markers).is_none());
    }
}
