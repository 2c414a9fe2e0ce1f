//! Step 6: find the consent checkbox, if any, without naming a site-specific
//! selector.

use once_cell::sync::Lazy;
use regex::Regex;

static CONSENT_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(i agree|terms (?:and|&) conditions|privacy policy|consent|opt.?in)\b").unwrap()
});

#[derive(Clone, Debug, Default)]
pub struct CheckboxCandidate {
    pub required: bool,
    pub label_text: Option<String>,
    pub selector: String,
}

/// Picks the first required checkbox, or the first whose label reads like a
/// consent notice. Returns `None` if neither signal is present.
pub fn find_consent_checkbox(candidates: &[CheckboxCandidate]) -> Option<&CheckboxCandidate> {
    candidates.iter().find(|c| c.required).or_else(|| {
        candidates
            .iter()
            .find(|c| c.label_text.as_deref().is_some_and(|t| CONSENT_TEXT_RE.is_match(t)))
    })
}
