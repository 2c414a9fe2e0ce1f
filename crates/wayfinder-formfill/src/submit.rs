//! Steps 7-8: recognize a submit control by generic label, and recognize
//! that a submission actually went through.

use once_cell::sync::Lazy;
use regex::Regex;

static SUBMIT_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(submit|send|continue|next|sign up|register|subscribe|save|apply)\b").unwrap());

static SUCCESS_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(thank you|thanks|success|submitted|sent|we.?ll be in touch|received your)\b").unwrap()
});

pub fn is_submit_label(text: &str) -> bool {
    SUBMIT_LABEL_RE.is_match(text)
}

pub fn is_success_banner(text: &str) -> bool {
    SUCCESS_TEXT_RE.is_match(text)
}

#[derive(Clone, Debug, Default)]
pub struct SubmitOutcome {
    pub navigated_away: bool,
    pub success_banner_text: Option<String>,
    pub form_disappeared: bool,
    pub new_validation_errors: bool,
}

/// Step 8's three-signal success detection, folded with the one caveat the
/// spec calls out: new validation errors override an otherwise-plausible
/// success read.
pub fn detect_success(outcome: &SubmitOutcome) -> (bool, f64) {
    if outcome.new_validation_errors {
        return (false, 0.9);
    }
    let signal_hit = outcome.navigated_away
        || outcome.success_banner_text.as_deref().is_some_and(is_success_banner)
        || outcome.form_disappeared;
    if signal_hit {
        (true, 0.9)
    } else {
        // No positive signal and no error either: report submitted with low
        // confidence rather than failing outright (spec.md §4.5 step 8).
        (true, 0.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_generic_submit_verbs() {
        assert!(is_submit_label("Send message"));
        assert!(is_submit_label("Sign Up"));
        assert!(!is_submit_label("Cancel"));
    }

    #[test]
    fn recognizes_success_banner_text() {
        assert!(is_success_banner("Thank you! We'll be in touch soon."));
        assert!(!is_success_banner("Please fix the errors below."));
    }

    #[test]
    fn navigation_away_is_high_confidence_success() {
        let outcome = SubmitOutcome { navigated_away: true, ..Default::default() };
        assert_eq!(detect_success(&outcome), (true, 0.9));
    }

    #[test]
    fn new_validation_errors_override_weak_signals() {
        let outcome = SubmitOutcome {
            form_disappeared: true,
            new_validation_errors: true,
            ..Default::default()
        };
        assert_eq!(detect_success(&outcome), (false, 0.9));
    }

    #[test]
    fn no_signal_reports_low_confidence_success() {
        let outcome = SubmitOutcome::default();
        assert_eq!(detect_success(&outcome), (true, 0.4));
    }
}
