//! Label redaction for metrics and run-log sidecar payloads.
//!
//! The Run Logger (spec.md §4.7) writes full prompts, URLs, and DOM text to
//! disk; this module provides the opt-in policy that keeps obviously
//! sensitive values (emails, tokens) out of metric label sets while leaving
//! the sidecar payloads themselves untouched (those are explicitly meant to
//! carry the full record for debugging).

use std::collections::BTreeMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

pub type PrivacyLabelMap = BTreeMap<String, String>;

#[derive(Clone, Debug)]
pub struct PrivacyPolicyView {
    pub enable: bool,
}

impl Default for PrivacyPolicyView {
    fn default() -> Self {
        Self { enable: false }
    }
}

static POLICY: Lazy<RwLock<PrivacyPolicyView>> =
    Lazy::new(|| RwLock::new(PrivacyPolicyView::default()));

pub mod policy {
    use super::*;

    pub fn set_policy(view: PrivacyPolicyView) {
        *POLICY.write().unwrap() = view;
    }

    pub fn current_policy() -> PrivacyPolicyView {
        POLICY.read().unwrap().clone()
    }

    pub use super::PrivacyPolicyView;
}

fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

fn host_only(value: &str) -> String {
    let without_scheme = value
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(value);
    without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme)
        .to_string()
}

fn redact_hash(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}

/// Sanitize a label map: drop keys that look like direct PII identifiers
/// (`user`, `email`), hash values that contain PII-like tokens, and reduce
/// URL-shaped `origin` values to their host.
pub fn sanitize_labels(kv: PrivacyLabelMap) -> PrivacyLabelMap {
    if !policy::current_policy().enable {
        return kv;
    }
    let mut out = PrivacyLabelMap::new();
    for (key, value) in kv {
        if key == "user" || key == "email" {
            continue;
        }
        if key == "origin" {
            out.insert(key, host_only(&value));
            continue;
        }
        if looks_like_email(&value) {
            out.insert(key, redact_hash(&value));
        } else {
            out.insert(key, value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enable_privacy() {
        policy::set_policy(PrivacyPolicyView { enable: true });
    }

    #[test]
    fn test_host_only() {
        enable_privacy();
        let mut labels = PrivacyLabelMap::new();
        labels.insert("origin".into(), "https://example.com/path".into());
        let sanitized = sanitize_labels(labels);
        assert_eq!(sanitized.get("origin").unwrap(), "example.com");
    }

    #[test]
    fn test_redact_pii() {
        enable_privacy();
        let mut labels = PrivacyLabelMap::new();
        labels.insert("user".into(), "user@example.com".into());
        labels.insert("note".into(), "user@example.com".into());
        let sanitized = sanitize_labels(labels);
        assert!(!sanitized.contains_key("user"));
        let note = sanitized.get("note").unwrap();
        assert!(note.starts_with("sha256:"));
        assert!(!note.contains("user@example.com"));
    }
}
