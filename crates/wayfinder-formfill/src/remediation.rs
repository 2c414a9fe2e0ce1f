//! Step 4's bounded remediation: cheap, deterministic fixes tried before
//! spending another LLM call on the same field.

use wayfinder_types::model::FieldDescriptor;

/// Tries a deterministic fix for a known error shape. Returns `None` when no
/// deterministic fix applies, signalling the caller should re-ask the LLM
/// with the error message in context instead.
pub fn remediate(field: &FieldDescriptor, original_value: &str, site_domain: &str) -> Option<String> {
    if field.field_type == "email" {
        match original_value.split_once('@') {
            None => {
                let local = original_value
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .collect::<String>()
                    .to_lowercase();
                let local = if local.is_empty() { "contact".to_string() } else { local };
                return Some(format!("{local}@{site_domain}"));
            }
            Some((local, domain)) if !domain.eq_ignore_ascii_case(site_domain) => {
                return Some(format!("{local}@{site_domain}"));
            }
            Some(_) => {}
        }
    }

    if field.required && original_value.trim().is_empty() {
        return Some(default_value_for(field));
    }

    None
}

fn default_value_for(field: &FieldDescriptor) -> String {
    match field.field_type.as_str() {
        "tel" => "0000000000".to_string(),
        "number" => "1".to_string(),
        "checkbox" => "true".to_string(),
        _ => field
            .placeholder
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "N/A".to_string()),
    }
}
