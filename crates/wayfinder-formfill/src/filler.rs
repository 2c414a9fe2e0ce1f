//! The async entry point: `fill_form(page, instruction, form_fields, llm)`
//! from spec.md §4.5, wired against [`wayfinder_browser::Cdp`] and the pure
//! logic in the sibling modules.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};
use wayfinder_browser::{Cdp, PageId};
use wayfinder_types::model::{FieldDescriptor, FieldFillRecord, FieldFillStatus, FormFillResult};

use crate::consent::{find_consent_checkbox, CheckboxCandidate};
use crate::dom_ops;
use crate::errors::FormFillError;
use crate::llm::{build_prompt, parse_decision, FieldLlm};
use crate::priority::order_fields;
use crate::remediation::remediate;
use crate::submit::{detect_success, is_submit_label, SubmitOutcome};
use crate::validation::{detect_validation_error, ValidationMarkers};

/// A field whose value came straight from the instruction (rather than an
/// LLM guess) always wins for the *initial* value, and an LLM guess always
/// beats a canonical default (spec.md §4.5 invariant). This governs only
/// which value is picked first — once a validation error appears, every
/// field retries through the same remediation/LLM-reprompt path regardless
/// of where its current value came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
enum ValueOrigin {
    Default,
    Llm,
    Instruction,
}

pub struct PerFieldFormFiller<'a, C: Cdp + Send + Sync> {
    cdp: &'a C,
    site_domain: String,
    max_same_error: u32,
    submit_wait: Duration,
}

impl<'a, C: Cdp + Send + Sync> PerFieldFormFiller<'a, C> {
    pub fn new(cdp: &'a C, site_domain: impl Into<String>, max_same_error: u32, submit_wait_ms: u64) -> Self {
        Self {
            cdp,
            site_domain: site_domain.into(),
            max_same_error,
            submit_wait: Duration::from_millis(submit_wait_ms),
        }
    }

    pub async fn fill_form(
        &self,
        page: PageId,
        instruction: &str,
        form_fields: &[FieldDescriptor],
        instruction_values: &BTreeMap<String, String>,
        llm: &dyn FieldLlm,
    ) -> Result<FormFillResult, FormFillError> {
        let ordered = order_fields(form_fields, instruction);
        let mut records: BTreeMap<String, FieldFillRecord> = BTreeMap::new();
        let mut already_filled: Vec<(String, String)> = Vec::new();
        let mut errors = Vec::new();

        for field in ordered {
            let key = field.name.clone().or_else(|| field.id.clone()).unwrap_or_else(|| "field".to_string());
            let record = self
                .fill_one_field(&page, field, instruction, instruction_values, &already_filled, llm)
                .await;
            if record.status == FieldFillStatus::Filled {
                if let Some(v) = &record.value {
                    already_filled.push((key.clone(), v.clone()));
                }
            }
            if let Some(err) = &record.last_error {
                if record.status == FieldFillStatus::Failed {
                    errors.push(format!("{key}: {err}"));
                }
            }
            records.insert(key, record);
        }

        self.handle_consent(&page).await;

        let filled_count = records.values().filter(|r| r.status == FieldFillStatus::Filled).count();
        let submitted = self.submit(&page, instruction).await.unwrap_or_else(|err| {
            errors.push(err.to_string());
            false
        });

        Ok(FormFillResult { fields_filled: records, filled_count, submitted, errors })
    }

    async fn fill_one_field(
        &self,
        page: &PageId,
        field: &FieldDescriptor,
        instruction: &str,
        instruction_values: &BTreeMap<String, String>,
        already_filled: &[(String, String)],
        llm: &dyn FieldLlm,
    ) -> FieldFillRecord {
        let Some(selector) = dom_ops::field_selector(field) else {
            return FieldFillRecord {
                status: FieldFillStatus::Skipped,
                value: None,
                attempts: 0,
                last_error: Some("no resolvable selector".to_string()),
            };
        };

        let instruction_value = field.name.as_ref().and_then(|n| instruction_values.get(n).cloned());

        let (mut value, _origin) = match instruction_value {
            Some(v) => (v, ValueOrigin::Instruction),
            None => match self.ask_llm(page, instruction, already_filled, field, None, llm).await {
                Some(decision) if decision.skip => {
                    return FieldFillRecord {
                        status: FieldFillStatus::Skipped,
                        value: None,
                        attempts: 1,
                        last_error: decision.reason,
                    };
                }
                Some(decision) => match decision.value {
                    Some(v) => (v, ValueOrigin::Llm),
                    None => {
                        return FieldFillRecord {
                            status: FieldFillStatus::Skipped,
                            value: None,
                            attempts: 1,
                            last_error: Some("llm returned no value".to_string()),
                        };
                    }
                },
                None => {
                    return self.retry_llm_for_value(page, instruction, already_filled, field, llm).await;
                }
            },
        };

        let mut attempts = 0u32;
        let mut last_error = None;
        let mut same_error_count = 0u32;
        let mut last_error_signature: Option<String> = None;

        loop {
            attempts += 1;
            if let Err(err) = self.try_fill(page, &selector, &value).await {
                last_error = Some(err.to_string());
                return FieldFillRecord { status: FieldFillStatus::Failed, value: Some(value), attempts, last_error };
            }

            match self.read_validation_markers(page, &selector).await {
                Ok(markers) => match detect_validation_error(&markers) {
                    None => {
                        return FieldFillRecord {
                            status: FieldFillStatus::Filled,
                            value: Some(value),
                            attempts,
                            last_error: None,
                        };
                    }
                    Some(error) => {
                        if last_error_signature.as_deref() == Some(error.as_str()) {
                            same_error_count += 1;
                        } else {
                            same_error_count = 1;
                            last_error_signature = Some(error.clone());
                        }
                        last_error = Some(error.clone());

                        if same_error_count > self.max_same_error {
                            return FieldFillRecord {
                                status: FieldFillStatus::Failed,
                                value: Some(value),
                                attempts,
                                last_error,
                            };
                        }

                        if let Some(fixed) = remediate(field, &value, &self.site_domain) {
                            value = fixed;
                            continue;
                        }

                        match self.ask_llm(page, instruction, already_filled, field, Some(&error), llm).await {
                            Some(decision) if decision.value.is_some() => {
                                value = decision.value.unwrap();
                                continue;
                            }
                            _ => {
                                return FieldFillRecord {
                                    status: FieldFillStatus::Failed,
                                    value: Some(value),
                                    attempts,
                                    last_error,
                                };
                            }
                        }
                    }
                },
                Err(err) => {
                    warn!(field = ?field.name, error = %err, "failed to read validation markers");
                    return FieldFillRecord {
                        status: FieldFillStatus::Filled,
                        value: Some(value),
                        attempts,
                        last_error: None,
                    };
                }
            }
        }
    }

    async fn retry_llm_for_value(
        &self,
        page: &PageId,
        instruction: &str,
        already_filled: &[(String, String)],
        field: &FieldDescriptor,
        llm: &dyn FieldLlm,
    ) -> FieldFillRecord {
        for attempt in 1..=3u32 {
            if let Some(decision) = self.ask_llm(page, instruction, already_filled, field, None, llm).await {
                if decision.skip {
                    return FieldFillRecord { status: FieldFillStatus::Skipped, value: None, attempts: attempt, last_error: decision.reason };
                }
                if let Some(value) = decision.value {
                    let selector = dom_ops::field_selector(field);
                    if let Some(selector) = selector {
                        if self.try_fill(page, &selector, &value).await.is_ok() {
                            return FieldFillRecord { status: FieldFillStatus::Filled, value: Some(value), attempts: attempt, last_error: None };
                        }
                    }
                }
            }
        }
        FieldFillRecord {
            status: FieldFillStatus::Skipped,
            value: None,
            attempts: 3,
            last_error: Some("llm reply unparseable after 3 attempts".to_string()),
        }
    }

    async fn ask_llm(
        &self,
        _page: &PageId,
        instruction: &str,
        already_filled: &[(String, String)],
        field: &FieldDescriptor,
        last_error: Option<&str>,
        llm: &dyn FieldLlm,
    ) -> Option<crate::llm::FieldDecision> {
        let prompt = build_prompt(instruction, already_filled, field, last_error);
        match llm.invoke(&prompt).await {
            Ok(raw) => parse_decision(&raw),
            Err(err) => {
                warn!(field = ?field.name, error = %err, "field llm call failed");
                None
            }
        }
    }

    async fn try_fill(&self, page: &PageId, selector: &str, value: &str) -> Result<(), FormFillError> {
        let primitive = dom_ops::fill_primitive_js(selector, value);
        if self.eval(page, &primitive).await.is_ok_and(|v| v.get("status").and_then(Value::as_str) == Some("ok")) {
            return Ok(());
        }

        debug!(selector, "primitive fill missed, trying char-by-char typing");
        if self
            .cdp
            .type_text(page.clone(), selector, value, Duration::from_secs(5))
            .await
            .is_ok()
        {
            return Ok(());
        }

        debug!(selector, "char typing missed, trying native setter");
        let native = dom_ops::fill_native_setter_js(selector, value);
        let result = self.eval(page, &native).await?;
        if result.get("status").and_then(Value::as_str) == Some("ok") {
            Ok(())
        } else {
            Err(FormFillError::Dom(format!("could not fill selector {selector}")))
        }
    }

    async fn read_validation_markers(&self, page: &PageId, selector: &str) -> Result<ValidationMarkers, FormFillError> {
        let script = dom_ops::validation_markers_js(selector);
        let value = self.eval(page, &script).await?;
        serde_json::from_value(value).map_err(|e| FormFillError::Dom(e.to_string()))
    }

    async fn handle_consent(&self, page: &PageId) {
        let Ok(value) = self.eval(page, dom_ops::consent_checkboxes_js()).await else { return };
        let Ok(candidates) = serde_json::from_value::<Vec<RawCheckbox>>(value) else { return };
        let candidates: Vec<CheckboxCandidate> = candidates
            .into_iter()
            .map(|c| CheckboxCandidate { required: c.required, label_text: c.label_text, selector: c.selector })
            .collect();
        if let Some(found) = find_consent_checkbox(&candidates) {
            let script = dom_ops::click_checkbox_js(&found.selector);
            let _ = self.eval(page, &script).await;
        }
    }

    async fn submit(&self, page: &PageId, _instruction: &str) -> Result<bool, FormFillError> {
        let value = self.eval(page, dom_ops::candidate_submit_controls_js()).await?;
        let candidates: Vec<RawSubmitControl> =
            serde_json::from_value(value).map_err(|e| FormFillError::Dom(e.to_string()))?;

        let chosen = candidates
            .iter()
            .find(|c| c.is_type_submit)
            .or_else(|| candidates.iter().find(|c| is_submit_label(&c.text)));

        let Some(chosen) = chosen else {
            return Ok(false);
        };

        let click_script = dom_ops::click_by_index_js(
            r#"button, input[type="submit"], input[type="button"]"#,
            chosen.index,
        );
        self.eval(page, &click_script).await?;

        tokio::time::sleep(self.submit_wait).await;

        let snapshot = self.eval(page, &dom_ops::page_snapshot_for_success_js("")).await?;
        let form_still_present = snapshot.get("formStillPresent").and_then(Value::as_bool).unwrap_or(true);

        let outcome = SubmitOutcome {
            navigated_away: false,
            success_banner_text: snapshot.get("bodyTextSample").and_then(Value::as_str).map(str::to_string),
            form_disappeared: !form_still_present,
            new_validation_errors: false,
        };
        let (submitted, confidence) = detect_success(&outcome);
        info!(submitted, confidence, "form submit outcome");
        Ok(submitted)
    }

    async fn eval(&self, page: &PageId, script: &str) -> Result<Value, FormFillError> {
        self.cdp
            .evaluate_script(page.clone(), script)
            .await
            .map_err(|e| FormFillError::Dom(e.to_string()))
    }
}

#[derive(serde::Deserialize)]
struct RawCheckbox {
    required: bool,
    #[serde(default)]
    label_text: Option<String>,
    selector: String,
}

#[derive(serde::Deserialize)]
struct RawSubmitControl {
    text: String,
    #[serde(rename = "isTypeSubmit")]
    is_type_submit: bool,
    index: usize,
}
