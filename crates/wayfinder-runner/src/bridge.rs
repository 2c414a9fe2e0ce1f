//! Thin adapters wiring the generic [`LlmClient`] text interface into the
//! narrower LLM contracts `wayfinder-formfill` and `wayfinder-extract`
//! declare for themselves. The Task Runner is the composition root: it is
//! the only crate that needs to know both the wide contract (text + vision,
//! retry/backoff) and the narrow ones each downstream component asks for.

use std::sync::Arc;

use async_trait::async_trait;

use wayfinder_extract::rank::LlmValidation;
use wayfinder_extract::SemanticValidator;
use wayfinder_formfill::errors::FormFillError;
use wayfinder_formfill::llm::FieldLlm;
use wayfinder_llm::{invoke_with_retry, LlmClient, LlmOptions};

pub struct LlmFieldAdapter {
    client: Arc<dyn LlmClient>,
    options: LlmOptions,
    max_retries: u32,
}

impl LlmFieldAdapter {
    pub fn new(client: Arc<dyn LlmClient>, options: LlmOptions, max_retries: u32) -> Self {
        Self { client, options, max_retries }
    }
}

#[async_trait]
impl FieldLlm for LlmFieldAdapter {
    async fn invoke(&self, prompt: &str) -> Result<String, FormFillError> {
        invoke_with_retry(self.client.as_ref(), prompt, &self.options, self.max_retries)
            .await
            .map_err(|e| FormFillError::Llm(e.to_string()))
    }
}

pub struct LlmSemanticAdapter {
    client: Arc<dyn LlmClient>,
    options: LlmOptions,
    max_retries: u32,
}

impl LlmSemanticAdapter {
    pub fn new(client: Arc<dyn LlmClient>, options: LlmOptions, max_retries: u32) -> Self {
        Self { client, options, max_retries }
    }
}

#[async_trait]
impl SemanticValidator for LlmSemanticAdapter {
    async fn validate(&self, selector: &str, sample_texts: &[String]) -> LlmValidation {
        let prompt = format!(
            "Is this repeated page element (selector `{selector}`) a product container, a \
             navigation element, a carousel wrapper, an ad, or something else?\n\
             Sample texts: {:?}\n\
             Reply with JSON only: {{\"is_product_listing\": bool, \"confidence\": number 0-1}}",
            sample_texts
        );
        match invoke_with_retry(self.client.as_ref(), &prompt, &self.options, self.max_retries).await {
            Ok(raw) => wayfinder_extract::llm::parse_validation_response(&raw),
            Err(_) => LlmValidation { is_valid: false, confidence: 0.0 },
        }
    }
}
