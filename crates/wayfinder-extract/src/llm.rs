//! The slice of the text-completion LLM-backend contract the extractor needs
//! for step 6's optional semantic validation pass. Mirrors the
//! `invoke(prompt, options) -> text` shape the core assumes everywhere an
//! LLM is consulted.

use async_trait::async_trait;

use crate::rank::LlmValidation;

#[async_trait]
pub trait SemanticValidator: Send + Sync {
    /// Given a candidate's sample texts, returns a best-effort verdict on
    /// whether they really look like product entries. Implementations are
    /// expected to be robust to malformed JSON coming back from the model;
    /// a parse failure should surface as `Ok(LlmValidation { is_valid: false, confidence: 0.0 })`
    /// rather than an error, so one bad candidate never aborts the whole run.
    async fn validate(&self, selector: &str, sample_texts: &[String]) -> LlmValidation;
}

pub fn parse_validation_response(raw: &str) -> LlmValidation {
    #[derive(serde::Deserialize)]
    struct Response {
        #[serde(default)]
        is_product_listing: bool,
        #[serde(default)]
        confidence: f64,
    }

    match serde_json::from_str::<Response>(raw.trim()) {
        Ok(parsed) => LlmValidation {
            is_valid: parsed.is_product_listing,
            confidence: parsed.confidence.clamp(0.0, 1.0),
        },
        Err(_) => LlmValidation { is_valid: false, confidence: 0.0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_response() {
        let v = parse_validation_response(r#"{"is_product_listing": true, "confidence": 0.87}"#);
        assert!(v.is_valid);
        assert!((v.confidence - 0.87).abs() < 1e-9);
    }

    #[test]
    fn malformed_response_degrades_to_invalid() {
        let v = parse_validation_response("not json at all");
        assert!(!v.is_valid);
        assert_eq!(v.confidence, 0.0);
    }

    #[test]
    fn clamps_out_of_range_confidence() {
        let v = parse_validation_response(r#"{"is_product_listing": true, "confidence": 4.0}"#);
        assert_eq!(v.confidence, 1.0);
    }
}
