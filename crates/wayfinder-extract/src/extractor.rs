//! Live-page entry point: collects a [`PageSignalScan`] via one
//! `evaluate_script` round trip, then runs the pure pipeline.

use std::collections::HashMap;

use wayfinder_browser::{Cdp, PageId};
use wayfinder_types::model::ExtractionResult;

use crate::errors::ExtractError;
use crate::llm::SemanticValidator;
use crate::pipeline::run_extraction;
use crate::raw::PageSignalScan;

const SIGNAL_SCAN_JS: &str = include_str!("signal_scan.js");

/// Top-level count of candidates whose sample texts are worth an LLM call.
/// Spending a model call on every low-scoring cluster would dwarf the cost
/// of the extraction itself; five is enough to disambiguate a close race.
const MAX_LLM_VALIDATIONS: usize = 5;

pub struct IterativeExtractor<C: Cdp + Send + Sync> {
    cdp: C,
}

impl<C: Cdp + Send + Sync> IterativeExtractor<C> {
    pub fn new(cdp: C) -> Self {
        Self { cdp }
    }

    pub async fn extract(
        &self,
        page: PageId,
        instruction: &str,
        max_items: Option<usize>,
        validator: Option<&dyn SemanticValidator>,
    ) -> Result<ExtractionResult, ExtractError> {
        let raw = self
            .cdp
            .evaluate_script(page, SIGNAL_SCAN_JS)
            .await
            .map_err(|e| ExtractError::DomScan(e.to_string()))?;

        let scan: PageSignalScan = serde_json::from_value(raw)
            .map_err(|e| ExtractError::DomScan(format!("unexpected signal_scan shape: {e}")))?;

        if let Some(validator) = validator {
            let dist = crate::depth::depth_distribution(&scan.ancestors);
            if let Some(depth) = crate::depth::optimal_depth(&dist) {
                let clusters = crate::candidates::generate_candidates(&scan.ancestors, depth);
                let mut scored = crate::rank::score_candidates(&clusters, depth);
                scored.sort_by(|a, b| {
                    b.statistical_score
                        .partial_cmp(&a.statistical_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });

                let mut validations = HashMap::new();
                for candidate in scored.into_iter().take(MAX_LLM_VALIDATIONS) {
                    let verdict = validator.validate(&candidate.selector, &candidate.sample_texts).await;
                    validations.insert(candidate.selector, verdict);
                }

                return Ok(run_extraction(&scan, instruction, max_items, Some(&validations)));
            }
        }

        Ok(run_extraction(&scan, instruction, max_items, None))
    }
}
