//! Wires together steps 1-8 of the detector/extractor pipeline into one pure
//! function, [`run_extraction`], that the async [`crate::extractor`] wrapper
//! calls after pulling a [`PageSignalScan`] off the live page.

use wayfinder_types::model::ExtractionResult;

use crate::candidates::{generate_candidates, MIN_CLUSTER_FLOOR};
use crate::depth::{depth_distribution, optimal_depth};
use crate::fields::{extract_products, locate_fields};
use crate::filters::{apply_filters, parse_filters};
use crate::rank::{combine_confidence, pick_winner, score_candidates, LlmValidation};
use crate::raw::PageSignalScan;

/// Step 1: below this many price-like or product-shaped-anchor signals, a
/// page isn't worth running the rest of the pipeline on.
pub const NON_LISTING_FLOOR: usize = MIN_CLUSTER_FLOOR;

pub fn quick_page_check(scan: &PageSignalScan) -> bool {
    scan.price_like_count >= NON_LISTING_FLOOR || scan.product_anchor_count >= NON_LISTING_FLOOR
}

/// Runs the full pipeline against an already-collected signal scan.
/// `llm_validations` is keyed by candidate selector, filled in by an LLM pass
/// over each candidate's `sample_texts` (step 6); pass `None` to skip that
/// fold entirely (degrading gracefully to pure statistics, spec.md §4.4
/// Non-goal on requiring an LLM call).
pub fn run_extraction(
    scan: &PageSignalScan,
    instruction: &str,
    max_items: Option<usize>,
    llm_validations: Option<&std::collections::HashMap<String, LlmValidation>>,
) -> ExtractionResult {
    if !quick_page_check(scan) {
        return ExtractionResult {
            products: Vec::new(),
            count: 0,
            reason: Some("page_type_mismatch".to_string()),
            container: None,
            metadata: serde_json::json!({
                "price_like_count": scan.price_like_count,
                "product_anchor_count": scan.product_anchor_count,
            }),
        };
    }

    let dist = depth_distribution(&scan.ancestors);
    let Some(depth) = optimal_depth(&dist) else {
        return ExtractionResult {
            products: Vec::new(),
            count: 0,
            reason: Some("no_viable_container".to_string()),
            container: None,
            metadata: serde_json::json!({}),
        };
    };

    let clusters = generate_candidates(&scan.ancestors, depth);
    if clusters.is_empty() {
        return ExtractionResult {
            products: Vec::new(),
            count: 0,
            reason: Some("no_viable_container".to_string()),
            container: None,
            metadata: serde_json::json!({ "optimal_depth": depth }),
        };
    }

    let mut scored = score_candidates(&clusters, depth);
    if let Some(validations) = llm_validations {
        for candidate in &mut scored {
            if let Some(verdict) = validations.get(&candidate.selector) {
                candidate.llm_confidence = Some(verdict.confidence);
                candidate.combined_confidence =
                    combine_confidence(candidate.statistical_score, Some(verdict));
            }
        }
    }

    let metadata = serde_json::json!({
        "optimal_depth": depth,
        "candidate_count": scored.len(),
        "depth_histogram": dist.iter().map(|(d, s)| (d.to_string(), s.element_count)).collect::<std::collections::BTreeMap<_, _>>(),
    });

    let Some(winner) = pick_winner(scored) else {
        return ExtractionResult {
            products: Vec::new(),
            count: 0,
            reason: Some("no_viable_container".to_string()),
            container: None,
            metadata,
        };
    };

    let cluster = clusters
        .iter()
        .find(|c| c.members.len() == winner.count && c.members.first().map(|m| m.depth) == Some(winner.depth))
        .unwrap_or(&clusters[0]);
    let locations = locate_fields(&cluster.members);
    let mut products = extract_products(&cluster.members, &locations);

    let filters = parse_filters(instruction);
    products = apply_filters(products, &filters);

    if let Some(max) = max_items {
        products.truncate(max);
    }

    let reason = if products.is_empty() {
        Some("partial_fields".to_string())
    } else {
        None
    };

    ExtractionResult {
        count: products.len(),
        products,
        reason,
        container: Some(winner),
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawAncestor;

    fn listing_scan() -> PageSignalScan {
        let ancestors = (0..8)
            .map(|i| RawAncestor {
                tag: "li".into(),
                class_list: vec!["product-card".into()],
                depth: 4,
                has_price: true,
                has_link: true,
                has_image: true,
                heading_text: Some(format!("Widget {i}")),
                price_text: Some(format!("${}.99", 10 + i)),
                anchor_href: Some(format!("/p/widget-{i}")),
                image_src: Some(format!("/img/{i}.jpg")),
                sample_text: format!("Widget {i} ${}.99", 10 + i),
                ..Default::default()
            })
            .collect();
        PageSignalScan {
            price_like_count: 8,
            product_anchor_count: 8,
            ancestors,
        }
    }

    #[test]
    fn rejects_sparse_page_before_deep_analysis() {
        let scan = PageSignalScan {
            price_like_count: 1,
            product_anchor_count: 0,
            ancestors: vec![],
        };
        let result = run_extraction(&scan, "find products", None, None);
        assert_eq!(result.reason.as_deref(), Some("page_type_mismatch"));
        assert!(result.products.is_empty());
    }

    #[test]
    fn extracts_products_from_a_clean_listing() {
        let scan = listing_scan();
        let result = run_extraction(&scan, "show me widgets", None, None);
        assert_eq!(result.count, 8);
        assert!(result.container.is_some());
        assert!(result.reason.is_none());
    }

    #[test]
    fn applies_price_filter_from_instruction() {
        let scan = listing_scan();
        let result = run_extraction(&scan, "widgets under $13", None, None);
        assert!(result.count < 8);
        for p in &result.products {
            let price = p["price"].as_f64().unwrap();
            assert!(price < 13.0);
        }
    }

    #[test]
    fn truncates_to_max_items() {
        let scan = listing_scan();
        let result = run_extraction(&scan, "show me widgets", Some(3), None);
        assert_eq!(result.count, 3);
    }
}
