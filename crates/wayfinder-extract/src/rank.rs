//! Step 5: turn clusters into scored [`ContainerCandidate`]s, and step 6:
//! fold in an optional LLM semantic-validation pass.

use wayfinder_types::model::ContainerCandidate;

use crate::candidates::Cluster;

/// Result of an LLM pass over a candidate's sample texts (spec.md §4.4 step 6).
#[derive(Clone, Debug)]
pub struct LlmValidation {
    pub is_valid: bool,
    pub confidence: f64,
}

pub fn score_candidates(clusters: &[Cluster<'_>], optimal_depth: u32) -> Vec<ContainerCandidate> {
    if clusters.is_empty() {
        return Vec::new();
    }

    let max_count = clusters.iter().map(|c| c.members.len()).max().unwrap_or(1).max(1) as f64;
    let mean_count =
        clusters.iter().map(|c| c.members.len()).sum::<usize>() as f64 / clusters.len() as f64;

    clusters
        .iter()
        .map(|cluster| {
            let count = cluster.members.len();
            let count_norm = count as f64 / max_count;

            let completeness = [
                cluster.signature.has_price,
                cluster.signature.has_link,
                cluster.signature.has_image,
            ]
            .iter()
            .filter(|b| **b)
            .count() as f64
                / 3.0;

            let depth = cluster
                .members
                .first()
                .map(|m| m.depth)
                .unwrap_or(optimal_depth);
            let depth_alignment = 1.0 - (depth as f64 - optimal_depth as f64).abs() / 2.0;
            let depth_alignment = depth_alignment.clamp(0.0, 1.0);

            let freq_vs_mean = if mean_count > 0.0 {
                (count as f64 / mean_count).min(1.5) / 1.5
            } else {
                0.0
            };

            let statistical_score =
                0.35 * count_norm + 0.30 * completeness + 0.20 * depth_alignment + 0.15 * freq_vs_mean;

            let selector = shared_selector(&cluster.signature.tag, cluster.members.as_slice());
            let sample_texts = cluster
                .members
                .iter()
                .take(5)
                .map(|m| m.sample_text.clone())
                .collect();

            ContainerCandidate {
                selector,
                count,
                depth,
                has_price: cluster.signature.has_price,
                has_link: cluster.signature.has_link,
                has_image: cluster.signature.has_image,
                sample_texts,
                statistical_score,
                llm_confidence: None,
                combined_confidence: statistical_score,
            }
        })
        .collect()
}

/// A selector is only as specific as the class every member of the cluster
/// actually carries; otherwise fall back to the bare tag name.
fn shared_selector(tag: &str, members: &[&crate::raw::RawAncestor]) -> String {
    let Some(first) = members.first() else {
        return tag.to_string();
    };
    for class in &first.class_list {
        if members.iter().all(|m| m.class_list.iter().any(|c| c == class)) {
            return format!("{tag}.{class}");
        }
    }
    tag.to_string()
}

/// Applies an LLM validation verdict to a candidate's confidence. A rejected
/// verdict sharply discounts the statistical score rather than zeroing it,
/// since the detector can legitimately disagree with a noisy LLM call.
pub fn combine_confidence(statistical_score: f64, llm: Option<&LlmValidation>) -> f64 {
    match llm {
        Some(v) if v.is_valid => 0.5 * statistical_score + 0.5 * v.confidence,
        Some(_) => statistical_score * 0.3,
        None => statistical_score,
    }
}

pub fn pick_winner(mut candidates: Vec<ContainerCandidate>) -> Option<ContainerCandidate> {
    candidates.sort_by(|a, b| {
        b.combined_confidence
            .partial_cmp(&a.combined_confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::Signature;
    use crate::raw::RawAncestor;

    fn member(class: &str) -> RawAncestor {
        RawAncestor {
            tag: "li".into(),
            class_list: vec![class.into()],
            depth: 3,
            has_price: true,
            has_link: true,
            has_image: true,
            sample_text: "Widget $9.99".into(),
            ..Default::default()
        }
    }

    #[test]
    fn scores_candidate_with_complete_signals_highly() {
        let members = vec![member("product"), member("product"), member("product")];
        let refs: Vec<&RawAncestor> = members.iter().collect();
        let cluster = Cluster {
            signature: Signature {
                tag: "li".into(),
                class_count: 1,
                has_price: true,
                has_link: true,
                has_image: true,
            },
            members: refs,
        };
        let scored = score_candidates(&[cluster], 3);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].selector, "li.product");
        assert!(scored[0].statistical_score > 0.8);
    }

    #[test]
    fn combine_confidence_discounts_rejected_llm_verdict() {
        let rejected = LlmValidation { is_valid: false, confidence: 0.9 };
        assert!(combine_confidence(0.8, Some(&rejected)) < 0.3);
    }

    #[test]
    fn combine_confidence_boosts_confirmed_llm_verdict() {
        let confirmed = LlmValidation { is_valid: true, confidence: 0.9 };
        let combined = combine_confidence(0.6, Some(&confirmed));
        assert!((combined - 0.75).abs() < 1e-9);
    }

    #[test]
    fn pick_winner_prefers_highest_combined_confidence() {
        let weak = ContainerCandidate {
            selector: "div".into(),
            count: 3,
            depth: 2,
            has_price: false,
            has_link: false,
            has_image: false,
            sample_texts: vec![],
            statistical_score: 0.2,
            llm_confidence: None,
            combined_confidence: 0.2,
        };
        let mut strong = weak.clone();
        strong.selector = "li.product".into();
        strong.combined_confidence = 0.9;
        let winner = pick_winner(vec![weak, strong]).unwrap();
        assert_eq!(winner.selector, "li.product");
    }
}
