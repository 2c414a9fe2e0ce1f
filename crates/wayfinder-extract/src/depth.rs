//! Step 3 of the detector pipeline: depth distribution analysis.
//!
//! Groups the scanned ancestors by DOM depth and scores each depth on three
//! normalized signals — price density, feature co-location, and text-length
//! stability — to find the depth at which "one element per product" most
//! plausibly lives, without ever naming a selector.

use std::collections::BTreeMap;

use crate::raw::RawAncestor;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DepthStats {
    pub element_count: usize,
    pub price_count: usize,
    pub link_count: usize,
    pub image_count: usize,
    pub mean_text_len: f64,
    pub variance_text_len: f64,
}

pub fn depth_distribution(ancestors: &[RawAncestor]) -> BTreeMap<u32, DepthStats> {
    let mut by_depth: BTreeMap<u32, Vec<&RawAncestor>> = BTreeMap::new();
    for a in ancestors {
        by_depth.entry(a.depth).or_default().push(a);
    }

    by_depth
        .into_iter()
        .map(|(depth, group)| {
            let n = group.len();
            let mean = group.iter().map(|a| a.text_len as f64).sum::<f64>() / n as f64;
            let variance = if n > 1 {
                group
                    .iter()
                    .map(|a| {
                        let d = a.text_len as f64 - mean;
                        d * d
                    })
                    .sum::<f64>()
                    / n as f64
            } else {
                0.0
            };
            let stats = DepthStats {
                element_count: n,
                price_count: group.iter().filter(|a| a.has_price).count(),
                link_count: group.iter().filter(|a| a.has_link).count(),
                image_count: group.iter().filter(|a| a.has_image).count(),
                mean_text_len: mean,
                variance_text_len: variance,
            };
            (depth, stats)
        })
        .collect()
}

/// Picks the depth whose weighted mix of price density, signal co-location,
/// and inverse text-length variance scores highest. Ties favor the shallower
/// depth (closer to the listing root).
pub fn optimal_depth(dist: &BTreeMap<u32, DepthStats>) -> Option<u32> {
    if dist.is_empty() {
        return None;
    }

    let max_price_density = dist
        .values()
        .map(|s| s.price_count as f64 / s.element_count.max(1) as f64)
        .fold(0.0_f64, f64::max)
        .max(f64::EPSILON);
    let max_colocation = dist
        .values()
        .map(|s| colocation_fraction(s))
        .fold(0.0_f64, f64::max)
        .max(f64::EPSILON);
    let max_inv_variance = dist
        .values()
        .map(|s| 1.0 / (1.0 + s.variance_text_len))
        .fold(0.0_f64, f64::max)
        .max(f64::EPSILON);

    dist.iter()
        .map(|(depth, stats)| {
            let price_density = stats.price_count as f64 / stats.element_count.max(1) as f64;
            let colocation = colocation_fraction(stats);
            let inv_variance = 1.0 / (1.0 + stats.variance_text_len);
            let score = (price_density / max_price_density) / 3.0
                + (colocation / max_colocation) / 3.0
                + (inv_variance / max_inv_variance) / 3.0;
            (*depth, score)
        })
        .fold(None, |best: Option<(u32, f64)>, (depth, score)| match best {
            Some((bd, bs)) if bs >= score => Some((bd, bs)),
            _ => Some((depth, score)),
        })
        .map(|(depth, _)| depth)
}

fn colocation_fraction(stats: &DepthStats) -> f64 {
    let all_three = stats.price_count.min(stats.link_count).min(stats.image_count);
    all_three as f64 / stats.element_count.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ancestor(depth: u32, price: bool, link: bool, image: bool, text_len: usize) -> RawAncestor {
        RawAncestor {
            depth,
            has_price: price,
            has_link: link,
            has_image: image,
            text_len,
            ..Default::default()
        }
    }

    #[test]
    fn groups_by_depth() {
        let ancestors = vec![ancestor(2, true, true, true, 50), ancestor(3, false, false, false, 10)];
        let dist = depth_distribution(&ancestors);
        assert_eq!(dist.len(), 2);
        assert_eq!(dist[&2].element_count, 1);
        assert_eq!(dist[&3].element_count, 1);
    }

    #[test]
    fn picks_depth_with_strongest_signal_colocation() {
        let mut ancestors = Vec::new();
        for _ in 0..12 {
            ancestors.push(ancestor(3, true, true, true, 120));
        }
        for _ in 0..12 {
            ancestors.push(ancestor(2, false, false, false, 5));
        }
        let dist = depth_distribution(&ancestors);
        assert_eq!(optimal_depth(&dist), Some(3));
    }

    #[test]
    fn empty_input_has_no_optimal_depth() {
        let dist = depth_distribution(&[]);
        assert_eq!(optimal_depth(&dist), None);
    }
}
