//! Step 4: group ancestors near the optimal depth into structural-signature
//! clusters, then keep only the clusters large enough to plausibly be a
//! "one container per product" repetition rather than incidental noise.

use std::collections::BTreeMap;

use crate::raw::RawAncestor;

/// A structural fingerprint shared by every element in a cluster. Never
/// carries a site-specific value, only shape.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Signature {
    pub tag: String,
    pub class_count: usize,
    pub has_price: bool,
    pub has_link: bool,
    pub has_image: bool,
}

impl Signature {
    fn of(a: &RawAncestor) -> Self {
        Signature {
            tag: a.tag.clone(),
            class_count: a.class_list.len(),
            has_price: a.has_price,
            has_link: a.has_link,
            has_image: a.has_image,
        }
    }
}

pub struct Cluster<'a> {
    pub signature: Signature,
    pub members: Vec<&'a RawAncestor>,
}

/// Minimum absolute cluster size below which a signature is never considered
/// a repeated container, regardless of percentile.
pub const MIN_CLUSTER_FLOOR: usize = 3;

/// Groups ancestors within one level of `optimal_depth` by structural
/// signature, then drops clusters smaller than the 75th-percentile-derived
/// floor (never lower than [`MIN_CLUSTER_FLOOR`]).
pub fn generate_candidates(ancestors: &[RawAncestor], optimal_depth: u32) -> Vec<Cluster<'_>> {
    let lo = optimal_depth.saturating_sub(1);
    let hi = optimal_depth.saturating_add(1);

    let mut groups: BTreeMap<Signature, Vec<&RawAncestor>> = BTreeMap::new();
    for a in ancestors {
        if a.depth < lo || a.depth > hi {
            continue;
        }
        groups.entry(Signature::of(a)).or_default().push(a);
    }

    let floor = cluster_floor(groups.values().map(|v| v.len()));

    groups
        .into_iter()
        .filter(|(_, members)| members.len() >= floor)
        .map(|(signature, members)| Cluster { signature, members })
        .collect()
}

/// The 75th percentile of non-trivial (size > 1) cluster sizes, floored at
/// [`MIN_CLUSTER_FLOOR`] so a page with only a couple of noisy near-duplicate
/// elements never gets treated as a product listing.
fn cluster_floor(sizes: impl Iterator<Item = usize>) -> usize {
    let mut sizes: Vec<usize> = sizes.filter(|&n| n > 1).collect();
    if sizes.is_empty() {
        return MIN_CLUSTER_FLOOR;
    }
    sizes.sort_unstable();
    let idx = ((sizes.len() as f64) * 0.75).floor() as usize;
    let idx = idx.min(sizes.len() - 1);
    sizes[idx].max(MIN_CLUSTER_FLOOR)
}
