//! Parses natural-language price constraints out of the run instruction
//! ("show me shoes under $50") and applies them after extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use wayfinder_types::model::ProductRecord;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterOp {
    Under(f64),
    Above(f64),
    Between(f64, f64),
}

static UNDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:under|below|less than|up to)\s*\$?([0-9]+(?:\.[0-9]+)?)").unwrap());
static ABOVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:over|above|more than|at least)\s*\$?([0-9]+(?:\.[0-9]+)?)").unwrap()
});
static BETWEEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)between\s*\$?([0-9]+(?:\.[0-9]+)?)\s*(?:and|-|to)\s*\$?([0-9]+(?:\.[0-9]+)?)").unwrap()
});

pub fn parse_filters(instruction: &str) -> Vec<FilterOp> {
    let mut filters = Vec::new();
    if let Some(caps) = BETWEEN_RE.captures(instruction) {
        let lo: f64 = caps[1].parse().unwrap_or(0.0);
        let hi: f64 = caps[2].parse().unwrap_or(0.0);
        filters.push(FilterOp::Between(lo.min(hi), lo.max(hi)));
        return filters;
    }
    if let Some(caps) = UNDER_RE.captures(instruction) {
        if let Ok(v) = caps[1].parse() {
            filters.push(FilterOp::Under(v));
        }
    }
    if let Some(caps) = ABOVE_RE.captures(instruction) {
        if let Ok(v) = caps[1].parse() {
            filters.push(FilterOp::Above(v));
        }
    }
    filters
}

pub fn apply_filters(products: Vec<ProductRecord>, filters: &[FilterOp]) -> Vec<ProductRecord> {
    if filters.is_empty() {
        return products;
    }
    products
        .into_iter()
        .filter(|p| {
            let Some(price) = p.get("price").and_then(|v| v.as_f64()) else {
                return true;
            };
            filters.iter().all(|f| match f {
                FilterOp::Under(limit) => price < *limit,
                FilterOp::Above(limit) => price > *limit,
                FilterOp::Between(lo, hi) => price >= *lo && price <= *hi,
            })
        })
        .collect()
}
