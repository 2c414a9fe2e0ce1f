//! Steps 7-8: locate and extract the name/price/url/image fields from each
//! member of the winning cluster.

use serde_json::Value;
use wayfinder_types::model::ProductRecord;

use crate::raw::RawAncestor;

#[derive(Clone, Debug, Default)]
pub struct FieldLocations {
    pub price_selector: Option<String>,
    pub url_selector: Option<String>,
    pub name_selector: Option<String>,
    pub image_selector: Option<String>,
}

/// Reads the field selectors off the first member that has them all, since
/// every member of a winning cluster shares the same structural shape.
pub fn locate_fields(members: &[&RawAncestor]) -> FieldLocations {
    let mut locations = FieldLocations::default();
    for m in members {
        if locations.price_selector.is_none() {
            locations.price_selector = m.price_selector.clone();
        }
        if locations.url_selector.is_none() {
            locations.url_selector = m.anchor_selector.clone();
        }
        if locations.name_selector.is_none() {
            locations.name_selector = m.heading_selector.clone();
        }
        if locations.image_selector.is_none() {
            locations.image_selector = m.image_selector.clone();
        }
        if locations.price_selector.is_some()
            && locations.url_selector.is_some()
            && locations.name_selector.is_some()
            && locations.image_selector.is_some()
        {
            break;
        }
    }
    locations
}

/// Parses a locale-agnostic price string into a plain number of major units.
/// Handles both `1,234.56` and `1.234,56` groupings by assuming the last
/// separator before at most two trailing digits is the decimal point.
pub fn parse_price(text: &str) -> Option<f64> {
    let digits_and_seps: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if digits_and_seps.is_empty() {
        return None;
    }

    let last_dot = digits_and_seps.rfind('.');
    let last_comma = digits_and_seps.rfind(',');
    let decimal_pos = match (last_dot, last_comma) {
        (Some(d), Some(c)) => Some(d.max(c)),
        (Some(d), None) => Some(d),
        (None, Some(c)) => Some(c),
        (None, None) => None,
    };

    let normalized = match decimal_pos {
        Some(pos) if digits_and_seps.len() - pos <= 3 => {
            let (whole, frac) = digits_and_seps.split_at(pos);
            let whole: String = whole.chars().filter(|c| c.is_ascii_digit()).collect();
            let frac: String = frac.chars().skip(1).filter(|c| c.is_ascii_digit()).collect();
            if frac.is_empty() {
                whole
            } else {
                format!("{whole}.{frac}")
            }
        }
        _ => digits_and_seps.chars().filter(|c| c.is_ascii_digit()).collect(),
    };

    normalized.parse::<f64>().ok()
}

pub fn extract_products(members: &[&RawAncestor], locations: &FieldLocations) -> Vec<ProductRecord> {
    members
        .iter()
        .filter_map(|m| {
            let mut record = ProductRecord::new();

            let name = m.heading_text.clone().filter(|t| !t.is_empty());
            let price_raw = m.price_text.clone();
            let price = price_raw.as_deref().and_then(parse_price);
            let url = m.anchor_href.clone().filter(|t| !t.is_empty());

            // A usable record needs at least a name or a price; an empty
            // shell with nothing extracted is noise, not a product.
            if name.is_none() && price.is_none() {
                return None;
            }

            if let Some(name) = name {
                record.insert("name".into(), Value::String(name));
            }
            if let Some(price) = price {
                record.insert("price".into(), serde_json::json!(price));
            }
            if let Some(raw) = price_raw {
                record.insert("price_text".into(), Value::String(raw));
            }
            if let Some(url) = url {
                record.insert("url".into(), Value::String(url));
            }
            if let Some(image) = m.image_src.clone().filter(|t| !t.is_empty()) {
                record.insert("image".into(), Value::String(image));
            }
            let _ = &locations.price_selector;
            Some(record)
        })
        .collect()
}
