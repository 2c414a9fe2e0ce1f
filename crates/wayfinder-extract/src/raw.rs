//! Shapes mirrored from `signal_scan.js`'s return value. `serde_json` deserializes
//! the `Value` produced by `Cdp::evaluate_script` straight into these.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAncestor {
    pub tag: String,
    #[serde(default)]
    pub class_list: Vec<String>,
    pub depth: u32,
    pub text_len: usize,
    pub has_price: bool,
    pub has_link: bool,
    pub has_image: bool,
    pub price_text: Option<String>,
    pub price_selector: Option<String>,
    pub anchor_text: Option<String>,
    pub anchor_href: Option<String>,
    pub anchor_selector: Option<String>,
    pub heading_text: Option<String>,
    pub heading_selector: Option<String>,
    pub image_src: Option<String>,
    pub image_selector: Option<String>,
    pub sample_text: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSignalScan {
    pub price_like_count: usize,
    pub product_anchor_count: usize,
    #[serde(default)]
    pub ancestors: Vec<RawAncestor>,
}
