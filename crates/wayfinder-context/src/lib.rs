pub mod errors;
pub mod page_context;

pub use page_context::{
    build_snapshot, disclose, dom_preview_budget, ContextCollector, PageSnapshot, RawPageSnapshot,
};
