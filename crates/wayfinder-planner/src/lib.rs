//! The Hierarchical Planner (spec.md §4.2): the three-level progressive
//! disclosure protocol plus the standard single-shot planner used when
//! hierarchical mode is not activated.

pub mod errors;
pub mod hierarchical;
pub mod standard;

pub use errors::AgentError;
pub use hierarchical::{
    infer_page_type, parse_instruction_kv, should_use_hierarchical, Disclosures,
    HierarchicalPlanner, Level1Outcome, PageOutline,
};
pub use standard::StandardPlanner;
