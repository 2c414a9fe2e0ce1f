//! Dynamic pattern detector and iterative extractor.
//!
//! Finds repeated product-shaped structure on a page without any
//! site-specific selector ever being hardcoded: a JS pass scans the DOM for
//! price/link/image signals, [`depth`] and [`candidates`] find the depth and
//! structural shape most of those signals repeat at, [`rank`] scores the
//! resulting clusters (optionally folding in an LLM semantic check via
//! [`llm`]), and [`fields`]/[`filters`] turn the winning cluster into
//! `ProductRecord`s honoring any price constraint named in the instruction.

pub mod candidates;
pub mod depth;
pub mod errors;
pub mod extractor;
pub mod fields;
pub mod filters;
pub mod llm;
pub mod pipeline;
pub mod rank;
pub mod raw;

pub use errors::ExtractError;
pub use extractor::IterativeExtractor;
pub use llm::SemanticValidator;
pub use pipeline::{quick_page_check, run_extraction, NON_LISTING_FLOOR};
pub use raw::PageSignalScan;
