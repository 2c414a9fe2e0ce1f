//! The Task Runner, Run Logger, and Result Aggregator (spec.md §4.1, §4.7):
//! the composition root that drives one `Task` from URL to [`TaskResult`],
//! wiring the planner, tool registry, context collector, and stealth runtime
//! together around a live [`wayfinder_browser::CdpAdapter`].

pub mod aggregator;
pub mod bridge;
pub mod pacing;
pub mod run_log;
pub mod runner;
pub mod stall;

pub use aggregator::ResultAggregator;
pub use bridge::{LlmFieldAdapter, LlmSemanticAdapter};
pub use pacing::HostPacer;
pub use run_log::RunLogger;
pub use runner::TaskRunner;
pub use stall::StallTracker;
