//! Stall detection (spec.md §4.1 step 5): a rolling window of the last 3
//! `(tool_name, error_signature)` pairs; if the same pair repeats `N` times
//! (default 2), that tool is abandoned for the rest of the task.

use std::collections::HashMap;

use wayfinder_types::model::{error_signature, ToolHistory};

const WINDOW: usize = 3;

/// Tracks, per task, which `(tool, error_signature)` pairs have crossed the
/// repeat threshold and should no longer be attempted.
#[derive(Default)]
pub struct StallTracker {
    abandoned: HashMap<String, ()>,
}

impl StallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derives the abandonment set from `history`'s rolling window after
    /// every recorded step; `max_same_error` is `RunOptions::max_same_error`.
    pub fn update(&mut self, history: &ToolHistory, max_same_error: u32) {
        let recent = history.recent_tool_errors(WINDOW);
        let mut counts: HashMap<(String, String), u32> = HashMap::new();
        for pair in recent {
            *counts.entry(pair).or_insert(0) += 1;
        }
        for ((tool, _sig), count) in counts {
            if count >= max_same_error {
                self.abandoned.insert(tool, ());
            }
        }
    }

    pub fn is_abandoned(&self, tool_name: &str) -> bool {
        self.abandoned.contains_key(tool_name)
    }

    pub fn abandoned_tools(&self) -> Vec<&str> {
        self.abandoned.keys().map(String::as_str).collect()
    }
}

/// Coarse signature for a tool error, reusing the dynamic-content-stripping
/// scheme `wayfinder-types` already defines for `ToolHistory`.
pub fn signature(message: &str) -> String {
    error_signature(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfinder_types::model::ToolHistoryEntry;

    fn push_error(history: &mut ToolHistory, step: u32, tool: &str, err: &str) {
        history.push(ToolHistoryEntry {
            step_index: step,
            tool_name: tool.to_string(),
            args_summary: "{}".into(),
            result_summary: "".into(),
            error: Some(err.to_string()),
        });
    }

    #[test]
    fn abandons_tool_after_repeated_identical_error() {
        let mut history = ToolHistory::new(20);
        push_error(&mut history, 0, "dom.click", "TimeoutError: waited 25000ms");
        push_error(&mut history, 1, "dom.click", "TimeoutError: waited 25000ms");
        let mut tracker = StallTracker::new();
        tracker.update(&history, 2);
        assert!(tracker.is_abandoned("dom.click"));
    }

    #[test]
    fn distinct_errors_do_not_trigger_abandonment() {
        let mut history = ToolHistory::new(20);
        push_error(&mut history, 0, "dom.click", "TimeoutError");
        push_error(&mut history, 1, "dom.click", "ElementNotFound");
        let mut tracker = StallTracker::new();
        tracker.update(&history, 2);
        assert!(!tracker.is_abandoned("dom.click"));
    }

    #[test]
    fn single_failure_is_not_enough() {
        let mut history = ToolHistory::new(20);
        push_error(&mut history, 0, "dom.click", "TimeoutError");
        let mut tracker = StallTracker::new();
        tracker.update(&history, 2);
        assert!(!tracker.is_abandoned("dom.click"));
    }
}
