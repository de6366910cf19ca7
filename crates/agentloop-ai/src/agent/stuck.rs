//! Loop detection for the executor.
//!
//! Detects when an agent keeps requesting the same tool with the same input,
//! which would otherwise burn the whole iteration budget.

use std::collections::VecDeque;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Configuration for loop detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopDetectorConfig {
    /// Number of consecutive identical actions that count as a loop.
    /// Default: 3.
    pub repeat_threshold: usize,
    /// Maximum recent actions to track. Default: 10.
    pub window_size: usize,
}

impl Default for LoopDetectorConfig {
    fn default() -> Self {
        Self {
            repeat_threshold: 3,
            window_size: 10,
        }
    }
}

/// A detected loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopInfo {
    pub repeated_tool: String,
    pub repeat_count: usize,
}

/// Tool names compare case-insensitively, matching registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ActionFingerprint {
    tool_key: String,
    input_hash: u64,
}

impl ActionFingerprint {
    fn new(tool: &str, tool_input: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        tool_input.hash(&mut hasher);
        Self {
            tool_key: tool.to_uppercase(),
            input_hash: hasher.finish(),
        }
    }
}

/// Tracks recent actions and reports identical repeats.
#[derive(Debug)]
pub struct LoopDetector {
    config: LoopDetectorConfig,
    recent: VecDeque<ActionFingerprint>,
    last_tool: String,
}

impl LoopDetector {
    pub fn new(config: LoopDetectorConfig) -> Self {
        let window = config.window_size.max(config.repeat_threshold);
        Self {
            recent: VecDeque::with_capacity(window),
            last_tool: String::new(),
            config,
        }
    }

    pub fn config(&self) -> &LoopDetectorConfig {
        &self.config
    }

    /// Record an action about to be dispatched.
    pub fn record(&mut self, tool: &str, tool_input: &str) {
        let window = self.config.window_size.max(self.config.repeat_threshold);
        if self.recent.len() >= window {
            self.recent.pop_front();
        }
        self.recent.push_back(ActionFingerprint::new(tool, tool_input));
        self.last_tool = tool.to_string();
    }

    /// Check whether the last `repeat_threshold` actions are identical.
    pub fn detect(&self) -> Option<LoopInfo> {
        let threshold = self.config.repeat_threshold;
        if threshold == 0 || self.recent.len() < threshold {
            return None;
        }

        let last = self.recent.back()?;
        let all_same = self
            .recent
            .iter()
            .skip(self.recent.len() - threshold)
            .all(|fp| fp == last);

        all_same.then(|| LoopInfo {
            repeated_tool: self.last_tool.clone(),
            repeat_count: threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_loop_with_varied_actions() {
        let mut detector = LoopDetector::new(LoopDetectorConfig::default());
        detector.record("search", "rust");
        detector.record("calculator", "1+1");
        detector.record("search", "tokio");
        assert!(detector.detect().is_none());
    }

    #[test]
    fn test_loop_on_repeated_action() {
        let mut detector = LoopDetector::new(LoopDetectorConfig::default());
        detector.record("search", "rust");
        detector.record("search", "rust");
        assert!(detector.detect().is_none());

        detector.record("search", "rust");
        let info = detector.detect().expect("should detect loop");
        assert_eq!(info.repeated_tool, "search");
        assert_eq!(info.repeat_count, 3);
    }

    #[test]
    fn test_tool_name_case_variants_are_the_same_action() {
        let mut detector = LoopDetector::new(LoopDetectorConfig::default());
        detector.record("Search", "rust");
        detector.record("search", "rust");
        detector.record("SEARCH", "rust");
        let info = detector.detect().expect("case variants should loop");
        assert_eq!(info.repeated_tool, "SEARCH");
        assert_eq!(info.repeat_count, 3);
    }

    #[test]
    fn test_same_tool_different_input_is_not_a_loop() {
        let mut detector = LoopDetector::new(LoopDetectorConfig::default());
        detector.record("search", "a");
        detector.record("search", "b");
        detector.record("search", "c");
        assert!(detector.detect().is_none());
    }

    #[test]
    fn test_window_size_respected() {
        let mut detector = LoopDetector::new(LoopDetectorConfig {
            repeat_threshold: 3,
            window_size: 4,
        });

        detector.record("search", "x");
        detector.record("search", "x");
        detector.record("other", "y");
        detector.record("search", "x");
        assert!(detector.detect().is_none());

        detector.record("search", "x");
        assert!(detector.detect().is_none());

        detector.record("search", "x");
        assert_eq!(detector.detect().unwrap().repeated_tool, "search");
    }

    #[test]
    fn test_window_smaller_than_threshold_is_widened() {
        let mut detector = LoopDetector::new(LoopDetectorConfig {
            repeat_threshold: 4,
            window_size: 2,
        });
        for _ in 0..4 {
            detector.record("search", "x");
        }
        assert_eq!(detector.detect().unwrap().repeat_count, 4);
    }
}
