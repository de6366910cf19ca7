use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use agentloop_traits::Values;

use super::AgentAction;

/// Append-only JSONL journal of executor invocations for post-mortem debugging.
///
/// Write failures are ignored so a broken journal never fails a run.
#[derive(Debug, Clone)]
pub struct ExecutionJournal {
    path: PathBuf,
}

/// One journal line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: String,
    pub iteration: usize,
    pub event_type: String,
    pub data: Value,
}

impl ExecutionJournal {
    /// Create a journal at path, creating parent directories if needed.
    pub fn new(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, iteration: usize, event_type: &str, data: Value) {
        let entry = JournalEntry {
            timestamp: Utc::now().to_rfc3339(),
            iteration,
            event_type: event_type.to_string(),
            data,
        };

        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            && let Ok(line) = serde_json::to_string(&entry)
        {
            let _ = writeln!(file, "{line}");
        }
    }

    pub fn log_start(&self, execution_id: &str, inputs: &Values) {
        self.append(
            0,
            "execution_start",
            json!({
                "execution_id": execution_id,
                "inputs": inputs,
            }),
        );
    }

    pub fn log_iteration_begin(&self, iteration: usize) {
        self.append(iteration, "iteration_begin", json!({}));
    }

    pub fn log_action(&self, iteration: usize, action: &AgentAction) {
        self.append(
            iteration,
            "action",
            json!({
                "tool": action.tool,
                "tool_input": action.tool_input,
                "tool_call_id": action.tool_call_id,
                "log": action.log,
            }),
        );
    }

    pub fn log_observation(&self, iteration: usize, tool: &str, observation: &str) {
        self.append(
            iteration,
            "observation",
            json!({
                "tool": tool,
                "observation": observation,
            }),
        );
    }

    pub fn log_parse_error(&self, iteration: usize, error: &str, observation: &str) {
        self.append(
            iteration,
            "parse_error",
            json!({
                "error": error,
                "observation": observation,
            }),
        );
    }

    pub fn log_finish(&self, iteration: usize, return_values: &Values) {
        self.append(
            iteration,
            "finish",
            json!({
                "return_values": return_values,
            }),
        );
    }

    pub fn log_error(&self, iteration: usize, error: &str) {
        self.append(
            iteration,
            "error",
            json!({
                "error": error,
            }),
        );
    }

    /// Read back every entry; unreadable lines are skipped.
    pub fn entries(&self) -> std::io::Result<Vec<JournalEntry>> {
        let content = fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_append_and_jsonl_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs").join("journal.jsonl");
        let journal = ExecutionJournal::new(path.clone()).unwrap();

        let inputs = Values::from([("input".to_string(), json!("hello"))]);
        journal.log_start("exec-1", &inputs);
        journal.log_iteration_begin(1);
        journal.log_action(1, &AgentAction::new("search", "rust", "Action: search"));
        journal.log_observation(1, "search", "a language");
        journal.log_finish(2, &Values::from([("output".to_string(), json!("done"))]));

        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 5);

        for line in lines {
            let parsed: Value = serde_json::from_str(line).unwrap();
            assert!(parsed.get("timestamp").is_some());
            assert!(parsed.get("event_type").is_some());
            assert!(parsed.get("data").is_some());
        }
    }

    #[test]
    fn test_entries_round_trip_event_types() {
        let dir = tempfile::tempdir().unwrap();
        let journal = ExecutionJournal::new(dir.path().join("journal.jsonl")).unwrap();

        journal.log_parse_error(1, "unable to parse agent output: ???", "Invalid format");
        journal.log_error(2, "tool 'search' failed");

        let entries = journal.entries().unwrap();
        let types: Vec<&str> = entries.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["parse_error", "error"]);
        assert_eq!(entries[0].data["observation"], "Invalid format");
        assert_eq!(entries[1].iteration, 2);
    }
}
