//! ReAct text protocol parsing.
//!
//! Model output is checked against an ordered list of matchers:
//!
//! 1. Finish markers (`Final Answer:` and its case-insensitive variants). The
//!    text after the last occurrence of the first matching marker becomes the
//!    answer, unless a later line starts with `Action:`.
//! 2. An `Action:` / `Action Input:` pair. The tool name is matched lazily up
//!    to `Action Input:`; the input is matched greedily across lines.
//! 3. Anything else is [`AgentError::UnableToParseOutput`].

use once_cell::sync::Lazy;
use regex::Regex;

use crate::agent::{AgentAction, AgentFinish, Plan};
use crate::error::{AgentError, Result};

/// Marker the executor injects before each tool observation.
pub const OBSERVATION_MARKER: &str = "Observation:";

/// Marker that ends a conversational agent turn.
pub const CONVERSATIONAL_FINISH_MARKER: &str = "AI:";

static ACTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)action\s*:[ \t]*(.*?)\s*action\s*input\s*:((?s:.*))").expect("Invalid regex")
});

/// Turns one raw model completion into a [`Plan`].
pub trait OutputParser: Send + Sync {
    fn parse(&self, output: &str) -> Result<Plan>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerCase {
    Exact,
    Insensitive,
}

#[derive(Debug, Clone, Copy)]
struct FinishMarker {
    text: &'static str,
    case: MarkerCase,
}

const FINISH_MARKERS: &[FinishMarker] = &[
    FinishMarker {
        text: "Final Answer:",
        case: MarkerCase::Exact,
    },
    FinishMarker {
        text: "final answer:",
        case: MarkerCase::Insensitive,
    },
    FinishMarker {
        text: "the final answer is:",
        case: MarkerCase::Insensitive,
    },
    FinishMarker {
        text: "the answer is:",
        case: MarkerCase::Insensitive,
    },
];

impl FinishMarker {
    /// Byte offset just past the last occurrence of this marker.
    fn last_end(&self, output: &str, lowered: &str) -> Option<usize> {
        let start = match self.case {
            MarkerCase::Exact => output.rfind(self.text),
            MarkerCase::Insensitive => lowered.rfind(self.text),
        }?;
        Some(start + self.text.len())
    }
}

/// Parser for the one-shot ReAct protocol.
#[derive(Debug, Clone)]
pub struct ReActParser {
    output_key: String,
}

impl ReActParser {
    pub fn new(output_key: impl Into<String>) -> Self {
        Self {
            output_key: output_key.into(),
        }
    }

    pub fn output_key(&self) -> &str {
        &self.output_key
    }

    fn parse_finish(&self, output: &str) -> Option<AgentFinish> {
        // ASCII lowering keeps byte offsets aligned with `output`.
        let lowered = output.to_ascii_lowercase();
        FINISH_MARKERS.iter().find_map(|marker| {
            let end = marker.last_end(output, &lowered)?;
            let answer = &output[end..];
            if has_action_line(answer) {
                tracing::debug!(
                    marker = marker.text,
                    "Final answer marker followed by an Action line, ignoring"
                );
                return None;
            }
            Some(AgentFinish::single(&self.output_key, answer.trim(), output))
        })
    }
}

impl Default for ReActParser {
    fn default() -> Self {
        Self::new(crate::agent::DEFAULT_OUTPUT_KEY)
    }
}

impl OutputParser for ReActParser {
    fn parse(&self, output: &str) -> Result<Plan> {
        if let Some(finish) = self.parse_finish(output) {
            return Ok(Plan::Finish(finish));
        }
        parse_action(output).map(|action| Plan::Actions(vec![action]))
    }
}

/// Parser for the conversational protocol: `AI:` ends the turn.
#[derive(Debug, Clone)]
pub struct ConversationalParser {
    output_key: String,
    marker: String,
}

impl ConversationalParser {
    pub fn new(output_key: impl Into<String>) -> Self {
        Self {
            output_key: output_key.into(),
            marker: CONVERSATIONAL_FINISH_MARKER.to_string(),
        }
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }
}

impl Default for ConversationalParser {
    fn default() -> Self {
        Self::new(crate::agent::DEFAULT_OUTPUT_KEY)
    }
}

impl OutputParser for ConversationalParser {
    fn parse(&self, output: &str) -> Result<Plan> {
        // The split keeps surrounding whitespace: "AI: x" yields " x".
        if !self.marker.is_empty()
            && let Some(start) = output.rfind(&self.marker)
        {
            let answer = &output[start + self.marker.len()..];
            return Ok(Plan::Finish(AgentFinish::single(
                &self.output_key,
                answer,
                output,
            )));
        }
        parse_action(output).map(|action| Plan::Actions(vec![action]))
    }
}

/// Extract a single `Action:` / `Action Input:` pair.
pub fn parse_action(output: &str) -> Result<AgentAction> {
    let captures = ACTION_PATTERN
        .captures(output)
        .ok_or_else(|| AgentError::UnableToParseOutput(output.to_string()))?;

    let tool = captures.get(1).map_or("", |m| m.as_str()).trim();
    let raw_input = captures.get(2).map_or("", |m| m.as_str());
    let input = strip_observation(raw_input).trim();

    Ok(AgentAction::new(tool, input, output))
}

/// Cut a hallucinated observation off the end of a tool input.
pub fn strip_observation(input: &str) -> &str {
    match input.find(&format!("\n{OBSERVATION_MARKER}")) {
        Some(index) => &input[..index],
        None => input,
    }
}

fn has_action_line(text: &str) -> bool {
    // The first line is the remainder of the marker line itself.
    text.lines().skip(1).any(|line| {
        line.trim_start()
            .get(..7)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("action:"))
    })
}
