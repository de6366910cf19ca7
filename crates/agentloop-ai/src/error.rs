//! Error types for the agent core

use agentloop_traits::{LlmError, MemoryError, ToolError};
use thiserror::Error;

/// Agent core error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Model output matched neither the finish nor the action protocol.
    #[error("unable to parse agent output: {0}")]
    UnableToParseOutput(String),

    #[error("tool '{tool}' failed at iteration {iteration} (input: {input:?}): {source}")]
    ToolExecution {
        tool: String,
        input: String,
        iteration: usize,
        #[source]
        source: ToolError,
    },

    #[error("agent returned neither actions nor a finish")]
    NoReturn,

    #[error(
        "agent is repeating the same action: '{tool}' was called {repeat_count} times in a row \
         with identical input (iteration {iteration})"
    )]
    LoopDetected {
        tool: String,
        repeat_count: usize,
        iteration: usize,
    },

    #[error("agent not finished before max iterations ({iterations}): {hint}")]
    NotFinished { iterations: usize, hint: String },

    #[error("invalid inputs: {0}")]
    InputValidation(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("execution cancelled")]
    Cancelled,

    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("batch worker failed: {0}")]
    Worker(String),

    /// Non-recoverable error raised by a Plan call.
    #[error("plan failed at iteration {iteration}: {source}")]
    Plan {
        iteration: usize,
        #[source]
        source: Box<AgentError>,
    },
}

/// Coarse classification of [`AgentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    ToolExecution,
    NoReturn,
    LoopDetected,
    NotFinished,
    InputValidation,
    Infrastructure,
    Cancelled,
    Config,
}

impl AgentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnableToParseOutput(_) => ErrorKind::Parse,
            Self::ToolExecution { .. } => ErrorKind::ToolExecution,
            Self::NoReturn => ErrorKind::NoReturn,
            Self::LoopDetected { .. } => ErrorKind::LoopDetected,
            Self::NotFinished { .. } => ErrorKind::NotFinished,
            Self::InputValidation(_) => ErrorKind::InputValidation,
            Self::Cancelled | Self::Llm(LlmError::Cancelled) => ErrorKind::Cancelled,
            Self::Llm(_) | Self::Memory(_) | Self::Prompt(_) | Self::Json(_) | Self::Worker(_) => {
                ErrorKind::Infrastructure
            }
            Self::DuplicateTool(_) | Self::Config(_) => ErrorKind::Config,
            Self::Plan { source, .. } => source.kind(),
        }
    }

    /// True when the model never produced a final answer.
    pub fn is_unfinished(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFinished | ErrorKind::LoopDetected)
    }

    pub fn is_parse_error(&self) -> bool {
        self.kind() == ErrorKind::Parse
    }

    /// Raw model output carried by a parse error, if any.
    pub fn unparsed_output(&self) -> Option<&str> {
        match self {
            Self::UnableToParseOutput(output) => Some(output),
            Self::Plan { source, .. } => source.unparsed_output(),
            _ => None,
        }
    }
}

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;
