//! Error types raised by collaborator implementations.

use thiserror::Error;

/// Errors returned by [`crate::Tool::call`].
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{0}")]
    Execution(String),

    #[error("Invalid tool input: {0}")]
    InvalidInput(String),

    #[error("Tool call cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ToolError {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}

/// Errors returned by [`crate::LanguageModel::generate`].
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM call cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors returned by [`crate::Memory`] implementations.
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Invalid memory input values: {0}")]
    InvalidInputValues(String),

    #[error("Memory backend error: {0}")]
    Backend(String),
}

pub type ToolResult<T> = std::result::Result<T, ToolError>;
pub type LlmResult<T> = std::result::Result<T, LlmError>;
pub type MemoryResult<T> = std::result::Result<T, MemoryError>;
