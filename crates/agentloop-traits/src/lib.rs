//! agentloop traits - Shared collaborator contracts.
//!
//! This crate provides the interfaces the agent loop consumes but does not own:
//! - Tool trait and ToolSchema
//! - LanguageModel trait, chat messages, generation request/response
//! - Memory trait and the Values map
//! - Error enums for each collaborator

pub mod error;
pub mod llm;
pub mod memory;
pub mod tool;

pub use error::{
    LlmError, LlmResult, MemoryError, MemoryResult, ToolError, ToolResult,
};
pub use llm::{
    ChatMessage, FinishReason, GenerateRequest, GenerateResponse, LanguageModel, Role,
    StreamingFn, ToolCall, truncate_at_stop_words,
};
pub use memory::{Memory, Values};
pub use tool::{SINGLE_ARGUMENT, Tool, ToolSchema};

pub use tokio_util::sync::CancellationToken;
