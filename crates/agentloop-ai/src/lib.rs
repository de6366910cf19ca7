//! AgentLoop AI - Rust-powered LLM agent core
//!
//! This crate provides:
//! - ReAct (Reasoning + Acting) output parsing and text-protocol agents
//! - A native function-calling agent
//! - The executor loop with loop detection and an iteration ceiling
//! - Case-insensitive tool registry
//! - Chain helpers (call, run, predict, apply) and prompt templates
//! - Memory system (sliding-window conversation buffer)

#![allow(dead_code)]

pub mod agent;
pub mod chains;
pub mod error;
pub mod llm;
pub mod memory;
pub mod prompt;
pub mod tools;

// Re-export commonly used types
pub use agent::{
    Agent, AgentAction, AgentFinish, AgentStep, ConversationalAgent, ExecutionEvent, Executor,
    ExecutorConfig, FunctionsAgent, OneShotAgent, ParserErrorHandler, Plan, RunOutcome,
};
pub use agentloop_traits::{
    CancellationToken, LanguageModel, Memory, Tool, ToolError, ToolResult, Values,
};
pub use chains::{CallOptions, Chain, LlmChain};
pub use error::{AgentError, ErrorKind, Result};
pub use memory::{ConversationBuffer, DEFAULT_MAX_MESSAGES, WorkingMemory};
pub use prompt::PromptTemplate;
pub use tools::ToolRegistry;
