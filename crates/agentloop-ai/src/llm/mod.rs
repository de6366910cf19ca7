//! LLM module - model contract re-exports and the scripted mock model

mod mock_client;

pub use agentloop_traits::{
    ChatMessage, FinishReason, GenerateRequest, GenerateResponse, LanguageModel, Role,
    StreamingFn, ToolCall, truncate_at_stop_words,
};
pub use mock_client::{MockLanguageModel, MockStep, MockStepKind};
