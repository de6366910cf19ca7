//! Memory module - chat history kept across chain calls
//!
//! - [`WorkingMemory`]: bounded sliding window of chat messages
//! - [`ConversationBuffer`]: [`Memory`](agentloop_traits::Memory) implementation
//!   exposing that window as a transcript under the `history` key

mod buffer;
mod working;

pub use buffer::{ConversationBuffer, DEFAULT_MEMORY_KEY};
pub use working::{DEFAULT_MAX_MESSAGES, WorkingMemory};
