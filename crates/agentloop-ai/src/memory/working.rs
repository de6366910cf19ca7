//! Working Memory - Sliding window for conversation history
//!
//! Provides a bounded buffer of chat messages with automatic eviction of the
//! oldest messages when the limit is reached.
//!
//! # Example
//!
//! ```
//! use agentloop_ai::memory::WorkingMemory;
//! use agentloop_ai::llm::ChatMessage;
//!
//! let mut memory = WorkingMemory::new(100);
//! memory.add(ChatMessage::user("Hello"));
//! memory.add(ChatMessage::assistant("Hi there!"));
//!
//! assert_eq!(memory.len(), 2);
//! ```

use std::collections::VecDeque;

use agentloop_traits::{ChatMessage, Role};

/// Default maximum number of messages in working memory
pub const DEFAULT_MAX_MESSAGES: usize = 100;

/// Working memory for conversation history with sliding window
///
/// The first system message is never evicted while other messages remain.
#[derive(Debug, Clone)]
pub struct WorkingMemory {
    /// Messages stored in order (oldest first)
    messages: VecDeque<ChatMessage>,
    max_messages: usize,
}

impl Default for WorkingMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

impl WorkingMemory {
    /// Create a new working memory with the specified maximum message count
    pub fn new(max_messages: usize) -> Self {
        let max_messages = max_messages.max(1);
        Self {
            messages: VecDeque::with_capacity(max_messages),
            max_messages,
        }
    }

    /// Add a message, evicting the oldest non-system message when full.
    pub fn add(&mut self, msg: ChatMessage) {
        while self.messages.len() >= self.max_messages {
            if self.remove_oldest_non_system().is_none() {
                // All messages are system messages
                self.messages.pop_front();
                break;
            }
        }
        self.messages.push_back(msg);
    }

    /// Messages from oldest to newest.
    pub fn get_messages(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// The last `n` messages, oldest first.
    pub fn last_n(&self, n: usize) -> Vec<ChatMessage> {
        let skip = self.messages.len().saturating_sub(n);
        self.messages.iter().skip(skip).cloned().collect()
    }

    fn remove_oldest_non_system(&mut self) -> Option<ChatMessage> {
        let index = self
            .messages
            .iter()
            .position(|msg| msg.role != Role::System)?;
        self.messages.remove(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_memory() {
        let memory = WorkingMemory::default();
        assert_eq!(memory.max_messages(), DEFAULT_MAX_MESSAGES);
        assert!(memory.is_empty());
    }

    #[test]
    fn test_sliding_window_eviction() {
        let mut memory = WorkingMemory::new(3);
        memory.add(ChatMessage::user("1"));
        memory.add(ChatMessage::assistant("2"));
        memory.add(ChatMessage::user("3"));
        memory.add(ChatMessage::assistant("4"));

        let contents: Vec<String> = memory.iter().map(|m| m.content.clone()).collect();
        assert_eq!(contents, vec!["2", "3", "4"]);
    }

    #[test]
    fn test_system_message_preserved() {
        let mut memory = WorkingMemory::new(2);
        memory.add(ChatMessage::system("rules"));
        memory.add(ChatMessage::user("a"));
        memory.add(ChatMessage::user("b"));

        let messages = memory.get_messages();
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "b");
    }

    #[test]
    fn test_last_n() {
        let mut memory = WorkingMemory::new(10);
        for i in 0..5 {
            memory.add(ChatMessage::user(i.to_string()));
        }
        let last: Vec<String> = memory.last_n(2).into_iter().map(|m| m.content).collect();
        assert_eq!(last, vec!["3", "4"]);
        assert_eq!(memory.last_n(50).len(), 5);
    }

    #[test]
    fn test_clear() {
        let mut memory = WorkingMemory::new(4);
        memory.add(ChatMessage::user("x"));
        memory.clear();
        assert!(memory.is_empty());
    }
}
