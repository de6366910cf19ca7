//! Language model contract and chat message types.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::LlmResult;
use crate::tool::ToolSchema;

/// Chat message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool calls made by the assistant (for assistant messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Create an assistant message with tool calls
    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Some(tool_calls),
        }
    }

    /// Create a tool result message
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }
}

/// Structured tool call requested by a function-calling model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned id used to correlate the tool result message.
    pub id: String,
    pub name: String,
    /// Raw JSON argument string as produced by the model.
    pub arguments: String,
}

/// Reason the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinishReason {
    #[default]
    Stop,
    ToolCalls,
    MaxTokens,
}

/// Callback receiving each streamed chunk of model output, in order.
pub type StreamingFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Generation request
#[derive(Clone, Default)]
pub struct GenerateRequest {
    pub messages: Vec<ChatMessage>,
    /// Generation must stop before the first occurrence of any of these.
    pub stop_words: Vec<String>,
    pub tools: Vec<ToolSchema>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub streaming: Option<StreamingFn>,
}

impl fmt::Debug for GenerateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerateRequest")
            .field("messages", &self.messages)
            .field("stop_words", &self.stop_words)
            .field("tools", &self.tools)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("streaming", &self.streaming.is_some())
            .finish()
    }
}

impl GenerateRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// Single-prompt request: the prompt becomes one user message.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self::new(vec![ChatMessage::user(prompt)])
    }

    pub fn with_stop_words(mut self, stop_words: Vec<String>) -> Self {
        self.stop_words = stop_words;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn with_streaming(mut self, streaming: Option<StreamingFn>) -> Self {
        self.streaming = streaming;
        self
    }
}

/// Generation response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
}

impl GenerateResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
        }
    }

    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            finish_reason: FinishReason::ToolCalls,
        }
    }
}

/// Language model client.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Get model name
    fn model(&self) -> &str;

    /// Generate a completion.
    ///
    /// Implementations must honour `request.stop_words` and, when
    /// `request.streaming` is set, deliver every chunk to it before returning.
    async fn generate(
        &self,
        request: GenerateRequest,
        cancel: &CancellationToken,
    ) -> LlmResult<GenerateResponse>;
}

/// Cut `text` before the earliest occurrence of any stop word.
pub fn truncate_at_stop_words<'a>(text: &'a str, stop_words: &[String]) -> &'a str {
    let cut = stop_words
        .iter()
        .filter(|word| !word.is_empty())
        .filter_map(|word| text.find(word.as_str()))
        .min();
    match cut {
        Some(index) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_at_earliest_stop_word() {
        let stops = vec!["\nObservation:".to_string(), "\n\tObservation:".to_string()];
        let text = "Action: search\nAction Input: rust\nObservation: fake result";
        assert_eq!(
            truncate_at_stop_words(text, &stops),
            "Action: search\nAction Input: rust"
        );
    }

    #[test]
    fn leaves_text_without_stop_words_alone() {
        let stops = vec!["\nObservation:".to_string(), String::new()];
        assert_eq!(truncate_at_stop_words("Final Answer: 4", &stops), "Final Answer: 4");
    }

    #[test]
    fn message_constructors_set_roles() {
        let result = ChatMessage::tool_result("call_1", "ok");
        assert_eq!(result.role, Role::Tool);
        assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));

        let call = ToolCall {
            id: "call_1".to_string(),
            name: "search".to_string(),
            arguments: "{}".to_string(),
        };
        let assistant = ChatMessage::assistant_with_tool_calls("", vec![call.clone()]);
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.tool_calls, Some(vec![call]));
    }

    #[test]
    fn request_debug_hides_streaming_callback() {
        let request = GenerateRequest::from_prompt("hi")
            .with_streaming(Some(Arc::new(|_chunk: &str| {})));
        let rendered = format!("{request:?}");
        assert!(rendered.contains("streaming: true"));
    }
}
