//! Deterministic mock language model for agent and executor tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;

use agentloop_traits::{
    GenerateRequest, GenerateResponse, LanguageModel, LlmError, LlmResult, Role, ToolCall,
    truncate_at_stop_words,
};

/// Deterministic step for scripted mock completions.
#[derive(Debug, Clone)]
pub enum MockStepKind {
    /// Return a plain assistant message.
    Text(String),
    /// Return structured tool calls, optionally with content.
    ToolCalls {
        content: String,
        calls: Vec<ToolCall>,
    },
    /// Return an LLM error.
    Error(String),
    /// Never answer; only cancellation ends the call.
    Hang,
}

/// Scripted completion step with optional delay.
#[derive(Debug, Clone)]
pub struct MockStep {
    pub delay_ms: u64,
    pub kind: MockStepKind,
}

impl MockStep {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Text(content.into()),
        }
    }

    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self::tool_calls(
            "",
            vec![ToolCall {
                id: id.into(),
                name: name.into(),
                arguments: arguments.to_string(),
            }],
        )
    }

    pub fn tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::ToolCalls {
                content: content.into(),
                calls,
            },
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Error(message.into()),
        }
    }

    pub fn hang() -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Hang,
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// A deterministic mock model driven by scripted steps.
///
/// Stop words are applied to text output and the streaming callback receives
/// the truncated text in word-sized chunks. Every request is recorded.
#[derive(Debug, Clone, Default)]
pub struct MockLanguageModel {
    model: String,
    script: Arc<Mutex<VecDeque<MockStep>>>,
    fallback: Option<MockStep>,
    requests: Arc<Mutex<Vec<GenerateRequest>>>,
    call_count: Arc<AtomicUsize>,
}

impl MockLanguageModel {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn from_steps(model: impl Into<String>, steps: Vec<MockStep>) -> Self {
        Self {
            model: model.into(),
            script: Arc::new(Mutex::new(VecDeque::from(steps))),
            ..Default::default()
        }
    }

    /// Step replayed whenever the script is exhausted.
    pub fn with_fallback(mut self, step: MockStep) -> Self {
        self.fallback = Some(step);
        self
    }

    pub async fn push_step(&self, step: MockStep) {
        self.script.lock().await.push_back(step);
    }

    pub async fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().await.clone()
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    async fn next_step(&self, request: &GenerateRequest) -> MockStep {
        if let Some(step) = self.script.lock().await.pop_front() {
            return step;
        }
        self.fallback
            .clone()
            .unwrap_or_else(|| Self::fallback_step(request))
    }

    fn fallback_step(request: &GenerateRequest) -> MockStep {
        let text = request
            .messages
            .iter()
            .rev()
            .find(|msg| matches!(msg.role, Role::User))
            .map(|msg| format!("mock-echo: {}", msg.content))
            .unwrap_or_else(|| "mock-ok".to_string());
        MockStep::text(text)
    }

    fn stream(request: &GenerateRequest, content: &str) {
        if let Some(streaming) = &request.streaming {
            for chunk in content.split_inclusive(' ') {
                streaming(chunk);
            }
        }
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: GenerateRequest,
        cancel: &CancellationToken,
    ) -> LlmResult<GenerateResponse> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());

        let step = self.next_step(&request).await;

        if step.delay_ms > 0 {
            tokio::select! {
                _ = cancel.cancelled() => return Err(LlmError::Cancelled),
                _ = sleep(Duration::from_millis(step.delay_ms)) => {}
            }
        }

        match step.kind {
            MockStepKind::Text(content) => {
                let content = truncate_at_stop_words(&content, &request.stop_words).to_string();
                Self::stream(&request, &content);
                Ok(GenerateResponse::text(content))
            }
            MockStepKind::ToolCalls { content, calls } => {
                Self::stream(&request, &content);
                Ok(GenerateResponse::with_tool_calls(content, calls))
            }
            MockStepKind::Error(message) => Err(LlmError::Request(message)),
            MockStepKind::Hang => {
                cancel.cancelled().await;
                Err(LlmError::Cancelled)
            }
        }
    }
}
