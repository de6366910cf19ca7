use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use agentloop_traits::{ChatMessage, Memory, MemoryError, MemoryResult, Role, Values};

use super::working::{DEFAULT_MAX_MESSAGES, WorkingMemory};
use crate::prompt::value_to_prompt_text;

pub const DEFAULT_MEMORY_KEY: &str = "history";

/// Chat history exposed to chains as a `Human:`/`AI:` transcript.
#[derive(Debug)]
pub struct ConversationBuffer {
    window: Mutex<WorkingMemory>,
    memory_key: String,
    input_key: Option<String>,
    output_key: Option<String>,
    human_prefix: String,
    ai_prefix: String,
}

impl Default for ConversationBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

impl ConversationBuffer {
    pub fn new(max_messages: usize) -> Self {
        Self {
            window: Mutex::new(WorkingMemory::new(max_messages)),
            memory_key: DEFAULT_MEMORY_KEY.to_string(),
            input_key: None,
            output_key: None,
            human_prefix: "Human".to_string(),
            ai_prefix: "AI".to_string(),
        }
    }

    pub fn with_memory_key(mut self, key: impl Into<String>) -> Self {
        self.memory_key = key.into();
        self
    }

    /// Input key to record. Without one, the inputs must hold a single key.
    pub fn with_input_key(mut self, key: impl Into<String>) -> Self {
        self.input_key = Some(key.into());
        self
    }

    /// Output key to record. Without one, the outputs must hold a single key.
    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    pub fn with_prefixes(mut self, human: impl Into<String>, ai: impl Into<String>) -> Self {
        self.human_prefix = human.into();
        self.ai_prefix = ai.into();
        self
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.window.lock().await.get_messages()
    }

    /// Render the history as `Prefix: content` lines.
    pub async fn buffer_string(&self) -> String {
        let window = self.window.lock().await;
        window
            .iter()
            .map(|msg| {
                let prefix = match msg.role {
                    Role::User => self.human_prefix.as_str(),
                    Role::Assistant => self.ai_prefix.as_str(),
                    Role::System => "System",
                    Role::Tool => "Tool",
                };
                format!("{prefix}: {}", msg.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn pick<'a>(
        &self,
        values: &'a Values,
        key: Option<&String>,
        what: &str,
    ) -> MemoryResult<&'a Value> {
        if let Some(key) = key {
            return values.get(key).ok_or_else(|| {
                MemoryError::InvalidInputValues(format!("missing {what} key '{key}'"))
            });
        }
        let candidates: Vec<&String> = values
            .keys()
            .filter(|k| **k != self.memory_key)
            .collect();
        match candidates.as_slice() {
            [only] => Ok(&values[*only]),
            _ => Err(MemoryError::InvalidInputValues(format!(
                "expected a single {what} key, got {}; configure the {what} key",
                candidates.len()
            ))),
        }
    }
}

#[async_trait]
impl Memory for ConversationBuffer {
    fn memory_variables(&self) -> Vec<String> {
        vec![self.memory_key.clone()]
    }

    async fn load_variables(&self, _inputs: &Values) -> MemoryResult<Values> {
        let mut values = Values::new();
        values.insert(
            self.memory_key.clone(),
            Value::String(self.buffer_string().await),
        );
        Ok(values)
    }

    async fn save_context(&self, inputs: &Values, outputs: &Values) -> MemoryResult<()> {
        let input = value_to_prompt_text(self.pick(inputs, self.input_key.as_ref(), "input")?);
        let output = value_to_prompt_text(self.pick(outputs, self.output_key.as_ref(), "output")?);

        let mut window = self.window.lock().await;
        window.add(ChatMessage::user(input));
        window.add(ChatMessage::assistant(output));
        Ok(())
    }

    async fn clear(&self) -> MemoryResult<()> {
        self.window.lock().await.clear();
        Ok(())
    }
}
