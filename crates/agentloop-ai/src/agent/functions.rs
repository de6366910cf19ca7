//! Native function-calling agent.
//!
//! The model returns structured tool calls, so no text parsing is involved:
//! zero calls finish with the response content, otherwise each call becomes
//! one [`AgentAction`] tagged with its provider call id.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use agentloop_traits::{
    ChatMessage, GenerateRequest, GenerateResponse, LanguageModel, SINGLE_ARGUMENT, StreamingFn,
    Tool, ToolCall,
};

use super::react::string_inputs_to_values;
use super::scratchpad::function_messages;
use super::{Agent, AgentAction, AgentFinish, AgentStep, DEFAULT_OUTPUT_KEY, Plan};
use crate::error::{AgentError, Result};
use crate::prompt::PromptTemplate;

pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful AI assistant.";

pub struct FunctionsAgent {
    llm: Arc<dyn LanguageModel>,
    tools: Vec<Arc<dyn Tool>>,
    system_message: String,
    extra_messages: Vec<ChatMessage>,
    input_template: PromptTemplate,
    output_key: String,
    streaming: Option<StreamingFn>,
}

impl FunctionsAgent {
    pub fn new(llm: Arc<dyn LanguageModel>, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            llm,
            tools,
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            extra_messages: Vec::new(),
            input_template: PromptTemplate::new("{{input}}"),
            output_key: DEFAULT_OUTPUT_KEY.to_string(),
            streaming: None,
        }
    }

    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = message.into();
        self
    }

    /// Messages placed between the system message and the user input.
    pub fn with_extra_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.extra_messages = messages;
        self
    }

    /// Template for the user message; its variables become the input keys.
    pub fn with_input_template(mut self, template: PromptTemplate) -> Self {
        self.input_template = template;
        self
    }

    pub fn with_output_key(mut self, output_key: impl Into<String>) -> Self {
        self.output_key = output_key.into();
        self
    }

    pub fn with_streaming(mut self, streaming: StreamingFn) -> Self {
        self.streaming = Some(streaming);
        self
    }

    fn build_messages(
        &self,
        steps: &[AgentStep],
        inputs: &HashMap<String, String>,
    ) -> Result<Vec<ChatMessage>> {
        let user = self.input_template.format(&string_inputs_to_values(inputs))?;

        let mut messages = Vec::with_capacity(self.extra_messages.len() + steps.len() * 2 + 2);
        messages.push(ChatMessage::system(&self.system_message));
        messages.extend(self.extra_messages.iter().cloned());
        messages.push(ChatMessage::user(user));
        messages.extend(function_messages(steps));
        Ok(messages)
    }

    /// Turn a model response into a plan.
    pub fn parse_response(&self, response: GenerateResponse) -> Result<Plan> {
        if response.tool_calls.is_empty() {
            return Ok(Plan::Finish(AgentFinish::single(
                &self.output_key,
                response.content.clone(),
                response.content,
            )));
        }

        let content_msg = if response.content.is_empty() {
            "\n".to_string()
        } else {
            format!("responded: {}\n", response.content)
        };

        response
            .tool_calls
            .iter()
            .map(|call| {
                let tool_input = tool_input_from_arguments(call)?;
                let log = format!(
                    "Invoking: {} with {} \n {} \n",
                    call.name, call.arguments, content_msg
                );
                Ok(AgentAction::new(&call.name, tool_input, log)
                    .with_tool_call_id(&call.id)
                    .with_original_arguments(&call.arguments))
            })
            .collect::<Result<Vec<_>>>()
            .map(Plan::Actions)
    }
}

/// Unwrap a single-string argument; otherwise pass the argument JSON through.
fn tool_input_from_arguments(call: &ToolCall) -> Result<String> {
    let raw = if call.arguments.trim().is_empty() {
        "{}"
    } else {
        call.arguments.as_str()
    };

    let parsed: Value = serde_json::from_str(raw).map_err(|e| {
        AgentError::UnableToParseOutput(format!(
            "invalid arguments for tool '{}' ({e}): {}",
            call.name, call.arguments
        ))
    })?;
    let Value::Object(map) = parsed else {
        return Err(AgentError::UnableToParseOutput(format!(
            "arguments for tool '{}' are not a JSON object: {}",
            call.name, call.arguments
        )));
    };

    match map.get(SINGLE_ARGUMENT) {
        Some(Value::String(arg)) => Ok(arg.clone()),
        _ => Ok(raw.to_string()),
    }
}

#[async_trait]
impl Agent for FunctionsAgent {
    async fn plan(
        &self,
        steps: &[AgentStep],
        inputs: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<Plan> {
        let messages = self.build_messages(steps, inputs)?;
        let schemas = self.tools.iter().map(|tool| tool.schema()).collect();
        let request = GenerateRequest::new(messages)
            .with_tools(schemas)
            .with_streaming(self.streaming.clone());

        let response = self.llm.generate(request, cancel).await?;
        tracing::debug!(
            tool_calls = response.tool_calls.len(),
            "Function-calling agent received response"
        );
        self.parse_response(response)
    }

    fn input_keys(&self) -> Vec<String> {
        self.input_template.input_variables()
    }

    fn output_keys(&self) -> Vec<String> {
        vec![self.output_key.clone()]
    }

    fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }
}
