use serde::{Deserialize, Serialize};

use agentloop_traits::Values;

/// One tool invocation requested by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAction {
    pub tool: String,
    pub tool_input: String,
    /// Raw model text that produced this action, replayed into the scratchpad.
    pub log: String,
    /// Provider-assigned id for function-calling models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Argument JSON exactly as the function-calling model sent it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input_original_arguments: Option<String>,
}

impl AgentAction {
    pub fn new(
        tool: impl Into<String>,
        tool_input: impl Into<String>,
        log: impl Into<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            tool_input: tool_input.into(),
            log: log.into(),
            tool_call_id: None,
            tool_input_original_arguments: None,
        }
    }

    pub fn with_tool_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }

    pub fn with_original_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.tool_input_original_arguments = Some(arguments.into());
        self
    }

    /// Empty action used for synthetic parse-error steps.
    pub fn is_empty(&self) -> bool {
        self.tool.is_empty() && self.tool_input.is_empty() && self.log.is_empty()
    }
}

/// Terminal payload of the loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentFinish {
    pub return_values: Values,
    pub log: String,
}

impl AgentFinish {
    /// Finish with a single string value under `output_key`.
    pub fn single(output_key: &str, output: impl Into<String>, log: impl Into<String>) -> Self {
        let mut return_values = Values::new();
        return_values.insert(
            output_key.to_string(),
            serde_json::Value::String(output.into()),
        );
        Self {
            return_values,
            log: log.into(),
        }
    }
}

/// A completed (action, observation) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStep {
    pub action: AgentAction,
    pub observation: String,
    /// Executor iteration (1-based) whose Plan call produced the action.
    pub iteration: usize,
}

impl AgentStep {
    pub fn new(action: AgentAction, observation: impl Into<String>, iteration: usize) -> Self {
        Self {
            action,
            observation: observation.into(),
            iteration,
        }
    }
}
