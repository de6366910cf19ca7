use std::sync::Arc;

use agentloop_traits::Tool;

use super::PromptTemplate;

pub const MRKL_PREFIX: &str = "Today is {{today}}.
Answer the following questions as best you can. You have access to the following tools:

{{tool_descriptions}}";

pub const MRKL_FORMAT_INSTRUCTIONS: &str = "Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [ {{tool_names}} ]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question";

pub const MRKL_SUFFIX: &str = "Begin!

Question: {{input}}
Thought:{{agent_scratchpad}}";

pub const CONVERSATIONAL_PREFIX: &str = "Assistant is a large language model trained to help with a wide range of tasks, \
from answering simple questions to providing in-depth explanations and discussions. \
Assistant generates human-like text and keeps the conversation coherent and relevant.

TOOLS:
------

Assistant has access to the following tools:

{{tool_descriptions}}";

pub const CONVERSATIONAL_FORMAT_INSTRUCTIONS: &str = "To use a tool, please use the following format:

Thought: Do I need to use a tool? Yes
Action: the action to take, should be one of [ {{tool_names}} ]
Action Input: the input to the action
Observation: the result of the action

When you have a response to say to the Human, or if you do not need to use a tool, you MUST use the format:

Thought: Do I need to use a tool? No
AI: [your response here]";

pub const CONVERSATIONAL_SUFFIX: &str = "Begin!

Previous conversation history:
{{history}}

New input: {{input}}

Thought:{{agent_scratchpad}}";

/// Prefix, format instructions and suffix of an agent prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptParts {
    pub prefix: String,
    pub format_instructions: String,
    pub suffix: String,
}

impl PromptParts {
    pub fn mrkl() -> Self {
        Self {
            prefix: MRKL_PREFIX.to_string(),
            format_instructions: MRKL_FORMAT_INSTRUCTIONS.to_string(),
            suffix: MRKL_SUFFIX.to_string(),
        }
    }

    pub fn conversational() -> Self {
        Self {
            prefix: CONVERSATIONAL_PREFIX.to_string(),
            format_instructions: CONVERSATIONAL_FORMAT_INSTRUCTIONS.to_string(),
            suffix: CONVERSATIONAL_SUFFIX.to_string(),
        }
    }

    fn join(&self) -> String {
        [
            self.prefix.as_str(),
            self.format_instructions.as_str(),
            self.suffix.as_str(),
        ]
        .join("\n\n")
    }
}

pub fn tool_names(tools: &[Arc<dyn Tool>]) -> String {
    tools
        .iter()
        .map(|tool| tool.name())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn tool_descriptions(tools: &[Arc<dyn Tool>]) -> String {
    tools
        .iter()
        .map(|tool| format!("- {}: {}\n", tool.name(), tool.description()))
        .collect()
}

pub fn mrkl_prompt(tools: &[Arc<dyn Tool>], parts: &PromptParts) -> PromptTemplate {
    PromptTemplate::new(parts.join())
        .with_partial("tool_names", tool_names(tools))
        .with_partial("tool_descriptions", tool_descriptions(tools))
}

/// Conversational prompt; `history` defaults to empty until memory supplies it.
pub fn conversational_prompt(tools: &[Arc<dyn Tool>], parts: &PromptParts) -> PromptTemplate {
    mrkl_prompt(tools, parts).with_partial("history", "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_traits::{CancellationToken, ToolResult};
    use async_trait::async_trait;

    struct Named(&'static str, &'static str);

    #[async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            self.1
        }

        async fn call(&self, input: &str, _cancel: &CancellationToken) -> ToolResult<String> {
            Ok(input.to_string())
        }
    }

    fn tools() -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(Named("search", "Look things up")),
            Arc::new(Named("calculator", "Do math")),
        ]
    }

    #[test]
    fn test_tool_helpers() {
        let tools = tools();
        assert_eq!(tool_names(&tools), "search, calculator");
        assert_eq!(
            tool_descriptions(&tools),
            "- search: Look things up\n- calculator: Do math\n"
        );
    }

    #[test]
    fn test_mrkl_prompt_inputs() {
        let prompt = mrkl_prompt(&tools(), &PromptParts::mrkl());
        assert_eq!(
            prompt.input_variables(),
            vec!["today", "input", "agent_scratchpad"]
        );
        assert!(prompt.template().contains("Final Answer:"));
    }

    #[test]
    fn test_conversational_prompt_inputs() {
        let prompt = conversational_prompt(&tools(), &PromptParts::conversational());
        assert_eq!(prompt.input_variables(), vec!["input", "agent_scratchpad"]);
        assert!(prompt.template().contains("AI: [your response here]"));
    }
}
