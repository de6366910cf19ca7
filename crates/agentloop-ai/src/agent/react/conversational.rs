use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use agentloop_traits::{LanguageModel, StreamingFn, Tool};

use super::{ConversationalParser, OutputParser, observation_stop_words, string_inputs_to_values};
use crate::agent::scratchpad::conversational_scratchpad;
use crate::agent::{Agent, AgentStep, DEFAULT_OUTPUT_KEY, Plan, SCRATCHPAD_KEY};
use crate::chains::{self, CallOptions, Chain, LlmChain};
use crate::error::Result;
use crate::prompt::{PromptParts, PromptTemplate, conversational_prompt};

/// Chat-style ReAct agent that answers with `AI:` and reads `history`
/// from memory when the executor carries one.
pub struct ConversationalAgent {
    chain: LlmChain,
    tools: Vec<Arc<dyn Tool>>,
    output_key: String,
    streaming: Option<StreamingFn>,
}

impl ConversationalAgent {
    pub fn new(llm: Arc<dyn LanguageModel>, tools: Vec<Arc<dyn Tool>>) -> Self {
        let prompt = conversational_prompt(&tools, &PromptParts::conversational());
        Self {
            chain: LlmChain::new(llm, prompt),
            tools,
            output_key: DEFAULT_OUTPUT_KEY.to_string(),
            streaming: None,
        }
    }

    pub fn with_output_key(mut self, output_key: impl Into<String>) -> Self {
        self.output_key = output_key.into();
        self
    }

    pub fn with_prompt_parts(self, parts: PromptParts) -> Self {
        let prompt = conversational_prompt(&self.tools, &parts);
        self.with_prompt(prompt)
    }

    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.chain = LlmChain::new(Arc::clone(self.chain.llm()), prompt);
        self
    }

    pub fn with_streaming(mut self, streaming: StreamingFn) -> Self {
        self.streaming = Some(streaming);
        self
    }
}

#[async_trait]
impl Agent for ConversationalAgent {
    async fn plan(
        &self,
        steps: &[AgentStep],
        inputs: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<Plan> {
        let mut full_inputs = string_inputs_to_values(inputs);
        full_inputs.insert(
            SCRATCHPAD_KEY.to_string(),
            Value::String(conversational_scratchpad(steps)),
        );

        let options = CallOptions::default()
            .with_stop_words(observation_stop_words())
            .with_streaming(self.streaming.clone());
        let output = chains::predict(&self.chain, full_inputs, &options, cancel).await?;

        ConversationalParser::new(&self.output_key).parse(&output)
    }

    fn input_keys(&self) -> Vec<String> {
        self.chain
            .input_keys()
            .into_iter()
            .filter(|key| key != SCRATCHPAD_KEY)
            .collect()
    }

    fn output_keys(&self) -> Vec<String> {
        vec![self.output_key.clone()]
    }

    fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentAction;
    use crate::llm::{MockLanguageModel, MockStep};

    #[tokio::test]
    async fn test_plan_renders_history_and_scratchpad() {
        let llm = Arc::new(MockLanguageModel::from_steps(
            "mock-model",
            vec![MockStep::text("Thought: Do I need to use a tool? No\nAI: The answer is 42")],
        ));
        let agent = ConversationalAgent::new(llm.clone(), Vec::new());
        let steps = vec![AgentStep::new(
            AgentAction::new("lookup", "life", "Action: lookup\nAction Input: life"),
            "42",
            1,
        )];
        let inputs = HashMap::from([
            ("input".to_string(), "meaning of life?".to_string()),
            ("history".to_string(), "Human: hi\nAI: hello".to_string()),
        ]);

        let plan = agent
            .plan(&steps, &inputs, &CancellationToken::new())
            .await
            .unwrap();
        match plan {
            Plan::Finish(finish) => {
                assert_eq!(finish.return_values["output"], " The answer is 42")
            }
            other => panic!("expected finish, got {other:?}"),
        }

        let prompt = llm.requests().await[0].messages[0].content.clone();
        assert!(prompt.contains("Previous conversation history:\nHuman: hi\nAI: hello"));
        assert!(prompt.contains("Observation: 42\nThought:"));
    }

    #[test]
    fn test_input_keys() {
        let agent = ConversationalAgent::new(Arc::new(MockLanguageModel::new("m")), Vec::new());
        assert_eq!(agent.input_keys(), vec!["input"]);
    }
}
