use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use agentloop_traits::{LanguageModel, StreamingFn, Tool};

use super::{OutputParser, ReActParser, observation_stop_words, string_inputs_to_values};
use crate::agent::scratchpad::mrkl_scratchpad;
use crate::agent::{Agent, AgentStep, DEFAULT_OUTPUT_KEY, Plan, SCRATCHPAD_KEY, TODAY_KEY};
use crate::chains::{self, CallOptions, Chain, LlmChain};
use crate::error::Result;
use crate::prompt::{PromptParts, PromptTemplate, mrkl_prompt};

/// One-shot ReAct agent.
///
/// The prompt lists the tools and asks the model to answer in
/// `Thought/Action/Action Input` steps until it writes `Final Answer:`.
pub struct OneShotAgent {
    chain: LlmChain,
    tools: Vec<Arc<dyn Tool>>,
    output_key: String,
    parser: Option<Arc<dyn OutputParser>>,
    streaming: Option<StreamingFn>,
}

impl OneShotAgent {
    pub fn new(llm: Arc<dyn LanguageModel>, tools: Vec<Arc<dyn Tool>>) -> Self {
        let prompt = mrkl_prompt(&tools, &PromptParts::mrkl());
        Self {
            chain: LlmChain::new(llm, prompt),
            tools,
            output_key: DEFAULT_OUTPUT_KEY.to_string(),
            parser: None,
            streaming: None,
        }
    }

    pub fn with_output_key(mut self, output_key: impl Into<String>) -> Self {
        self.output_key = output_key.into();
        self
    }

    /// Rebuild the default prompt from custom parts.
    pub fn with_prompt_parts(self, parts: PromptParts) -> Self {
        let prompt = mrkl_prompt(&self.tools, &parts);
        self.with_prompt(prompt)
    }

    /// Replace the prompt entirely.
    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.chain = LlmChain::new(Arc::clone(self.chain.llm()), prompt);
        self
    }

    pub fn with_output_parser(mut self, parser: Arc<dyn OutputParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn with_streaming(mut self, streaming: StreamingFn) -> Self {
        self.streaming = Some(streaming);
        self
    }

    pub fn prompt(&self) -> &PromptTemplate {
        self.chain.prompt()
    }

    fn parse(&self, output: &str) -> Result<Plan> {
        match &self.parser {
            Some(parser) => parser.parse(output),
            None => ReActParser::new(&self.output_key).parse(output),
        }
    }
}

#[async_trait]
impl Agent for OneShotAgent {
    async fn plan(
        &self,
        steps: &[AgentStep],
        inputs: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<Plan> {
        let mut full_inputs = string_inputs_to_values(inputs);
        full_inputs.insert(
            SCRATCHPAD_KEY.to_string(),
            Value::String(mrkl_scratchpad(steps)),
        );
        full_inputs.insert(
            TODAY_KEY.to_string(),
            Value::String(Local::now().format("%B %-d, %Y").to_string()),
        );

        let options = CallOptions::default()
            .with_stop_words(observation_stop_words())
            .with_streaming(self.streaming.clone());
        let output = chains::predict(&self.chain, full_inputs, &options, cancel).await?;
        tracing::debug!(output_len = output.len(), "One-shot agent generated output");

        self.parse(&output)
    }

    fn input_keys(&self) -> Vec<String> {
        self.chain
            .input_keys()
            .into_iter()
            .filter(|key| key != SCRATCHPAD_KEY && key != TODAY_KEY)
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
    use std::sync::Mutex;

    fn inputs(question: &str) -> HashMap<String, String> {
        HashMap::from([("input".to_string(), question.to_string())])
    }

    #[tokio::test]
    async fn test_plan_sends_scratchpad_and_stop_words() {
        let llm = Arc::new(MockLanguageModel::from_steps(
            "mock-model",
            vec![MockStep::text("Thought: done\nFinal Answer: 4")],
        ));
        let agent = OneShotAgent::new(llm.clone(), Vec::new());
        let steps = vec![AgentStep::new(
            AgentAction::new("calc", "2+2", "Action: calc\nAction Input: 2+2"),
            "4",
            1,
        )];

        let plan = agent
            .plan(&steps, &inputs("what is 2+2?"), &CancellationToken::new())
            .await
            .unwrap();
        match plan {
            Plan::Finish(finish) => assert_eq!(finish.return_values["output"], "4"),
            other => panic!("expected finish, got {other:?}"),
        }

        let requests = llm.requests().await;
        let prompt = &requests[0].messages[0].content;
        assert!(prompt.contains("Question: what is 2+2?"));
        assert!(prompt.contains("Thought:\nAction: calc\nAction Input: 2+2\nObservation: 4\n"));
        assert!(!prompt.contains("{{today}}"));
        assert_eq!(requests[0].stop_words, vec!["\nObservation:", "\n\tObservation:"]);
    }

    #[test]
    fn test_input_keys_exclude_reserved_variables() {
        let agent = OneShotAgent::new(Arc::new(MockLanguageModel::new("m")), Vec::new());
        assert_eq!(agent.input_keys(), vec!["input"]);
        assert_eq!(agent.output_keys(), vec!["output"]);
        assert!(agent.chain.input_keys().contains(&"today".to_string()));
    }

    #[tokio::test]
    async fn test_custom_output_key_and_streaming() {
        let llm = Arc::new(MockLanguageModel::from_steps(
            "mock-model",
            vec![MockStep::text("Final Answer: streamed answer")],
        ));
        let chunks = Arc::new(Mutex::new(String::new()));
        let sink = Arc::clone(&chunks);
        let agent = OneShotAgent::new(llm, Vec::new())
            .with_output_key("answer")
            .with_streaming(Arc::new(move |chunk: &str| sink.lock().unwrap().push_str(chunk)));

        let plan = agent
            .plan(&[], &inputs("q"), &CancellationToken::new())
            .await
            .unwrap();
        match plan {
            Plan::Finish(finish) => assert_eq!(finish.return_values["answer"], "streamed answer"),
            other => panic!("expected finish, got {other:?}"),
        }
        assert_eq!(chunks.lock().unwrap().as_str(), "Final Answer: streamed answer");
    }

    #[tokio::test]
    async fn test_parse_error_propagates() {
        let llm = Arc::new(MockLanguageModel::from_steps(
            "mock-model",
            vec![MockStep::text("I am not following the format")],
        ));
        let agent = OneShotAgent::new(llm, Vec::new());
        let err = agent
            .plan(&[], &inputs("q"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_parse_error());
    }
}
