use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use agentloop_traits::{GenerateRequest, LanguageModel, Memory, Values};

use super::{CallOptions, Chain};
use crate::error::Result;
use crate::prompt::PromptTemplate;

pub const LLM_CHAIN_OUTPUT_KEY: &str = "text";

/// Formats a prompt and sends it to a language model.
pub struct LlmChain {
    prompt: PromptTemplate,
    llm: Arc<dyn LanguageModel>,
    output_key: String,
    memory: Option<Arc<dyn Memory>>,
}

impl LlmChain {
    pub fn new(llm: Arc<dyn LanguageModel>, prompt: PromptTemplate) -> Self {
        Self {
            prompt,
            llm,
            output_key: LLM_CHAIN_OUTPUT_KEY.to_string(),
            memory: None,
        }
    }

    pub fn with_output_key(mut self, output_key: impl Into<String>) -> Self {
        self.output_key = output_key.into();
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn Memory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    pub fn llm(&self) -> &Arc<dyn LanguageModel> {
        &self.llm
    }
}

#[async_trait]
impl Chain for LlmChain {
    async fn call(
        &self,
        inputs: Values,
        options: &CallOptions,
        cancel: &CancellationToken,
    ) -> Result<Values> {
        let prompt = self.prompt.format(&inputs)?;

        let mut request = GenerateRequest::from_prompt(prompt)
            .with_stop_words(options.stop_words.clone())
            .with_streaming(options.streaming.clone());
        if let Some(temperature) = options.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = options.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.llm.generate(request, cancel).await?;

        let mut outputs = Values::new();
        outputs.insert(self.output_key.clone(), Value::String(response.content));
        Ok(outputs)
    }

    fn input_keys(&self) -> Vec<String> {
        self.prompt.input_variables()
    }

    fn output_keys(&self) -> Vec<String> {
        vec![self.output_key.clone()]
    }

    fn memory(&self) -> Option<Arc<dyn Memory>> {
        self.memory.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::{self, predict};
    use crate::llm::{MockLanguageModel, MockStep};
    use serde_json::json;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_llm_chain_formats_prompt_and_forwards_options() {
        let llm = Arc::new(MockLanguageModel::from_steps(
            "mock-model",
            vec![MockStep::text("Paris\nObservation: ignored")],
        ));
        let chain = LlmChain::new(llm.clone(), PromptTemplate::new("Capital of {{country}}?"));

        let chunks = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&chunks);
        let options = CallOptions::default()
            .with_stop_words(vec!["\nObservation:".to_string()])
            .with_streaming(Some(Arc::new(move |chunk: &str| {
                sink.lock().unwrap().push(chunk.to_string());
            })));

        let inputs = Values::from([("country".to_string(), json!("France"))]);
        let output = predict(&chain, inputs, &options, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(output, "Paris");
        assert_eq!(chunks.lock().unwrap().concat(), "Paris");

        let requests = llm.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages[0].content, "Capital of France?");
        assert_eq!(requests[0].stop_words, vec!["\nObservation:".to_string()]);
    }

    #[tokio::test]
    async fn test_llm_chain_declares_prompt_inputs() {
        let llm = Arc::new(MockLanguageModel::new("mock-model"));
        let chain = LlmChain::new(llm, PromptTemplate::new("{{a}} and {{b}}"));
        assert_eq!(chain.input_keys(), vec!["a", "b"]);
        assert_eq!(chain.output_keys(), vec![LLM_CHAIN_OUTPUT_KEY]);

        let err = chains::call(
            &chain,
            Values::from([("a".to_string(), json!("x"))]),
            &CallOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, crate::AgentError::InputValidation(_)));
    }
}
