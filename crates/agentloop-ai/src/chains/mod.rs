//! Chain contract and the call/run/predict/apply helpers.
//!
//! A [`Chain`] declares its input and output keys; the helpers validate them
//! and thread an optional [`Memory`] around the call. The executor is itself a
//! chain, so memory and batch application work the same way for agents.

mod llm;

pub use llm::{LLM_CHAIN_OUTPUT_KEY, LlmChain};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::FuturesOrdered;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;

use agentloop_traits::{Memory, StreamingFn, Values};

use crate::error::{AgentError, Result};

/// Default worker count for [`apply`].
pub const DEFAULT_APPLY_WORKERS: usize = 5;

/// Per-call generation options forwarded to the model.
#[derive(Clone, Default)]
pub struct CallOptions {
    pub stop_words: Vec<String>,
    pub streaming: Option<StreamingFn>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("stop_words", &self.stop_words)
            .field("streaming", &self.streaming.is_some())
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl CallOptions {
    pub fn with_stop_words(mut self, stop_words: Vec<String>) -> Self {
        self.stop_words = stop_words;
        self
    }

    pub fn with_streaming(mut self, streaming: Option<StreamingFn>) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A component with declared input and output keys.
#[async_trait]
pub trait Chain: Send + Sync {
    /// Run the chain on already-validated inputs.
    async fn call(
        &self,
        inputs: Values,
        options: &CallOptions,
        cancel: &CancellationToken,
    ) -> Result<Values>;

    fn input_keys(&self) -> Vec<String>;

    fn output_keys(&self) -> Vec<String>;

    fn memory(&self) -> Option<Arc<dyn Memory>> {
        None
    }
}

/// Call a chain with memory load/save and key validation.
pub async fn call(
    chain: &dyn Chain,
    inputs: Values,
    options: &CallOptions,
    cancel: &CancellationToken,
) -> Result<Values> {
    let memory = chain.memory();

    let mut full_inputs = inputs.clone();
    if let Some(memory) = &memory {
        let loaded = memory.load_variables(&inputs).await?;
        for (key, value) in loaded {
            full_inputs.entry(key).or_insert(value);
        }
    }

    validate_keys(&chain.input_keys(), &full_inputs, "input")?;
    let outputs = chain.call(full_inputs, options, cancel).await?;
    validate_keys(&chain.output_keys(), &outputs, "output")?;

    if let Some(memory) = &memory {
        memory.save_context(&inputs, &outputs).await?;
    }
    Ok(outputs)
}

/// Call a chain that takes exactly one input and returns exactly one string.
pub async fn run(
    chain: &dyn Chain,
    input: impl Into<String>,
    options: &CallOptions,
    cancel: &CancellationToken,
) -> Result<String> {
    let memory_keys = chain
        .memory()
        .map(|memory| memory.memory_variables())
        .unwrap_or_default();
    let needed: Vec<String> = chain
        .input_keys()
        .into_iter()
        .filter(|key| !memory_keys.contains(key))
        .collect();
    let [input_key] = needed.as_slice() else {
        return Err(AgentError::InputValidation(format!(
            "run requires exactly one input key, chain expects {needed:?}"
        )));
    };

    let output_keys = chain.output_keys();
    let [output_key] = output_keys.as_slice() else {
        return Err(AgentError::InputValidation(format!(
            "run requires exactly one output key, chain returns {output_keys:?}"
        )));
    };

    let mut inputs = Values::new();
    inputs.insert(input_key.clone(), Value::String(input.into()));
    let outputs = call(chain, inputs, options, cancel).await?;
    string_output(&outputs, output_key)
}

/// Call a chain and return its single string output.
pub async fn predict(
    chain: &dyn Chain,
    inputs: Values,
    options: &CallOptions,
    cancel: &CancellationToken,
) -> Result<String> {
    let output_keys = chain.output_keys();
    let [output_key] = output_keys.as_slice() else {
        return Err(AgentError::InputValidation(format!(
            "predict requires exactly one output key, chain returns {output_keys:?}"
        )));
    };
    let outputs = call(chain, inputs, options, cancel).await?;
    string_output(&outputs, output_key)
}

/// Call a chain once per input map on a bounded worker pool.
///
/// Results come back in input order. The first failure (in input order) is
/// returned and the remaining workers are cancelled.
pub async fn apply(
    chain: Arc<dyn Chain>,
    inputs: Vec<Values>,
    max_workers: usize,
    options: &CallOptions,
    cancel: &CancellationToken,
) -> Result<Vec<Values>> {
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let workers = cancel.child_token();
    let mut handles: Vec<AbortHandle> = Vec::with_capacity(inputs.len());
    let mut ordered = FuturesOrdered::new();

    for input in inputs {
        let chain = Arc::clone(&chain);
        let sem = Arc::clone(&semaphore);
        let options = options.clone();
        let cancel = workers.clone();

        let handle: JoinHandle<Result<Values>> = tokio::spawn(async move {
            let _permit = sem
                .acquire()
                .await
                .map_err(|_| AgentError::Worker("worker semaphore closed".to_string()))?;
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            call(chain.as_ref(), input, &options, &cancel).await
        });
        handles.push(handle.abort_handle());

        ordered.push_back(async move {
            match handle.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Err(AgentError::Cancelled),
                Err(e) => Err(AgentError::Worker(format!("worker task panicked: {e}"))),
            }
        });
    }

    let mut outputs = Vec::with_capacity(ordered.len());
    while let Some(result) = ordered.next().await {
        match result {
            Ok(values) => outputs.push(values),
            Err(error) => {
                workers.cancel();
                handles.iter().for_each(AbortHandle::abort);
                tracing::debug!(error = %error, "Chain apply stopped on first failure");
                return Err(error);
            }
        }
    }
    Ok(outputs)
}

fn validate_keys(expected: &[String], values: &Values, direction: &str) -> Result<()> {
    let missing: Vec<&str> = expected
        .iter()
        .filter(|key| !values.contains_key(key.as_str()))
        .map(String::as_str)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AgentError::InputValidation(format!(
            "missing {direction} keys: {}",
            missing.join(", ")
        )))
    }
}

fn string_output(outputs: &Values, key: &str) -> Result<String> {
    match outputs.get(key) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(other) => Err(AgentError::InputValidation(format!(
            "output '{key}' is not a string: {other}"
        ))),
        None => Err(AgentError::InputValidation(format!(
            "missing output key: {key}"
        ))),
    }
}
