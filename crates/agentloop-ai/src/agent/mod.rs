//! Agent module - plan/act loop over pluggable agent variants
//!
//! ## Loop
//!
//! 1. Plan - the agent renders prior steps and asks the model what to do
//! 2. Act - each requested action is dispatched to a tool
//! 3. Observe - the tool output is recorded as a step
//! 4. Repeat until the agent finishes or the executor gives up
//!
//! ## Agent variants
//!
//! | Agent | Protocol |
//! |-------|----------|
//! | [`OneShotAgent`] | ReAct text, `Final Answer:` |
//! | [`ConversationalAgent`] | ReAct text, `AI:`, chat history |
//! | [`FunctionsAgent`] | native tool calls |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agentloop_ai::agent::{Executor, ExecutorConfig, OneShotAgent};
//!
//! let agent = OneShotAgent::new(llm, tools);
//! let executor = Executor::new(agent, ExecutorConfig::default())?;
//! let answer = executor.run("What is 2 + 2?", &cancel).await?;
//! ```

mod executor;
mod functions;
mod journal;
pub mod react;
pub mod scratchpad;
mod step;
mod stream;
mod stuck;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use agentloop_traits::Tool;

use crate::error::Result;

pub use executor::{Executor, ExecutorConfig, ParserErrorHandler, RunOutcome};
pub use functions::{DEFAULT_SYSTEM_MESSAGE, FunctionsAgent};
pub use journal::{ExecutionJournal, JournalEntry};
pub use react::{ConversationalAgent, OneShotAgent};
pub use step::{AgentAction, AgentFinish, AgentStep};
pub use stream::{ChannelEmitter, ExecutionEmitter, ExecutionEvent, NullEmitter};
pub use stuck::{LoopDetector, LoopDetectorConfig, LoopInfo};

/// Default key of the final answer in an agent's return values.
pub const DEFAULT_OUTPUT_KEY: &str = "output";
/// Prompt variable holding the rendered scratchpad.
pub const SCRATCHPAD_KEY: &str = "agent_scratchpad";
/// Prompt variable filled with the current date.
pub const TODAY_KEY: &str = "today";
/// Reserved output key for the step trace.
pub const INTERMEDIATE_STEPS_KEY: &str = "intermediateSteps";

/// Result of one Plan call.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Tool invocations to run, in order.
    Actions(Vec<AgentAction>),
    Finish(AgentFinish),
}

impl Plan {
    /// True for an empty action list, which no agent should return.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Actions(actions) if actions.is_empty())
    }
}

/// Decides the next move from the steps taken so far.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn plan(
        &self,
        steps: &[AgentStep],
        inputs: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<Plan>;

    /// Inputs the caller must supply.
    fn input_keys(&self) -> Vec<String>;

    fn output_keys(&self) -> Vec<String>;

    fn tools(&self) -> &[Arc<dyn Tool>];
}

#[async_trait]
impl<A: Agent + ?Sized> Agent for Arc<A> {
    async fn plan(
        &self,
        steps: &[AgentStep],
        inputs: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<Plan> {
        (**self).plan(steps, inputs, cancel).await
    }

    fn input_keys(&self) -> Vec<String> {
        (**self).input_keys()
    }

    fn output_keys(&self) -> Vec<String> {
        (**self).output_keys()
    }

    fn tools(&self) -> &[Arc<dyn Tool>] {
        (**self).tools()
    }
}
