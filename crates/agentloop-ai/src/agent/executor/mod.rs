//! Executor - drives an [`Agent`] until it finishes or gives up.
//!
//! Each iteration makes exactly one Plan call, then dispatches the planned
//! actions in order. The loop is sequential: iteration N+1 always sees every
//! observation from iteration N.
//!
//! Recoverable conditions become observations fed back to the model:
//! - an unknown tool name
//! - an unparseable model output, when a [`ParserErrorHandler`] is set
//!
//! Everything else (tool failures, loops, the iteration ceiling, model
//! errors, cancellation) ends the invocation. [`Executor::run_with_steps`]
//! keeps the partial trace in that case.

mod config;
mod tool_exec;


pub use config::{DEFAULT_MAX_ITERATIONS, ExecutorConfig, ParserErrorHandler, RunOutcome};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use agentloop_traits::{Memory, Values};

use super::journal::ExecutionJournal;
use super::react::string_inputs_to_values;
use super::stream::{ExecutionEmitter, ExecutionEvent, NullEmitter};
use super::stuck::LoopDetector;
use super::{Agent, AgentAction, AgentFinish, AgentStep, INTERMEDIATE_STEPS_KEY, Plan};
use crate::chains::{self, CallOptions, Chain};
use crate::error::{AgentError, ErrorKind, Result};
use crate::tools::ToolRegistry;
use tool_exec::{Dispatch, dispatch, tool_input};

/// Runs the plan/act loop for one agent.
pub struct Executor {
    agent: Arc<dyn Agent>,
    registry: ToolRegistry,
    config: ExecutorConfig,
    parser_error_handler: Option<ParserErrorHandler>,
    emitter: Arc<dyn ExecutionEmitter>,
    journal: Option<ExecutionJournal>,
    memory: Option<Arc<dyn Memory>>,
}

impl Executor {
    /// Build an executor; fails on an invalid config or duplicate tool names.
    pub fn new(agent: impl Agent + 'static, config: ExecutorConfig) -> Result<Self> {
        config.validate()?;
        let registry = ToolRegistry::from_tools(agent.tools())?;
        Ok(Self {
            agent: Arc::new(agent),
            registry,
            config,
            parser_error_handler: None,
            emitter: Arc::new(NullEmitter),
            journal: None,
            memory: None,
        })
    }

    /// Feed parse errors back to the model instead of failing.
    pub fn with_parser_error_handler(mut self, handler: ParserErrorHandler) -> Self {
        self.parser_error_handler = Some(handler);
        self
    }

    pub fn with_emitter(mut self, emitter: Arc<dyn ExecutionEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn with_journal(mut self, journal: ExecutionJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Memory loaded and saved by [`chains::call`] around each invocation.
    pub fn with_memory(mut self, memory: Arc<dyn Memory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answer a single input through [`chains::run`].
    pub async fn run(
        &self,
        input: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        chains::run(self, input, &CallOptions::default(), cancel).await
    }

    /// Run the loop and return the steps taken even when it fails.
    pub async fn run_with_steps(
        &self,
        inputs: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let execution_id = Uuid::new_v4().to_string();
        let mut steps = Vec::new();
        let mut iterations = 0;

        tracing::info!(
            execution_id = %execution_id,
            max_iterations = self.config.max_iterations,
            tools = self.registry.len(),
            "Starting agent execution"
        );
        if let Some(journal) = &self.journal {
            journal.log_start(&execution_id, &string_inputs_to_values(inputs));
        }
        self.emitter
            .emit(ExecutionEvent::Started {
                execution_id: execution_id.clone(),
            })
            .await;

        let result = self
            .drive(&execution_id, inputs, cancel, &mut steps, &mut iterations)
            .await;

        if let Err(error) = &result {
            tracing::warn!(
                execution_id = %execution_id,
                iteration = iterations,
                steps = steps.len(),
                error = %error,
                "Agent execution failed"
            );
            if let Some(journal) = &self.journal {
                journal.log_error(iterations, &error.to_string());
            }
        }

        RunOutcome {
            result,
            steps,
            iterations,
        }
    }

    async fn drive(
        &self,
        execution_id: &str,
        inputs: &HashMap<String, String>,
        cancel: &CancellationToken,
        steps: &mut Vec<AgentStep>,
        iterations: &mut usize,
    ) -> Result<AgentFinish> {
        let mut detector = self.config.loop_detection.clone().map(LoopDetector::new);

        for iteration in 1..=self.config.max_iterations {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            *iterations = iteration;

            tracing::debug!(execution_id, iteration, steps = steps.len(), "Planning");
            if let Some(journal) = &self.journal {
                journal.log_iteration_begin(iteration);
            }
            self.emitter
                .emit(ExecutionEvent::IterationBegin { iteration })
                .await;

            let planned = tokio::select! {
                _ = cancel.cancelled() => Err(AgentError::Cancelled),
                plan = self.agent.plan(&steps[..], inputs, cancel) => plan,
            };

            let plan = match planned {
                Ok(plan) => plan,
                Err(error) => match (&self.parser_error_handler, error.kind()) {
                    (Some(handler), ErrorKind::Parse) => {
                        let message = error.to_string();
                        let observation = handler.format(&message);
                        tracing::info!(
                            execution_id,
                            iteration,
                            error = %message,
                            "Recovering from unparseable model output"
                        );
                        if let Some(journal) = &self.journal {
                            journal.log_parse_error(iteration, &message, &observation);
                        }
                        self.emitter
                            .emit(ExecutionEvent::ParseErrorRecovered {
                                iteration,
                                error: message,
                                observation: observation.clone(),
                            })
                            .await;
                        steps.push(AgentStep::new(AgentAction::default(), observation, iteration));
                        continue;
                    }
                    (_, ErrorKind::Cancelled) => return Err(AgentError::Cancelled),
                    _ => {
                        return Err(AgentError::Plan {
                            iteration,
                            source: Box::new(error),
                        });
                    }
                },
            };

            let actions = match plan {
                Plan::Finish(finish) => {
                    tracing::info!(
                        execution_id,
                        iteration,
                        steps = steps.len(),
                        "Agent finished"
                    );
                    if let Some(journal) = &self.journal {
                        journal.log_finish(iteration, &finish.return_values);
                    }
                    self.emitter
                        .emit(ExecutionEvent::Finished {
                            iteration,
                            return_values: finish.return_values.clone(),
                        })
                        .await;
                    return Ok(finish);
                }
                Plan::Actions(actions) if actions.is_empty() => return Err(AgentError::NoReturn),
                Plan::Actions(actions) => actions,
            };

            for action in actions {
                self.act(iteration, action, detector.as_mut(), steps, cancel)
                    .await?;
            }
        }

        let hint = match steps.iter().rev().find(|step| !step.action.is_empty()) {
            Some(step) => format!(
                "the agent never generated a final answer; last action was '{}'",
                step.action.tool
            ),
            None => "the agent never generated a final answer".to_string(),
        };
        tracing::warn!(
            execution_id,
            max_iterations = self.config.max_iterations,
            "Iteration ceiling reached"
        );
        Err(AgentError::NotFinished {
            iterations: self.config.max_iterations,
            hint,
        })
    }

    async fn act(
        &self,
        iteration: usize,
        action: AgentAction,
        detector: Option<&mut LoopDetector>,
        steps: &mut Vec<AgentStep>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if let Some(journal) = &self.journal {
            journal.log_action(iteration, &action);
        }
        self.emitter
            .emit(ExecutionEvent::ActionPlanned {
                iteration,
                action: action.clone(),
            })
            .await;

        let input = tool_input(&action, self.config.trim_observation_suffix).to_string();

        if let Some(detector) = detector {
            detector.record(&action.tool, &input);
            if let Some(info) = detector.detect() {
                tracing::warn!(
                    tool = %info.repeated_tool,
                    repeat_count = info.repeat_count,
                    iteration,
                    "Agent is repeating the same action"
                );
                return Err(AgentError::LoopDetected {
                    tool: info.repeated_tool,
                    repeat_count: info.repeat_count,
                    iteration,
                });
            }
        }

        self.emitter
            .emit(ExecutionEvent::ToolStart {
                iteration,
                tool: action.tool.clone(),
                input,
            })
            .await;

        let dispatched = dispatch(
            &self.registry,
            &action,
            iteration,
            self.config.tool_timeout,
            self.config.trim_observation_suffix,
            cancel,
        )
        .await;

        let observation = match dispatched {
            Ok(Dispatch::Completed(observation)) => observation,
            Ok(unknown @ Dispatch::UnknownTool(_)) => unknown.into_observation(),
            Err(error) => {
                self.emitter
                    .emit(ExecutionEvent::ToolError {
                        iteration,
                        tool: action.tool.clone(),
                        error: error.to_string(),
                    })
                    .await;
                return Err(error);
            }
        };

        if let Some(journal) = &self.journal {
            journal.log_observation(iteration, &action.tool, &observation);
        }
        self.emitter
            .emit(ExecutionEvent::ToolEnd {
                iteration,
                tool: action.tool.clone(),
                observation: observation.clone(),
            })
            .await;

        steps.push(AgentStep::new(action, observation, iteration));
        Ok(())
    }
}

fn string_inputs(inputs: &Values) -> Result<HashMap<String, String>> {
    inputs
        .iter()
        .map(|(key, value)| match value {
            Value::String(text) => Ok((key.clone(), text.clone())),
            other => Err(AgentError::InputValidation(format!(
                "input '{key}' must be a string, got {other}"
            ))),
        })
        .collect()
}

#[async_trait]
impl Chain for Executor {
    async fn call(
        &self,
        inputs: Values,
        _options: &CallOptions,
        cancel: &CancellationToken,
    ) -> Result<Values> {
        let inputs = string_inputs(&inputs)?;
        let outcome = self.run_with_steps(&inputs, cancel).await;
        let mut outputs = outcome.result?.return_values;

        if self.config.return_intermediate_steps {
            outputs.insert(
                INTERMEDIATE_STEPS_KEY.to_string(),
                serde_json::to_value(&outcome.steps)?,
            );
        }
        Ok(outputs)
    }

    fn input_keys(&self) -> Vec<String> {
        self.agent.input_keys()
    }

    fn output_keys(&self) -> Vec<String> {
        let mut keys = self.agent.output_keys();
        if self.config.return_intermediate_steps {
            keys.push(INTERMEDIATE_STEPS_KEY.to_string());
        }
        keys
    }

    fn memory(&self) -> Option<Arc<dyn Memory>> {
        self.memory.clone()
    }
}
