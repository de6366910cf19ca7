use std::time::Duration;

use tokio_util::sync::CancellationToken;

use agentloop_traits::ToolError;

use crate::agent::AgentAction;
use crate::agent::react::strip_observation;
use crate::error::{AgentError, Result};
use crate::tools::ToolRegistry;

/// What dispatching one action produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// The tool ran; its output is the observation.
    Completed(String),
    /// No such tool; the observation tells the model so.
    UnknownTool(String),
}

impl Dispatch {
    pub(crate) fn into_observation(self) -> String {
        match self {
            Self::Completed(observation) | Self::UnknownTool(observation) => observation,
        }
    }
}

pub(crate) fn unknown_tool_observation(tool: &str) -> String {
    format!("{tool} is not a valid tool, try another one")
}

/// Input actually handed to the tool.
pub(crate) fn tool_input(action: &AgentAction, trim_observation_suffix: bool) -> &str {
    if trim_observation_suffix {
        strip_observation(&action.tool_input)
    } else {
        &action.tool_input
    }
}

/// Run one action against the registry.
///
/// A missing tool is recoverable; a failing, timed-out or cancelled tool is not.
pub(crate) async fn dispatch(
    registry: &ToolRegistry,
    action: &AgentAction,
    iteration: usize,
    tool_timeout: Option<Duration>,
    trim_observation_suffix: bool,
    cancel: &CancellationToken,
) -> Result<Dispatch> {
    let Some(tool) = registry.get(&action.tool) else {
        tracing::warn!(
            tool = %action.tool,
            iteration,
            available = ?registry.list(),
            "Agent requested unknown tool"
        );
        return Ok(Dispatch::UnknownTool(unknown_tool_observation(&action.tool)));
    };

    let input = tool_input(action, trim_observation_suffix);
    tracing::debug!(tool = %tool.name(), iteration, "Executing tool");

    let call = tool.call(input, cancel);
    let outcome = match tool_timeout {
        Some(timeout) => {
            tokio::select! {
                _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                result = tokio::time::timeout(timeout, call) => match result {
                    Ok(result) => result,
                    Err(_) => Err(ToolError::execution(format!(
                        "timed out after {}ms",
                        timeout.as_millis()
                    ))),
                },
            }
        }
        None => {
            tokio::select! {
                _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                result = call => result,
            }
        }
    };

    match outcome {
        Ok(observation) => Ok(Dispatch::Completed(observation)),
        Err(ToolError::Cancelled) => Err(AgentError::Cancelled),
        Err(source) => {
            tracing::warn!(
                tool = %action.tool,
                iteration,
                error = %source,
                "Tool execution failed"
            );
            Err(AgentError::ToolExecution {
                tool: action.tool.clone(),
                input: input.to_string(),
                iteration,
                source,
            })
        }
    }
}
