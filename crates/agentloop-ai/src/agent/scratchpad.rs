//! Scratchpad rendering of prior steps.
//!
//! Steps are the only state carried between Plan calls; each agent renders
//! them fresh into the form its model expects.

use std::collections::HashSet;

use serde_json::{Value, json};

use agentloop_traits::{ChatMessage, Role, SINGLE_ARGUMENT, ToolCall};

use super::AgentStep;
use super::react::OBSERVATION_MARKER;

/// One-shot ReAct scratchpad: `"\n" + log + "\nObservation: " + observation + "\n"` per step.
pub fn mrkl_scratchpad(steps: &[AgentStep]) -> String {
    let mut scratchpad = String::new();
    for step in steps {
        scratchpad.push('\n');
        scratchpad.push_str(&step.action.log);
        scratchpad.push_str(&format!("\n{OBSERVATION_MARKER} {}\n", step.observation));
    }
    scratchpad
}

/// Conversational scratchpad, ending with a `Thought:` cue when non-empty.
pub fn conversational_scratchpad(steps: &[AgentStep]) -> String {
    if steps.is_empty() {
        return String::new();
    }
    let mut scratchpad = String::new();
    for step in steps {
        scratchpad.push_str(&step.action.log);
        scratchpad.push_str(&format!("\n{OBSERVATION_MARKER} {}", step.observation));
    }
    scratchpad.push_str("\nThought:");
    scratchpad
}

/// Function-calling scratchpad as chat messages.
///
/// Steps from the same iteration form one exchange: an assistant message
/// carrying that exchange's tool calls, followed by one tool result per call.
/// Steps without a call id (parse-error recoveries) become user messages.
pub fn function_messages(steps: &[AgentStep]) -> Vec<ChatMessage> {
    let mut messages = Vec::new();
    let mut index = 0;

    while index < steps.len() {
        let iteration = steps[index].iteration;
        let end = steps[index..]
            .iter()
            .position(|step| step.iteration != iteration)
            .map_or(steps.len(), |offset| index + offset);
        let exchange = &steps[index..end];
        index = end;

        let mut seen = HashSet::new();
        let calls: Vec<(&AgentStep, ToolCall)> = exchange
            .iter()
            .filter_map(|step| {
                let id = step.action.tool_call_id.as_ref()?;
                if !seen.insert(id.clone()) {
                    return None;
                }
                Some((
                    step,
                    ToolCall {
                        id: id.clone(),
                        name: step.action.tool.clone(),
                        arguments: step
                            .action
                            .tool_input_original_arguments
                            .clone()
                            .unwrap_or_else(|| original_arguments(&step.action.tool_input)),
                    },
                ))
            })
            .collect();

        if !calls.is_empty() {
            messages.push(ChatMessage::assistant_with_tool_calls(
                "",
                calls.iter().map(|(_, call)| call.clone()).collect(),
            ));
            for (step, call) in &calls {
                messages.push(ChatMessage::tool_result(&call.id, &step.observation));
            }
        }

        for step in exchange.iter().filter(|s| s.action.tool_call_id.is_none()) {
            messages.push(ChatMessage::user(format!(
                "{OBSERVATION_MARKER} {}",
                step.observation
            )));
        }
    }

    sanitize_tool_call_history(messages)
}

/// Rebuild argument JSON for an action that did not keep the model's own.
///
/// Object inputs were passed through verbatim; anything else was unwrapped
/// from the single-string argument.
pub fn original_arguments(tool_input: &str) -> String {
    match serde_json::from_str::<Value>(tool_input) {
        Ok(value @ Value::Object(_)) => value.to_string(),
        _ => json!({ SINGLE_ARGUMENT: tool_input }).to_string(),
    }
}

/// Drop tool results whose id no preceding assistant message requested, and
/// tool calls that never received a result.
pub fn sanitize_tool_call_history(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let answered: HashSet<String> = messages
        .iter()
        .filter(|msg| msg.role == Role::Tool)
        .filter_map(|msg| msg.tool_call_id.clone())
        .collect();

    let mut requested: HashSet<String> = HashSet::new();
    let mut sanitized = Vec::with_capacity(messages.len());

    for mut msg in messages {
        match msg.role {
            Role::Assistant => {
                if let Some(calls) = msg.tool_calls.take() {
                    let kept: Vec<ToolCall> = calls
                        .into_iter()
                        .filter(|call| answered.contains(&call.id))
                        .collect();
                    if kept.is_empty() && msg.content.is_empty() {
                        continue;
                    }
                    requested.extend(kept.iter().map(|call| call.id.clone()));
                    msg.tool_calls = (!kept.is_empty()).then_some(kept);
                }
                sanitized.push(msg);
            }
            Role::Tool => {
                let known = msg
                    .tool_call_id
                    .as_ref()
                    .is_some_and(|id| requested.remove(id));
                if known {
                    sanitized.push(msg);
                }
            }
            _ => sanitized.push(msg),
        }
    }
    sanitized
}
