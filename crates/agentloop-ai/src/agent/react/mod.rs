//! ReAct (Reasoning + Acting) text-protocol agents.
//!
//! Both agents render prior steps into a text scratchpad, generate with a stop
//! sequence on the observation marker and hand the output to a parser.

mod conversational;
mod mrkl;
mod parser;

pub use conversational::ConversationalAgent;
pub use mrkl::OneShotAgent;
pub use parser::{
    CONVERSATIONAL_FINISH_MARKER, ConversationalParser, OBSERVATION_MARKER, OutputParser,
    ReActParser, parse_action, strip_observation,
};

use std::collections::HashMap;

use serde_json::Value;

use agentloop_traits::Values;

/// Stop sequences that keep the model from writing its own observation.
pub fn observation_stop_words() -> Vec<String> {
    vec![
        format!("\n{OBSERVATION_MARKER}"),
        format!("\n\t{OBSERVATION_MARKER}"),
    ]
}

pub(crate) fn string_inputs_to_values(inputs: &HashMap<String, String>) -> Values {
    inputs
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect()
}
