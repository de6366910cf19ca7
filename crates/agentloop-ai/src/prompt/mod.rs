//! Prompt templates with `{{name}}` placeholders.

mod defaults;

pub use defaults::{
    CONVERSATIONAL_FORMAT_INSTRUCTIONS, CONVERSATIONAL_PREFIX, CONVERSATIONAL_SUFFIX,
    MRKL_FORMAT_INSTRUCTIONS, MRKL_PREFIX, MRKL_SUFFIX, PromptParts, conversational_prompt,
    mrkl_prompt, tool_descriptions, tool_names,
};

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use agentloop_traits::Values;

use crate::error::{AgentError, Result};

// {{name}} with optional inner whitespace; names are identifiers so JSON braces are left alone.
static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("Invalid regex")
});

/// String template rendered fresh on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    template: String,
    partial_variables: HashMap<String, String>,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            partial_variables: HashMap::new(),
        }
    }

    /// Pre-fill a variable. Values passed to [`format`](Self::format) take precedence.
    pub fn with_partial(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.partial_variables.insert(name.into(), value.into());
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Every placeholder name, in order of first appearance.
    pub fn variables(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for cap in PLACEHOLDER_REGEX.captures_iter(&self.template) {
            let name = &cap[1];
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    /// Placeholders the caller must supply (those without a partial value).
    pub fn input_variables(&self) -> Vec<String> {
        self.variables()
            .into_iter()
            .filter(|name| !self.partial_variables.contains_key(name))
            .collect()
    }

    pub fn format(&self, values: &Values) -> Result<String> {
        let missing: Vec<String> = self
            .input_variables()
            .into_iter()
            .filter(|name| !values.contains_key(name))
            .collect();
        if !missing.is_empty() {
            return Err(AgentError::Prompt(format!(
                "missing template variables: {}",
                missing.join(", ")
            )));
        }

        let rendered = PLACEHOLDER_REGEX.replace_all(&self.template, |cap: &regex::Captures<'_>| {
            let name = &cap[1];
            match values.get(name) {
                Some(value) => value_to_prompt_text(value),
                None => self.partial_variables.get(name).cloned().unwrap_or_default(),
            }
        });
        Ok(rendered.into_owned())
    }
}

/// Strings are inserted raw; everything else as compact JSON.
pub fn value_to_prompt_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
