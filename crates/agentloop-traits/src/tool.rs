//! Tool trait and schema types for agent tools.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::error::ToolResult;

/// Argument name used when a tool takes a single free-form string.
pub const SINGLE_ARGUMENT: &str = "__arg1";

/// JSON Schema description of a tool, as advertised to function-calling models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value, // JSON Schema object
}

/// A named capability the agent can invoke with a string input.
///
/// Tools are owned by the caller. The executor only holds shared references
/// and may call the same tool from several concurrent invocations, so
/// implementations must be safe to share.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as the model refers to it. Matched case-insensitively.
    fn name(&self) -> &str;

    /// Human-readable description placed in the prompt.
    fn description(&self) -> &str;

    /// JSON Schema for the function-calling form of this tool.
    ///
    /// Defaults to a single required string argument.
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                SINGLE_ARGUMENT: { "title": SINGLE_ARGUMENT, "type": "string" }
            },
            "required": [SINGLE_ARGUMENT]
        })
    }

    /// Run the tool. Implementations should return promptly once `cancel` fires.
    async fn call(&self, input: &str, cancel: &CancellationToken) -> ToolResult<String>;

    /// Build complete schema for the model
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}
