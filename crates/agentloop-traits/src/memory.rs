//! Memory contract consumed by the chain helpers.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::MemoryResult;

/// Named values flowing in and out of chains.
pub type Values = HashMap<String, Value>;

/// Key-value store of prior turns, loaded before and saved after each chain call.
#[async_trait]
pub trait Memory: Send + Sync {
    /// Keys this memory adds to the chain inputs on load.
    fn memory_variables(&self) -> Vec<String>;

    /// Load memory values for the given inputs.
    async fn load_variables(&self, inputs: &Values) -> MemoryResult<Values>;

    /// Persist one turn.
    async fn save_context(&self, inputs: &Values, outputs: &Values) -> MemoryResult<()>;

    /// Forget everything.
    async fn clear(&self) -> MemoryResult<()>;
}
