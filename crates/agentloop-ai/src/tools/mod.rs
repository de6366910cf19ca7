//! Tools module - registry and re-exported tool contract
//!
//! Tool implementations are supplied by the caller. The executor looks them
//! up through a [`ToolRegistry`] built once from the agent's tool list.

mod registry;

pub use agentloop_traits::{SINGLE_ARGUMENT, Tool, ToolError, ToolResult, ToolSchema};
pub use registry::ToolRegistry;
