//! Tool registry keyed by case-insensitive tool name

use std::collections::HashMap;
use std::sync::Arc;

use agentloop_traits::{Tool, ToolSchema};

use crate::error::{AgentError, Result};

/// Read-only name -> tool lookup built once per executor.
///
/// Names are matched case-insensitively. Registration order is kept for
/// prompt rendering and schema listing.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.list())
            .finish()
    }
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a slice of tools.
    ///
    /// Two tools whose names differ only by case are rejected with
    /// [`AgentError::DuplicateTool`].
    pub fn from_tools(tools: &[Arc<dyn Tool>]) -> Result<Self> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register_arc(Arc::clone(tool))?;
        }
        Ok(registry)
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a tool from Arc
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let key = normalize(tool.name());
        if self.by_name.contains_key(&key) {
            return Err(AgentError::DuplicateTool(tool.name().to_string()));
        }
        self.by_name.insert(key, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name, ignoring case
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.by_name
            .get(&normalize(name))
            .and_then(|&index| self.tools.get(index))
            .cloned()
    }

    /// Check if tool exists
    pub fn has(&self, name: &str) -> bool {
        self.by_name.contains_key(&normalize(name))
    }

    /// List all tool names in registration order
    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get schemas for all registered tools
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema()).collect()
    }
}

fn normalize(name: &str) -> String {
    name.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_traits::{CancellationToken, ToolResult};
    use async_trait::async_trait;

    struct NamedTool(&'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test tool"
        }

        async fn call(&self, input: &str, _cancel: &CancellationToken) -> ToolResult<String> {
            Ok(format!("{}:{input}", self.0))
        }
    }

    #[test]
    fn test_tool_registry_case_insensitive_lookup() {
        let tools: Vec<Arc<dyn Tool>> =
            vec![Arc::new(NamedTool("Search")), Arc::new(NamedTool("calculator"))];
        let registry = ToolRegistry::from_tools(&tools).unwrap();

        assert!(registry.has("search"));
        assert!(registry.has("SEARCH"));
        assert!(registry.has("Calculator"));
        assert!(!registry.has("unknown"));
        assert_eq!(registry.get("sEaRcH").unwrap().name(), "Search");
        assert_eq!(registry.list(), vec!["Search", "calculator"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let tools: Vec<Arc<dyn Tool>> =
            vec![Arc::new(NamedTool("search")), Arc::new(NamedTool("SEARCH"))];
        let err = ToolRegistry::from_tools(&tools).unwrap_err();
        assert!(matches!(err, AgentError::DuplicateTool(ref name) if name == "SEARCH"));
    }

    #[test]
    fn test_tool_schemas() {
        let mut registry = ToolRegistry::new();
        registry.register(NamedTool("lookup")).unwrap();

        let schemas = registry.schemas();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].name, "lookup");
    }

    #[tokio::test]
    async fn test_registry_is_shareable_across_tasks() {
        let mut registry = ToolRegistry::new();
        registry.register(NamedTool("echo")).unwrap();
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    let tool = registry.get("ECHO").unwrap();
                    tool.call(&i.to_string(), &CancellationToken::new()).await
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap().unwrap(), format!("echo:{i}"));
        }
    }
}
