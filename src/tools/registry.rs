//! Tool trait, tool sources, and the merged registry.
//!
//! The registry is the single tool port the research loop sees. Tools come
//! from heterogeneous sources — locally defined structs and externally
//! registered tool sets — and are merged into one ordered catalog before
//! being shown to the model.

use crate::types::{DelverError, Result, ToolDefinition};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A single callable capability. Execution returns observation text; errors
/// are the caller's to fold back into the reasoning loop as data.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, args: Value) -> Result<String>;
}

/// A source of tools. Local modules and remote registrations both implement
/// this, so the registry can merge them without caring where a tool runs.
pub trait ToolSet: Send + Sync {
    fn tools(&self) -> Vec<Arc<dyn Tool>>;
}

/// Ordered, name-indexed catalog of every registered tool.
pub struct ToolRegistry {
    ordered: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            ordered: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Registry with the built-in research tools (web search + think).
    pub fn with_default_tools(search: super::search::TavilySearchTool) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(search));
        registry.register(Arc::new(super::think::ThinkTool));
        registry
    }

    /// Register a single tool. A tool re-registered under an existing name
    /// replaces the earlier one in place, keeping catalog order stable.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.by_name.get(&name) {
            Some(&idx) => self.ordered[idx] = tool,
            None => {
                self.by_name.insert(name, self.ordered.len());
                self.ordered.push(tool);
            }
        }
    }

    /// Merge every tool from a source, in the source's own order.
    pub fn add_set(&mut self, set: &dyn ToolSet) {
        for tool in set.tools() {
            self.register(tool);
        }
    }

    /// The uniform catalog presented to the model, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.ordered
            .iter()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<String> {
        match self.by_name.get(name) {
            Some(&idx) => self.ordered[idx].execute(args).await,
            None => Err(DelverError::Tool(format!("Unknown tool: {}", name))),
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.ordered.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool(&'static str);

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }
        async fn execute(&self, args: Value) -> Result<String> {
            Ok(args["text"].as_str().unwrap_or_default().to_string())
        }
    }

    struct PairSet;

    impl ToolSet for PairSet {
        fn tools(&self) -> Vec<Arc<dyn Tool>> {
            vec![Arc::new(EchoTool("alpha")), Arc::new(EchoTool("beta"))]
        }
    }

    #[test]
    fn empty_registry() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.definitions().is_empty());
    }

    #[test]
    fn catalog_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool("zeta")));
        registry.add_set(&PairSet);
        assert_eq!(registry.tool_names(), vec!["zeta", "alpha", "beta"]);
    }

    #[test]
    fn reregistration_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry.add_set(&PairSet);
        registry.register(Arc::new(EchoTool("alpha")));
        assert_eq!(registry.tool_names(), vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn executes_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool("echo")));
        let out = registry
            .execute("echo", json!({"text": "hello"}))
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let registry = ToolRegistry::new();
        let result = registry.execute("missing", json!({})).await;
        assert!(matches!(result, Err(DelverError::Tool(_))));
    }
}
