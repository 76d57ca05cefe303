//! Externally registered tool sets.
//!
//! Tools served by an external process (an MCP server, a remote tool
//! gateway) are registered here with their advertised definitions and an
//! async invoker. The registry then presents them to the model exactly like
//! locally defined tools; transport mechanics stay outside the engine.

use crate::tools::registry::{Tool, ToolSet};
use crate::types::{Result, ToolDefinition};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

/// Invoker bridging a named tool call to whatever transport serves it.
pub type ExternalInvoker =
    Arc<dyn Fn(String, Value) -> BoxFuture<'static, Result<String>> + Send + Sync>;

/// A set of tools advertised by one external source, all dispatched through
/// a shared invoker.
pub struct ExternalToolSet {
    definitions: Vec<ToolDefinition>,
    invoker: ExternalInvoker,
}

impl ExternalToolSet {
    pub fn new(definitions: Vec<ToolDefinition>, invoker: ExternalInvoker) -> Self {
        Self {
            definitions,
            invoker,
        }
    }
}

impl ToolSet for ExternalToolSet {
    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.definitions
            .iter()
            .map(|definition| {
                Arc::new(ExternalTool {
                    definition: definition.clone(),
                    invoker: Arc::clone(&self.invoker),
                }) as Arc<dyn Tool>
            })
            .collect()
    }
}

struct ExternalTool {
    definition: ToolDefinition,
    invoker: ExternalInvoker,
}

#[async_trait]
impl Tool for ExternalTool {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn description(&self) -> &str {
        &self.definition.description
    }

    fn parameters_schema(&self) -> Value {
        self.definition.parameters.clone()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        (self.invoker)(self.definition.name.clone(), args).await
    }
}
