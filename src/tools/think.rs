//! Strategic reflection tool.
//!
//! Does no I/O: it records the model's own reflection and echoes a
//! confirmation. Having reflection as an explicit tool call creates a
//! deliberate pause in the research loop between searching and deciding
//! whether to continue, and leaves the reasoning visible in the tool-call
//! history that the compression step later reads.

use crate::tools::registry::Tool;
use crate::types::{DelverError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

/// The `think` tool: records a reflection, performs no I/O.
pub struct ThinkTool;

#[async_trait]
impl Tool for ThinkTool {
    fn name(&self) -> &str {
        "think"
    }

    fn description(&self) -> &str {
        "Reflect on research progress: what was found, what is missing, and whether to continue searching or stop"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "reflection": {
                    "type": "string",
                    "description": "Detailed reflection on findings so far, remaining gaps, and the next step"
                }
            },
            "required": ["reflection"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let reflection = args
            .get("reflection")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                DelverError::InvalidInput("Missing 'reflection' parameter".to_string())
            })?;
        Ok(format!("Reflection recorded: {}", reflection))
    }
}
