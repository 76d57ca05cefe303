//! LLM client abstraction — the reasoning port of the engine.
//!
//! Every stage talks to the model through [`LLMClient`]. The trait keeps the
//! text-generation capability opaque: a prompt goes in, free text or a tool
//! decision comes out. Providers are swappable without touching any stage.

use crate::types::{Message, Result, ToolCall, ToolDefinition};
use async_trait::async_trait;

/// Generic LLM client trait for provider abstraction.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a single user prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with an explicit system prompt.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Generate with tool calling support over a message history.
    ///
    /// Returns either free text, one or more requested tool invocations, or
    /// both. The caller decides what an empty `tool_calls` list means.
    async fn generate_with_tools(
        &self,
        system: &str,
        history: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse>;

    /// Model name or identifier, for logging.
    fn model_name(&self) -> &str;
}

/// Response from an LLM generation request.
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// The text content of the response.
    pub content: String,
    /// Any tool calls requested by the model, in the order it emitted them.
    pub tool_calls: Vec<ToolCall>,
    /// The reason generation stopped (e.g. "stop", "tool_calls", "length").
    pub finish_reason: String,
}

impl LLMResponse {
    /// Plain text response with no tool calls.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            finish_reason: "stop".to_string(),
        }
    }
}

/// Provider selection for runtime client construction.
#[derive(Debug, Clone)]
pub enum Provider {
    /// Any endpoint speaking the OpenAI chat-completions wire format
    /// (OpenAI itself, OpenRouter, vLLM, Ollama's compat endpoint, ...).
    OpenAICompatible {
        api_base: String,
        api_key: String,
        model: String,
    },
}

impl Provider {
    /// Create a client instance for this provider.
    pub fn create_client(&self) -> Box<dyn LLMClient> {
        match self {
            Provider::OpenAICompatible {
                api_base,
                api_key,
                model,
            } => Box::new(super::openai::OpenAIClient::new(
                api_base.clone(),
                api_key.clone(),
                model.clone(),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAICompatible { .. } => "openai-compatible",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_response_has_no_tool_calls() {
        let response = LLMResponse::text("done");
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.finish_reason, "stop");
    }

    #[test]
    fn provider_name() {
        let provider = Provider::OpenAICompatible {
            api_base: "http://localhost:11434/v1".to_string(),
            api_key: String::new(),
            model: "llama3.2".to_string(),
        };
        assert_eq!(provider.name(), "openai-compatible");
    }
}
