//! OpenAI-compatible chat-completions client.
//!
//! Speaks the `/chat/completions` wire format over [`reqwest`], which covers
//! OpenAI, OpenRouter, vLLM, and Ollama's compatibility endpoint with one
//! implementation.

use crate::llm::client::{LLMClient, LLMResponse};
use crate::types::{DelverError, Message, Result, ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Backstop for a single HTTP round trip. Callers apply their own tighter
/// per-call timeouts; this only catches a connection that never concludes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Chat-completions client for any OpenAI-compatible endpoint.
pub struct OpenAIClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAIClient {
    pub fn new(api_base: String, api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    async fn chat(&self, body: Value) -> Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DelverError::Llm(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DelverError::Llm(format!(
                "API returned {}: {}",
                status, text
            )));
        }

        response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| DelverError::Llm(format!("Malformed completion response: {}", e)))
    }

    fn first_choice(response: ChatCompletionResponse) -> Result<ChatChoice> {
        response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DelverError::Llm("Completion contained no choices".to_string()))
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });

        let choice = Self::first_choice(self.chat(body).await?)?;
        Ok(choice.message.content.unwrap_or_default())
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt},
            ],
        });

        let choice = Self::first_choice(self.chat(body).await?)?;
        Ok(choice.message.content.unwrap_or_default())
    }

    async fn generate_with_tools(
        &self,
        system: &str,
        history: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let mut messages = vec![json!({"role": "system", "content": system})];
        for message in history {
            messages.push(json!({
                "role": message.role.as_str(),
                "content": message.content,
            }));
        }

        let wire_tools: Vec<Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    },
                })
            })
            .collect();

        let body = json!({
            "model": self.model,
            "messages": messages,
            "tools": wire_tools,
            "tool_choice": "auto",
        });

        let choice = Self::first_choice(self.chat(body).await?)?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                // Arguments arrive as a JSON-encoded string on the wire.
                let arguments = serde_json::from_str(&call.function.arguments)
                    .unwrap_or(Value::String(call.function.arguments));
                ToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments,
                }
            })
            .collect();

        Ok(LLMResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============= Wire Types =============

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}
