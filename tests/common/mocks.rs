//! Shared port stubs for integration tests.
//!
//! Two LLM stub flavors cover the two test shapes:
//! - [`ScriptedLLM`] replays a fixed queue of replies and records every
//!   prompt it saw. Right for sequential scripts (scoping, retry budgets,
//!   synthesis determinism).
//! - [`BehaviorLLM`] computes replies from the call's own inputs via
//!   closures, so it stays deterministic per research loop even when many
//!   loops interleave concurrently.

use async_trait::async_trait;
use delver::llm::{LLMClient, LLMResponse};
use delver::tools::Tool;
use delver::types::{DelverError, Message, Result, ToolCall, ToolDefinition};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============= Scripted LLM =============

#[derive(Default)]
pub struct ScriptedLLM {
    text_replies: Mutex<VecDeque<Result<String>>>,
    tool_replies: Mutex<VecDeque<Result<LLMResponse>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLLM {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&self, reply: impl Into<String>) {
        self.text_replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn push_text_error(&self, message: impl Into<String>) {
        self.text_replies
            .lock()
            .unwrap()
            .push_back(Err(DelverError::Llm(message.into())));
    }

    pub fn push_tool_response(&self, response: LLMResponse) {
        self.tool_replies.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_tool_error(&self, message: impl Into<String>) {
        self.tool_replies
            .lock()
            .unwrap()
            .push_back(Err(DelverError::Llm(message.into())));
    }

    /// Every prompt the stub received, in call order.
    pub fn seen_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn pop_text(&self) -> Result<String> {
        self.text_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DelverError::Llm("script exhausted".to_string())))
    }
}

#[async_trait]
impl LLMClient for ScriptedLLM {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.pop_text()
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push(format!("{}\n{}", system, prompt));
        self.pop_text()
    }

    async fn generate_with_tools(
        &self,
        _system: &str,
        history: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        self.prompts.lock().unwrap().push(
            history
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
        );
        self.tool_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DelverError::Llm("tool script exhausted".to_string())))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

// ============= Behavioral LLM =============

type TextFn = dyn Fn(&str) -> Result<String> + Send + Sync;
type ToolsFn = dyn Fn(&[Message], &[ToolDefinition]) -> Result<LLMResponse> + Send + Sync;

pub struct BehaviorLLM {
    on_text: Box<TextFn>,
    on_tools: Box<ToolsFn>,
}

impl BehaviorLLM {
    pub fn new(
        on_text: impl Fn(&str) -> Result<String> + Send + Sync + 'static,
        on_tools: impl Fn(&[Message], &[ToolDefinition]) -> Result<LLMResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_text: Box::new(on_text),
            on_tools: Box::new(on_tools),
        }
    }

    /// A loop behavior that searches once and then stops, with a fixed
    /// compression/summary reply for every text call.
    pub fn search_once_then_stop(summary: &'static str) -> Self {
        Self::new(
            move |_| Ok(summary.to_string()),
            |history, _| {
                let searched = history
                    .iter()
                    .any(|m| m.content.starts_with("[web_search]"));
                if searched {
                    Ok(LLMResponse::text("enough gathered"))
                } else {
                    Ok(tool_call_response("web_search", json!({"query": "q"})))
                }
            },
        )
    }
}

#[async_trait]
impl LLMClient for BehaviorLLM {
    async fn generate(&self, prompt: &str) -> Result<String> {
        (self.on_text)(prompt)
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        (self.on_text)(prompt)
    }

    async fn generate_with_tools(
        &self,
        _system: &str,
        history: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        (self.on_tools)(history, tools)
    }

    fn model_name(&self) -> &str {
        "behavior"
    }
}

/// One tool call requested with the given arguments.
pub fn tool_call_response(name: &str, arguments: Value) -> LLMResponse {
    LLMResponse {
        content: String::new(),
        tool_calls: vec![ToolCall {
            id: format!("call-{}", name),
            name: name.to_string(),
            arguments,
        }],
        finish_reason: "tool_calls".to_string(),
    }
}

/// Several tool calls requested in one THINK step.
pub fn multi_tool_call_response(calls: Vec<(&str, Value)>) -> LLMResponse {
    LLMResponse {
        content: String::new(),
        tool_calls: calls
            .into_iter()
            .enumerate()
            .map(|(i, (name, arguments))| ToolCall {
                id: format!("call-{}", i),
                name: name.to_string(),
                arguments,
            })
            .collect(),
        finish_reason: "tool_calls".to_string(),
    }
}

// ============= Tools =============

/// Search stub returning two canned documents in the real tool's format.
pub struct CannedSearchTool;

#[async_trait]
impl Tool for CannedSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }
    fn description(&self) -> &str {
        "canned web search"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"query": {"type": "string"}}})
    }
    async fn execute(&self, _args: Value) -> Result<String> {
        Ok("Search results:\n\
            \n--- Source 1: First document ---\nURL: https://one.example/doc\n\nAlpha details.\n\
            \n--- Source 2: Second document ---\nURL: https://two.example/doc\n\nBeta details.\n"
            .to_string())
    }
}

/// Tool that always fails, for error-folding tests.
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "flaky"
    }
    fn description(&self) -> &str {
        "always fails"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }
    async fn execute(&self, _args: Value) -> Result<String> {
        Err(DelverError::Tool("backend unavailable".to_string()))
    }
}

/// Concurrency gauge: tracks how many executions overlap.
#[derive(Default)]
pub struct GaugeState {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl GaugeState {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub struct GaugedTool {
    pub state: std::sync::Arc<GaugeState>,
    pub hold: Duration,
}

#[async_trait]
impl Tool for GaugedTool {
    fn name(&self) -> &str {
        "web_search"
    }
    fn description(&self) -> &str {
        "search stub that measures overlap"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"query": {"type": "string"}}})
    }
    async fn execute(&self, _args: Value) -> Result<String> {
        let now = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.hold).await;
        self.state.active.fetch_sub(1, Ordering::SeqCst);
        Ok("URL: https://gauge.example/doc\nmeasured".to_string())
    }
}
