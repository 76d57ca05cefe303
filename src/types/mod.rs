//! Core types for the research orchestration engine.
//!
//! Everything that crosses a stage boundary lives here: conversation turns,
//! the clarification decision, the research brief, sub-topic assignments,
//! tool-call records, findings, and the run state that ties them together.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============= Conversation Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

/// A single conversation turn. Turn sequences are append-only; the session
/// store owns them for the lifetime of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Tool, content)
    }
}

/// Render a turn sequence as a flat text buffer for prompt embedding.
pub fn render_conversation(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

// ============= Scoping Types =============

/// Structured decision on whether the user request needs clarification
/// before research can begin. Produced once per scoping attempt and
/// discarded after brief compilation succeeds.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClarificationDecision {
    /// Whether a clarifying question must be asked before research starts.
    pub need_clarification: bool,
    /// The question to ask the user to clarify the report scope.
    pub question: String,
    /// Confirmation message that research will start once the scope is clear.
    pub verification: String,
}

/// Normalized, self-contained statement of what is to be researched.
///
/// Invariant: non-empty and interpretable without the originating
/// conversation (no pronoun references back to prior turns). Enforced by
/// prompt contract; the scoping stage always passes the full conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchBrief {
    pub objective: String,
    pub created_at: DateTime<Utc>,
}

impl ResearchBrief {
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            created_at: Utc::now(),
        }
    }
}

// ============= Research Types =============

/// One independently researchable slice of the brief, owned by the
/// supervisor. Exactly one research loop instance runs per assignment;
/// `topic_id` is unique within a run and correlates the eventual finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTopicAssignment {
    pub topic_id: String,
    pub objective: String,
    pub assigned_at: DateTime<Utc>,
}

impl SubTopicAssignment {
    pub fn new(topic_id: impl Into<String>, objective: impl Into<String>) -> Self {
        Self {
            topic_id: topic_id.into(),
            objective: objective.into(),
            assigned_at: Utc::now(),
        }
    }
}

/// One executed tool invocation inside a research loop. Records are
/// append-only; `sequence_index` follows the loop's decision order, not
/// wall-clock completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub arguments: Value,
    pub observation: String,
    pub sequence_index: usize,
}

/// Terminal status of a research loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingStatus {
    /// The loop decided it had gathered enough and stopped on its own.
    Complete,
    /// The iteration ceiling cut the loop short; the summary may be partial.
    Truncated,
    /// The loop's reasoning budget was exhausted; summary carries the error.
    Failed,
}

/// Compressed output of one research loop for one sub-topic. Produced
/// exactly once, immutable afterwards, consumed read-only by synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchFinding {
    pub topic_id: String,
    pub summary_text: String,
    pub source_count: usize,
    pub status: FindingStatus,
    pub raw_records: Vec<ToolCallRecord>,
}

impl ResearchFinding {
    pub fn is_failed(&self) -> bool {
        self.status == FindingStatus::Failed
    }
}

// ============= Run State =============

/// Top-level state of one research run, owned by the orchestrator and
/// mutated only by the stage currently active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub brief: ResearchBrief,
    /// Assignments in the order the supervisor issued them. Synthesis
    /// iterates this list, never the findings map, so report input order is
    /// reproducible across runs.
    pub assignments: Vec<SubTopicAssignment>,
    pub findings: std::collections::HashMap<String, ResearchFinding>,
    pub final_report: Option<String>,
}

impl RunState {
    pub fn new(brief: ResearchBrief) -> Self {
        Self {
            brief,
            assignments: Vec::new(),
            findings: std::collections::HashMap::new(),
            final_report: None,
        }
    }
}

// ============= Tool Types =============

/// Catalog entry shown to the model for one callable tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum DelverError {
    /// Structured output failed schema validation after the retry budget.
    #[error("Structured decoding failed: {0}")]
    Decode(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Tool error: {0}")]
    Tool(String),

    /// A single external call exceeded its timeout. Retryable at the call
    /// site; only budget exhaustion escalates.
    #[error("Call timed out after {0}s")]
    Timeout(u64),

    /// The user never supplied enough information within the configured
    /// number of clarification rounds.
    #[error("Could not establish research scope after {0} clarification rounds")]
    ScopeExhausted(u8),

    #[error("All {0} sub-topics failed; no findings to synthesize")]
    AllSubTopicsFailed(usize),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DelverError>;
