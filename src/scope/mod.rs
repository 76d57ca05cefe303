//! Scoping stage: clarify-vs-proceed, then brief compilation.
//!
//! The stage itself is stateless — it takes the full conversation every
//! time. On "needs clarification" it returns a suspension signal; the
//! orchestrator appends the question as an assistant turn and re-invokes
//! scoping with the extended conversation on the next user turn. The round
//! cap lives in the orchestrator for the same reason.

use crate::llm::{generate_structured, LLMClient};
use crate::prompts;
use crate::types::{
    render_conversation, ClarificationDecision, DelverError, Message, MessageRole, ResearchBrief,
    Result,
};
use crate::utils::today_str;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Outcome of one scoping attempt. A brief is never produced alongside a
/// pending question.
#[derive(Debug, Clone)]
pub enum ScopeOutcome {
    /// Research cannot start yet; ask the user this question and resume.
    Clarify { question: String },
    /// Research may proceed with this brief.
    Proceed {
        brief: ResearchBrief,
        /// Confirmation message to show the user before research starts.
        verification: String,
    },
}

/// Structured target for brief compilation.
#[derive(Debug, Deserialize, JsonSchema)]
struct CompiledBrief {
    /// Self-contained research objective that will guide all research.
    research_brief: String,
}

/// Stateless scoping stage over a conversation snapshot.
pub struct ScopingStage {
    llm: Arc<dyn LLMClient>,
    retries: usize,
    call_timeout: Duration,
}

impl ScopingStage {
    pub fn new(llm: Arc<dyn LLMClient>, retries: usize, call_timeout: Duration) -> Self {
        Self {
            llm,
            retries,
            call_timeout,
        }
    }

    /// Decide clarify-vs-proceed for the conversation so far and, when
    /// proceeding, compile the research brief from the full conversation.
    pub async fn scope(&self, conversation: &[Message]) -> Result<ScopeOutcome> {
        if !conversation.iter().any(|m| m.role == MessageRole::User) {
            return Err(DelverError::InvalidInput(
                "Conversation has no user turn to scope".to_string(),
            ));
        }

        let buffer = render_conversation(conversation);
        let date = today_str();

        let decision: ClarificationDecision = generate_structured(
            self.llm.as_ref(),
            &prompts::clarification_prompt(&buffer, &date),
            self.retries,
            self.call_timeout,
        )
        .await?;

        if decision.need_clarification {
            info!(question = %decision.question, "scoping suspended for clarification");
            return Ok(ScopeOutcome::Clarify {
                question: decision.question,
            });
        }

        // The full conversation goes into brief compilation as well: the
        // brief must be interpretable without it afterwards.
        let compiled: CompiledBrief = generate_structured(
            self.llm.as_ref(),
            &prompts::brief_prompt(&buffer, &date),
            self.retries,
            self.call_timeout,
        )
        .await?;

        if compiled.research_brief.trim().is_empty() {
            return Err(DelverError::Decode(
                "Compiled brief is empty".to_string(),
            ));
        }

        info!("research brief compiled");
        Ok(ScopeOutcome::Proceed {
            brief: ResearchBrief::new(compiled.research_brief),
            verification: decision.verification,
        })
    }
}
