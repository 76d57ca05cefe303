//! Single-topic research loop.
//!
//! A bounded THINK → ACT cycle: the model inspects the objective, its own
//! transcript, and the tool catalog, then either requests tool calls or
//! stops. On stop — explicit or via the iteration ceiling — the full
//! transcript is compressed into one [`ResearchFinding`]. Raw tool
//! histories are too large to pass forward; only the compressed summary
//! (plus the owned records) leaves the loop.
//!
//! Each loop instance owns its state exclusively. Nothing here is shared
//! with sibling loops, which keeps per-loop context bounded no matter how
//! many sub-topics a run fans out to.

use crate::llm::{LLMClient, LLMResponse};
use crate::prompts;
use crate::tools::ToolRegistry;
use crate::types::{
    DelverError, FindingStatus, Message, ResearchFinding, Result, ToolCallRecord, ToolDefinition,
};
use crate::utils::today_str;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One bounded THINK/ACT/STOP loop researching a single objective.
#[derive(Clone)]
pub struct ResearchLoop {
    llm: Arc<dyn LLMClient>,
    tools: Arc<ToolRegistry>,
    max_iterations: usize,
    llm_retries: usize,
    call_timeout: Duration,
}

impl ResearchLoop {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        tools: Arc<ToolRegistry>,
        max_iterations: usize,
        llm_retries: usize,
        call_timeout: Duration,
    ) -> Self {
        Self {
            llm,
            tools,
            max_iterations: max_iterations.max(1),
            llm_retries: llm_retries.max(1),
            call_timeout,
        }
    }

    /// Research one objective to completion. Always yields a finding unless
    /// the reasoning port itself fails beyond its retry budget; the caller
    /// treats that as a per-sub-topic failure.
    pub async fn research(&self, objective: &str) -> Result<ResearchFinding> {
        let catalog = self.tools.definitions();
        let system = prompts::researcher_system_prompt(&today_str());

        let mut transcript = vec![Message::user(objective)];
        let mut records: Vec<ToolCallRecord> = Vec::new();
        let mut status = FindingStatus::Truncated;

        for iteration in 1..=self.max_iterations {
            let response = self.think(&system, &transcript, &catalog).await?;

            if response.tool_calls.is_empty() {
                debug!(iteration, "loop signaled completion");
                if !response.content.is_empty() {
                    transcript.push(Message::assistant(response.content));
                }
                status = FindingStatus::Complete;
                break;
            }

            if !response.content.is_empty() {
                transcript.push(Message::assistant(response.content.clone()));
            }

            // Dispatch every requested call concurrently, but append records
            // and transcript entries in request order — join_all preserves
            // input order regardless of completion order. Each call carries
            // its own timeout; a hung tool must not stall the loop.
            let executions = response.tool_calls.iter().map(|call| {
                let tools = Arc::clone(&self.tools);
                let timeout = self.call_timeout;
                async move {
                    match tokio::time::timeout(
                        timeout,
                        tools.execute(&call.name, call.arguments.clone()),
                    )
                    .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => Err(DelverError::Timeout(timeout.as_secs())),
                    }
                }
            });
            let observations = futures::future::join_all(executions).await;

            for (call, outcome) in response.tool_calls.iter().zip(observations) {
                // Tool failures become observations, never errors: the next
                // THINK step sees them and can retry or abandon that lead.
                let observation = match outcome {
                    Ok(text) => text,
                    Err(e) => format!("Tool '{}' failed: {}", call.name, e),
                };
                transcript.push(Message::tool(format!("[{}] {}", call.name, observation)));
                records.push(ToolCallRecord {
                    tool_name: call.name.clone(),
                    arguments: call.arguments.clone(),
                    observation,
                    sequence_index: records.len(),
                });
            }

            debug!(
                iteration,
                calls = response.tool_calls.len(),
                "tool step executed"
            );
        }

        if status == FindingStatus::Truncated {
            info!(
                max_iterations = self.max_iterations,
                "iteration ceiling reached, compressing partial research"
            );
        }

        let summary = self.compress(&transcript).await;
        let (summary_text, status) = match summary {
            Ok(text) => (text, status),
            // A failed compression still yields a finding: degraded raw
            // notes are preferred over losing the sub-topic entirely.
            Err(e) => {
                warn!(error = %e, "compression failed, falling back to raw notes");
                (raw_notes_summary(objective, &records), status)
            }
        };

        Ok(ResearchFinding {
            topic_id: String::new(), // correlated by the supervisor
            summary_text,
            source_count: count_distinct_sources(&records),
            status,
            raw_records: records,
        })
    }

    /// One THINK step with bounded retry. Timeouts consume a retry like any
    /// other failure; exhausting the budget is fatal for this loop only.
    async fn think(
        &self,
        system: &str,
        transcript: &[Message],
        catalog: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let mut last_error = String::new();
        for attempt in 1..=self.llm_retries {
            match tokio::time::timeout(
                self.call_timeout,
                self.llm.generate_with_tools(system, transcript, catalog),
            )
            .await
            {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => {
                    warn!(attempt, error = %e, "think step failed");
                    last_error = e.to_string();
                }
                Err(_) => {
                    warn!(attempt, "think step timed out");
                    last_error = format!("timed out after {}s", self.call_timeout.as_secs());
                }
            }
        }
        Err(DelverError::Llm(format!(
            "Reasoning exhausted after {} attempts: {}",
            self.llm_retries, last_error
        )))
    }

    async fn compress(&self, transcript: &[Message]) -> Result<String> {
        let system = prompts::compression_system_prompt(&today_str());
        let body = format!(
            "{}\n\n{}",
            crate::types::render_conversation(transcript),
            prompts::COMPRESSION_REQUEST
        );

        let mut last_error = String::new();
        for attempt in 1..=self.llm_retries {
            match tokio::time::timeout(
                self.call_timeout,
                self.llm.generate_with_system(&system, &body),
            )
            .await
            {
                Ok(Ok(text)) if !text.trim().is_empty() => return Ok(text),
                Ok(Ok(_)) => {
                    warn!(attempt, "compression returned empty text");
                    last_error = "empty compression output".to_string();
                }
                Ok(Err(e)) => {
                    warn!(attempt, error = %e, "compression call failed");
                    last_error = e.to_string();
                }
                Err(_) => {
                    warn!(attempt, "compression call timed out");
                    last_error = format!("timed out after {}s", self.call_timeout.as_secs());
                }
            }
        }
        Err(DelverError::Llm(last_error))
    }
}

/// Count distinct source URLs across a loop's observations. Observations
/// from the search tool carry one `URL: ...` line per source block.
fn count_distinct_sources(records: &[ToolCallRecord]) -> usize {
    let mut urls = HashSet::new();
    for record in records {
        for line in record.observation.lines() {
            if let Some(url) = line.trim().strip_prefix("URL: ") {
                urls.insert(url.trim().to_string());
            }
        }
    }
    urls.len()
}

/// Last-resort summary when compression is unavailable.
fn raw_notes_summary(objective: &str, records: &[ToolCallRecord]) -> String {
    let mut out = format!(
        "Uncompressed research notes for: {}\n(summary generation unavailable)\n",
        objective
    );
    for record in records {
        out.push_str(&format!("\n[{}]\n{}\n", record.tool_name, record.observation));
    }
    out
}
