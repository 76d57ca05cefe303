//! Multi-loop research supervisor.
//!
//! The supervisor decomposes a brief into independent sub-topics and runs
//! one research loop per sub-topic, concurrently, with strictly isolated
//! state. Fan-out goes through a fixed-size worker pool: assignments queue
//! on a bounded channel, at most `max_concurrent` workers pull from it, and
//! completions come back over a single-writer channel that only the
//! supervisor task drains into the findings map. No loop ever touches
//! another loop's state, and no two loops share a topic id.
//!
//! Decomposition may repeat for several rounds, with prior findings as
//! context, until the model declares research complete or the round budget
//! runs out. A round that delegates nothing is a stop signal.

use crate::llm::{generate_structured, LLMClient};
use crate::prompts;
use crate::research::researcher::ResearchLoop;
use crate::tools::ToolRegistry;
use crate::types::{
    DelverError, FindingStatus, ResearchBrief, ResearchFinding, Result, SubTopicAssignment,
};
use crate::utils::config::{LlmConfig, ResearchConfig};
use crate::utils::today_str;
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Structured delegation decision from the lead-researcher prompt.
#[derive(Debug, Deserialize, JsonSchema)]
struct DelegationDecision {
    /// Independent sub-topics to research next, each a self-contained
    /// objective of at least one sentence. Empty when research is done.
    sub_topics: Vec<String>,
    /// True when the findings gathered so far already cover the brief.
    research_complete: bool,
    /// Short rationale for the decision.
    #[allow(dead_code)]
    reasoning: String,
}

/// Lead researcher: decomposes a brief and coordinates concurrent loops.
pub struct Supervisor {
    llm: Arc<dyn LLMClient>,
    tools: Arc<ToolRegistry>,
    max_concurrent: usize,
    max_rounds: usize,
    max_tool_iterations: usize,
    llm_retries: usize,
    call_timeout: Duration,
}

impl Supervisor {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        tools: Arc<ToolRegistry>,
        research: &ResearchConfig,
        llm_config: &LlmConfig,
    ) -> Self {
        Self {
            llm,
            tools,
            max_concurrent: research.max_concurrent_researchers.max(1),
            max_rounds: research.max_delegation_rounds.max(1),
            max_tool_iterations: research.max_tool_iterations,
            llm_retries: llm_config.structured_retries,
            call_timeout: llm_config.call_timeout(),
        }
    }

    /// Coordinate research for one brief. Returns the assignments in issue
    /// order together with one finding per assignment. Fatal only when
    /// decomposition itself fails, the run is cancelled, or every sub-topic
    /// fails.
    pub async fn coordinate(
        &self,
        brief: &ResearchBrief,
        cancel: watch::Receiver<bool>,
    ) -> Result<(Vec<SubTopicAssignment>, HashMap<String, ResearchFinding>)> {
        let mut assignments: Vec<SubTopicAssignment> = Vec::new();
        let mut findings: HashMap<String, ResearchFinding> = HashMap::new();

        for round in 1..=self.max_rounds {
            if *cancel.borrow() {
                return Err(DelverError::Cancelled);
            }

            let decision = self
                .decide_delegation(brief, &assignments, &findings, round)
                .await?;

            let mut topics = decision.sub_topics;
            if topics.is_empty() {
                if findings.is_empty() {
                    // Single-agent fallback: the brief itself becomes the one
                    // sub-topic so coordination always yields a finding.
                    info!("no sub-topics proposed, falling back to single-agent mode");
                    topics = vec![brief.objective.clone()];
                } else {
                    info!(round, "empty delegation, research considered complete");
                    break;
                }
            }

            let batch: Vec<SubTopicAssignment> = topics
                .into_iter()
                .enumerate()
                .map(|(i, objective)| {
                    SubTopicAssignment::new(format!("t{}-{}", round, i + 1), objective)
                })
                .collect();
            info!(round, sub_topics = batch.len(), "delegating research round");
            assignments.extend(batch.iter().cloned());

            for (topic_id, finding) in self.run_batch(batch, cancel.clone()).await {
                findings.insert(topic_id, finding);
            }

            if *cancel.borrow() {
                return Err(DelverError::Cancelled);
            }
            if decision.research_complete {
                info!(round, "supervisor declared research complete");
                break;
            }
        }

        let failed = findings.values().filter(|f| f.is_failed()).count();
        if !findings.is_empty() && failed == findings.len() {
            return Err(DelverError::AllSubTopicsFailed(failed));
        }
        info!(
            total = findings.len(),
            failed, "research coordination finished"
        );
        Ok((assignments, findings))
    }

    async fn decide_delegation(
        &self,
        brief: &ResearchBrief,
        assignments: &[SubTopicAssignment],
        findings: &HashMap<String, ResearchFinding>,
        round: usize,
    ) -> Result<DelegationDecision> {
        let findings_so_far = render_findings(assignments, findings);
        let prompt = prompts::delegation_prompt(
            &brief.objective,
            &findings_so_far,
            self.max_concurrent,
            self.max_rounds - round + 1,
            &today_str(),
        );
        generate_structured(
            self.llm.as_ref(),
            &prompt,
            self.llm_retries,
            self.call_timeout,
        )
        .await
    }

    /// Run one batch of assignments through the worker pool and collect the
    /// completions. Every assignment yields exactly one result unless the
    /// run is cancelled mid-batch.
    async fn run_batch(
        &self,
        batch: Vec<SubTopicAssignment>,
        cancel: watch::Receiver<bool>,
    ) -> Vec<(String, ResearchFinding)> {
        let pending = batch.len();
        let workers = self.max_concurrent.min(pending).max(1);

        let (task_tx, task_rx) = mpsc::channel::<SubTopicAssignment>(pending);
        for assignment in batch {
            // Capacity equals batch size, so this never blocks.
            let _ = task_tx.send(assignment).await;
        }
        drop(task_tx);
        let task_rx = Arc::new(Mutex::new(task_rx));

        let (done_tx, mut done_rx) = mpsc::channel::<(String, ResearchFinding)>(pending);
        let mut pool = JoinSet::new();

        for _ in 0..workers {
            let task_rx = Arc::clone(&task_rx);
            let done_tx = done_tx.clone();
            let mut cancel = cancel.clone();
            let research_loop = ResearchLoop::new(
                Arc::clone(&self.llm),
                Arc::clone(&self.tools),
                self.max_tool_iterations,
                self.llm_retries,
                self.call_timeout,
            );

            pool.spawn(async move {
                loop {
                    let assignment = { task_rx.lock().await.recv().await };
                    let Some(assignment) = assignment else { break };
                    if *cancel.borrow() {
                        break;
                    }

                    let outcome = tokio::select! {
                        result = research_loop.research(&assignment.objective) => result,
                        _ = cancelled(&mut cancel) => break,
                    };

                    let finding = match outcome {
                        Ok(mut finding) => {
                            finding.topic_id = assignment.topic_id.clone();
                            finding
                        }
                        Err(e) => {
                            warn!(topic_id = %assignment.topic_id, error = %e, "sub-topic failed");
                            failed_finding(&assignment, &e)
                        }
                    };

                    // Nothing is reported once cancellation is signaled.
                    if *cancel.borrow() {
                        break;
                    }
                    if done_tx
                        .send((assignment.topic_id.clone(), finding))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            });
        }
        drop(done_tx);

        let mut completed = Vec::with_capacity(pending);
        while let Some(pair) = done_rx.recv().await {
            completed.push(pair);
        }
        while pool.join_next().await.is_some() {}
        completed
    }
}

/// Resolves only once cancellation is actually signaled.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            // Sender gone without cancelling: this run can no longer be
            // cancelled, so never resolve.
            std::future::pending::<()>().await;
        }
    }
}

/// A failed loop still contributes a finding so partial results reach
/// synthesis; only the whole run failing is fatal.
fn failed_finding(assignment: &SubTopicAssignment, error: &DelverError) -> ResearchFinding {
    ResearchFinding {
        topic_id: assignment.topic_id.clone(),
        summary_text: format!(
            "Research on '{}' failed and produced no findings: {}",
            assignment.objective, error
        ),
        source_count: 0,
        status: FindingStatus::Failed,
        raw_records: Vec::new(),
    }
}

/// Render findings in assignment order for re-delegation context.
pub(crate) fn render_findings(
    assignments: &[SubTopicAssignment],
    findings: &HashMap<String, ResearchFinding>,
) -> String {
    let mut out = String::new();
    for assignment in assignments {
        let Some(finding) = findings.get(&assignment.topic_id) else {
            continue;
        };
        let marker = match finding.status {
            FindingStatus::Complete => "",
            FindingStatus::Truncated => " [truncated]",
            FindingStatus::Failed => " [failed]",
        };
        out.push_str(&format!(
            "### {}{}\n{}\n\n",
            assignment.objective, marker, finding.summary_text
        ));
    }
    out.trim_end().to_string()
}
