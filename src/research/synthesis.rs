//! Final report synthesis.
//!
//! One free-text reasoning call over the brief and all findings. Findings
//! are assembled strictly in assignment order — never map iteration order —
//! so the synthesis input is byte-identical across runs with identical
//! inputs, regardless of which loop finished first. Synthesis failure after
//! its retry budget is fatal: no partial report is emitted.

use crate::llm::LLMClient;
use crate::prompts;
use crate::types::{
    DelverError, FindingStatus, ResearchBrief, ResearchFinding, Result, SubTopicAssignment,
};
use crate::utils::today_str;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Merges all findings into the final report text.
pub struct Synthesizer {
    llm: Arc<dyn LLMClient>,
    retries: usize,
    call_timeout: Duration,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LLMClient>, retries: usize, call_timeout: Duration) -> Self {
        Self {
            llm,
            retries: retries.max(1),
            call_timeout,
        }
    }

    pub async fn synthesize(
        &self,
        brief: &ResearchBrief,
        assignments: &[SubTopicAssignment],
        findings: &HashMap<String, ResearchFinding>,
    ) -> Result<String> {
        let assembled = assemble_findings(assignments, findings);
        let prompt = prompts::final_report_prompt(&brief.objective, &assembled, &today_str());

        let mut last_error = String::new();
        for attempt in 1..=self.retries {
            match tokio::time::timeout(self.call_timeout, self.llm.generate(&prompt)).await {
                Ok(Ok(report)) if !report.trim().is_empty() => {
                    info!(attempt, "final report generated");
                    return Ok(report);
                }
                Ok(Ok(_)) => {
                    warn!(attempt, "synthesis returned empty report");
                    last_error = "empty report".to_string();
                }
                Ok(Err(e)) => {
                    warn!(attempt, error = %e, "synthesis call failed");
                    last_error = e.to_string();
                }
                Err(_) => {
                    warn!(attempt, "synthesis call timed out");
                    last_error = format!("timed out after {}s", self.call_timeout.as_secs());
                }
            }
        }
        Err(DelverError::Llm(format!(
            "Report synthesis failed after {} attempts: {}",
            self.retries, last_error
        )))
    }
}

/// Deterministic findings assembly: iterate assignments, not the map.
pub fn assemble_findings(
    assignments: &[SubTopicAssignment],
    findings: &HashMap<String, ResearchFinding>,
) -> String {
    let mut out = String::new();
    for (i, assignment) in assignments.iter().enumerate() {
        let header = format!("## Finding {}: {}\n", i + 1, assignment.objective);
        out.push_str(&header);
        match findings.get(&assignment.topic_id) {
            Some(finding) => {
                match finding.status {
                    FindingStatus::Complete => {}
                    FindingStatus::Truncated => {
                        out.push_str("(research was cut short; findings may be partial)\n")
                    }
                    FindingStatus::Failed => out.push_str("(research failed for this sub-topic)\n"),
                }
                out.push_str(&finding.summary_text);
                out.push_str(&format!("\n(sources consulted: {})\n\n", finding.source_count));
            }
            None => out.push_str("(no finding was produced for this sub-topic)\n\n"),
        }
    }
    out.trim_end().to_string()
}
