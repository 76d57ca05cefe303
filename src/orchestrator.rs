//! Top-level run driver.
//!
//! Sequences Scoping → Supervisor → Synthesis, owns the run state, enforces
//! the clarification-round cap, and exposes suspend/resume over sessions.
//! One orchestrator serves many sessions; each session runs at most one
//! research run at a time, cancellable via [`Orchestrator::cancel`].

use crate::llm::LLMClient;
use crate::research::{Supervisor, Synthesizer};
use crate::scope::{ScopeOutcome, ScopingStage};
use crate::session::SessionStore;
use crate::tools::ToolRegistry;
use crate::types::{DelverError, Message, Result, RunState};
use crate::utils::DelverConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

/// Result of one user turn against the engine.
#[derive(Debug)]
pub enum RunOutcome {
    /// The run is suspended: relay this question to the user and call
    /// [`Orchestrator::resume`] with their answer.
    NeedsClarification { question: String },
    /// The run finished. `state` carries the full run record for
    /// auditability; `report` is `state.final_report`, unwrapped.
    Report { report: String, state: RunState },
}

/// Run driver sequencing the pipeline stages over stored sessions.
pub struct Orchestrator {
    llm: Arc<dyn LLMClient>,
    tools: Arc<ToolRegistry>,
    config: DelverConfig,
    sessions: SessionStore,
    cancels: Mutex<HashMap<Uuid, watch::Sender<bool>>>,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LLMClient>, tools: Arc<ToolRegistry>, config: DelverConfig) -> Self {
        Self {
            llm,
            tools,
            config,
            sessions: SessionStore::new(),
            cancels: Mutex::new(HashMap::new()),
        }
    }

    /// Start a new session from the user's opening request.
    pub async fn start(&self, user_message: impl Into<String>) -> Result<(Uuid, RunOutcome)> {
        let session_id = self.sessions.create(Message::user(user_message));
        info!(%session_id, "session started");
        let outcome = self.run(session_id).await?;
        Ok((session_id, outcome))
    }

    /// Resume a suspended session with one more user turn.
    pub async fn resume(&self, session_id: Uuid, user_message: impl Into<String>) -> Result<RunOutcome> {
        if !self.sessions.exists(session_id) {
            return Err(DelverError::SessionNotFound(session_id.to_string()));
        }
        self.sessions
            .append_turn(session_id, Message::user(user_message))?;
        info!(%session_id, "session resumed");
        self.run(session_id).await
    }

    /// Cancel the in-flight run of a session, if any. In-flight research
    /// loops stop cooperatively and report nothing afterwards.
    pub fn cancel(&self, session_id: Uuid) {
        if let Some(sender) = self.cancels.lock().get(&session_id) {
            info!(%session_id, "cancelling run");
            let _ = sender.send(true);
        }
    }

    async fn run(&self, session_id: Uuid) -> Result<RunOutcome> {
        let scoping = ScopingStage::new(
            Arc::clone(&self.llm),
            self.config.llm.structured_retries,
            self.config.llm.call_timeout(),
        );

        let conversation = self.sessions.conversation(session_id)?;
        let (brief, verification) = match scoping.scope(&conversation).await? {
            ScopeOutcome::Clarify { question } => {
                let rounds = self.sessions.bump_clarification_rounds(session_id)?;
                let cap = self.config.scoping.max_clarification_rounds;
                if rounds > cap {
                    return Err(DelverError::ScopeExhausted(cap));
                }
                self.sessions
                    .append_turn(session_id, Message::assistant(question.clone()))?;
                info!(%session_id, rounds, "run suspended for clarification");
                return Ok(RunOutcome::NeedsClarification { question });
            }
            ScopeOutcome::Proceed {
                brief,
                verification,
            } => (brief, verification),
        };

        self.sessions
            .append_turn(session_id, Message::assistant(verification))?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.cancels.lock().insert(session_id, cancel_tx);

        let result = self.research_and_report(brief, cancel_rx).await;

        self.cancels.lock().remove(&session_id);
        let mut state = result?;

        let report = state
            .final_report
            .clone()
            .ok_or_else(|| DelverError::Llm("Run finished without a report".to_string()))?;
        self.sessions.append_turn(
            session_id,
            Message::assistant(format!("Here is the final report: {}", report)),
        )?;

        info!(%session_id, findings = state.findings.len(), "run complete");
        Ok(RunOutcome::Report { report, state })
    }

    async fn research_and_report(
        &self,
        brief: crate::types::ResearchBrief,
        cancel: watch::Receiver<bool>,
    ) -> Result<RunState> {
        let mut state = RunState::new(brief);

        let supervisor = Supervisor::new(
            Arc::clone(&self.llm),
            Arc::clone(&self.tools),
            &self.config.research,
            &self.config.llm,
        );
        let (assignments, findings) = supervisor.coordinate(&state.brief, cancel).await?;
        state.assignments = assignments;
        state.findings = findings;

        let synthesizer = Synthesizer::new(
            Arc::clone(&self.llm),
            self.config.llm.structured_retries,
            self.config.llm.call_timeout(),
        );
        let report = synthesizer
            .synthesize(&state.brief, &state.assignments, &state.findings)
            .await?;
        state.final_report = Some(report);

        Ok(state)
    }
}
