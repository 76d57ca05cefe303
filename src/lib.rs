//! # Delver — Deep Research Orchestration Engine
//!
//! Delver turns an open-ended user request into a structured, multi-step
//! research process that produces a written report. The engine coordinates
//! several semi-autonomous reasoning loops running concurrently, each with
//! bounded context, and merges their results deterministically.
//!
//! ## Pipeline
//!
//! 1. **Scoping** — decides whether the request needs a clarifying question
//!    before research starts, then compiles a self-contained research brief
//!    from the full conversation.
//! 2. **Supervision** — decomposes the brief into independent sub-topics
//!    and runs one research loop per sub-topic, concurrently, under a
//!    configurable concurrency ceiling.
//! 3. **Research loops** — each loop iterates THINK (model decides) and ACT
//!    (tools execute) until it stops or hits its iteration ceiling, then
//!    compresses its tool history into one finding.
//! 4. **Synthesis** — merges all findings, in assignment order, into the
//!    final report.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use delver::{DelverConfig, Orchestrator, Provider, RunOutcome, ToolRegistry, TavilySearchTool};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     delver::utils::init_tracing();
//!     let config = DelverConfig::from_file("delver.toml")?;
//!
//!     let api_key = std::env::var(&config.llm.api_key_env)?;
//!     let llm = Provider::OpenAICompatible {
//!         api_base: config.llm.api_base.clone(),
//!         api_key,
//!         model: config.llm.model.clone(),
//!     }
//!     .create_client();
//!
//!     let search_key = std::env::var(&config.search.api_key_env)?;
//!     let search = TavilySearchTool::new(search_key, config.search.max_results);
//!     let tools = Arc::new(ToolRegistry::with_default_tools(search));
//!
//!     let engine = Orchestrator::new(Arc::from(llm), tools, config);
//!     let (session, outcome) = engine.start("Compare Rust and Go for network services").await?;
//!     match outcome {
//!         RunOutcome::NeedsClarification { question } => println!("? {question}"),
//!         RunOutcome::Report { report, .. } => println!("{report}"),
//!     }
//!     let _ = session;
//!     Ok(())
//! }
//! ```
//!
//! ## Ports
//!
//! The engine prescribes no model or search provider. Reasoning goes
//! through [`LLMClient`]; tools go through the [`ToolRegistry`], which
//! merges locally defined tools and externally registered tool sets into
//! one uniform catalog.

#![warn(missing_docs)]

/// Reasoning port: LLM clients and structured decoding.
pub mod llm;
/// Top-level run driver and run outcomes.
pub mod orchestrator;
/// Prompt templates for every reasoning-port call.
pub mod prompts;
/// Research loops, supervisor, and synthesis.
pub mod research;
/// Scoping stage: clarification and brief compilation.
pub mod scope;
/// Session records for multi-turn clarification.
pub mod session;
/// Tool port: registry, built-in and external tools.
pub mod tools;
/// Core types and error handling.
pub mod types;
/// Configuration and tracing setup.
pub mod utils;

pub use llm::{LLMClient, LLMResponse, Provider};
pub use orchestrator::{Orchestrator, RunOutcome};
pub use research::{ResearchLoop, Supervisor, Synthesizer};
pub use scope::{ScopeOutcome, ScopingStage};
pub use session::SessionStore;
pub use tools::{TavilySearchTool, ThinkTool, Tool, ToolRegistry, ToolSet};
pub use types::{
    ClarificationDecision, DelverError, FindingStatus, Message, MessageRole, ResearchBrief,
    ResearchFinding, Result, RunState, SubTopicAssignment, ToolCallRecord,
};
pub use utils::DelverConfig;
