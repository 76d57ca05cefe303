//! TOML-based configuration.
//!
//! All limits the engine enforces — retry budgets, iteration ceilings,
//! concurrency caps, timeouts — live here with serde defaults, so an empty
//! file is a valid configuration. API keys are referenced by environment
//! variable name and never stored inline.

use crate::types::{DelverError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration, loadable from a `delver.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelverConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub scoping: ScopingConfig,

    #[serde(default)]
    pub research: ResearchConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

impl DelverConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DelverError::Config(format!("Cannot read {}: {}", path.as_ref().display(), e))
        })?;
        toml::from_str(&raw).map_err(|e| DelverError::Config(format!("Invalid TOML: {}", e)))
    }
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Attempts per structured-output call before a terminal decode error.
    #[serde(default = "default_structured_retries")]
    pub structured_retries: usize,

    /// Timeout for one model call; an elapsed timeout consumes one retry.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_model() -> String {
    "gpt-4.1".to_string()
}

fn default_structured_retries() -> usize {
    3
}

fn default_call_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            structured_retries: default_structured_retries(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

// ============= Scoping Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopingConfig {
    /// Clarification rounds before the run fails with scope exhaustion.
    #[serde(default = "default_max_clarification_rounds")]
    pub max_clarification_rounds: u8,
}

fn default_max_clarification_rounds() -> u8 {
    3
}

impl Default for ScopingConfig {
    fn default() -> Self {
        Self {
            max_clarification_rounds: default_max_clarification_rounds(),
        }
    }
}

// ============= Research Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// THINK/ACT cycles per research loop before forced compression.
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,

    /// Research loops running simultaneously; excess assignments queue.
    #[serde(default = "default_max_concurrent_researchers")]
    pub max_concurrent_researchers: usize,

    /// Supervisor delegation rounds per run.
    #[serde(default = "default_max_delegation_rounds")]
    pub max_delegation_rounds: usize,
}

fn default_max_tool_iterations() -> usize {
    6
}

fn default_max_concurrent_researchers() -> usize {
    3
}

fn default_max_delegation_rounds() -> usize {
    3
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: default_max_tool_iterations(),
            max_concurrent_researchers: default_max_concurrent_researchers(),
            max_delegation_rounds: default_max_delegation_rounds(),
        }
    }
}

// ============= Search Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Environment variable holding the search API key.
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_search_max_results")]
    pub max_results: usize,
}

fn default_search_api_key_env() -> String {
    "TAVILY_API_KEY".to_string()
}

fn default_search_max_results() -> usize {
    3
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_api_key_env(),
            max_results: default_search_max_results(),
        }
    }
}
