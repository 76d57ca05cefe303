//! Web search tool backed by the Tavily search API.
//!
//! Results are deduplicated by URL and formatted into clearly delimited
//! source blocks so the research loop can cite them and the compression
//! step can count them. With a summarizer attached, the tool requests each
//! page's raw content and condenses it through the reasoning port, so loops
//! see substantially more of each source than the API's short snippets.

use crate::llm::{generate_structured, LLMClient};
use crate::prompts;
use crate::tools::registry::Tool;
use crate::types::{DelverError, Result};
use crate::utils::today_str;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw page content is clamped before it enters a summarization prompt.
const MAX_RAW_CONTENT_CHARS: usize = 25_000;
/// Snippet length kept when summarization of a page fails.
const FALLBACK_CONTENT_CHARS: usize = 1_000;
const SUMMARY_ATTEMPTS: usize = 2;
const SUMMARY_TIMEOUT: Duration = Duration::from_secs(30);

/// Structured target for one page summary.
#[derive(Debug, Deserialize, JsonSchema)]
struct PageSummary {
    /// Concise summary of the page content.
    summary: String,
    /// Important quotes and excerpts, kept verbatim.
    key_excerpts: String,
}

/// Tavily-backed `web_search` tool with optional per-page summarization.
pub struct TavilySearchTool {
    http: reqwest::Client,
    api_key: String,
    max_results: usize,
    endpoint: String,
    summarizer: Option<Arc<dyn LLMClient>>,
}

impl TavilySearchTool {
    pub fn new(api_key: String, max_results: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            max_results: max_results.max(1),
            endpoint: TAVILY_ENDPOINT.to_string(),
            summarizer: None,
        }
    }

    /// Point the tool at a different endpoint. Used by tests.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Attach a reasoning client that condenses each result's raw page
    /// content into the source block. Without one, the tool falls back to
    /// the search API's own snippets.
    pub fn with_summarizer(mut self, llm: Arc<dyn LLMClient>) -> Self {
        self.summarizer = Some(llm);
        self
    }

    /// Replace a result's snippet with a structured summary of the full
    /// page. A page without raw content keeps its snippet; a failed
    /// summarization falls back to the leading slice of the raw text.
    async fn summarize_content(&self, llm: &dyn LLMClient, result: &mut SearchResult) {
        let Some(raw) = result.raw_content.take() else {
            return;
        };
        if raw.trim().is_empty() {
            return;
        }
        let clamped: String = raw.chars().take(MAX_RAW_CONTENT_CHARS).collect();
        let prompt = prompts::webpage_summary_prompt(&clamped, &today_str());
        match generate_structured::<PageSummary>(llm, &prompt, SUMMARY_ATTEMPTS, SUMMARY_TIMEOUT)
            .await
        {
            Ok(page) => {
                result.content = format!(
                    "<summary>\n{}\n</summary>\n\n<key_excerpts>\n{}\n</key_excerpts>",
                    page.summary, page.key_excerpts
                );
            }
            Err(e) => {
                warn!(url = %result.url, error = %e, "page summarization failed, keeping raw slice");
                result.content = raw.chars().take(FALLBACK_CONTENT_CHARS).collect();
            }
        }
    }
}

#[async_trait]
impl Tool for TavilySearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for up-to-date information on a single focused query"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A single search query to execute"
                },
                "topic": {
                    "type": "string",
                    "enum": ["general", "news", "finance"],
                    "description": "Topic filter for the results",
                    "default": "general"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DelverError::InvalidInput("Missing 'query' parameter".to_string()))?;
        let topic = args
            .get("topic")
            .and_then(|v| v.as_str())
            .unwrap_or("general");

        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "topic": topic,
            "max_results": self.max_results,
            "include_raw_content": self.summarizer.is_some(),
        });

        let response = self
            .http
            .post(&self.endpoint)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| DelverError::Tool(format!("Search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DelverError::Tool(format!(
                "Search API returned {}: {}",
                status, text
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| DelverError::Tool(format!("Malformed search response: {}", e)))?;

        let mut results = deduplicate_by_url(parsed.results);
        if let Some(llm) = &self.summarizer {
            for result in &mut results {
                self.summarize_content(llm.as_ref(), result).await;
            }
        }
        Ok(format_search_output(results))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    raw_content: Option<String>,
}

/// Drop repeated URLs, keeping first occurrence order.
fn deduplicate_by_url(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = std::collections::HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.url.clone()))
        .collect()
}

fn format_search_output(results: Vec<SearchResult>) -> String {
    if results.is_empty() {
        return "No valid search results found. Try a different search query.".to_string();
    }

    let mut output = String::from("Search results:\n");
    for (i, result) in results.iter().enumerate() {
        output.push_str(&format!(
            "\n--- Source {}: {} ---\nURL: {}\n\n{}\n",
            i + 1,
            result.title,
            result.url,
            result.content
        ));
    }
    output
}
