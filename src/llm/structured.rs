//! Schema-validated structured output with bounded retry.
//!
//! Structured decisions (clarification, delegation) must come back as JSON
//! matching a known schema. Models occasionally return prose or broken JSON
//! instead; the guard here is a plain bounded loop over a decode result, not
//! exception-driven control flow. The JSON Schema for the target type is
//! embedded in the prompt so the model sees exactly what is expected.

use crate::llm::client::LLMClient;
use crate::types::{DelverError, Result};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Decode one reply against the target type. Strips markdown code fences
/// first since models frequently wrap JSON in ```json blocks.
pub fn decode<T: DeserializeOwned>(text: &str) -> std::result::Result<T, String> {
    let stripped = strip_code_fences(text);
    serde_json::from_str::<T>(stripped).map_err(|e| e.to_string())
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the optional language tag on the opening fence line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Ask the model for a `T`, retrying on malformed output.
///
/// Each attempt is wrapped in `timeout`; an elapsed timeout consumes one
/// attempt like a decode failure does. Exhausting `attempts` returns
/// [`DelverError::Decode`], terminal for the caller.
pub async fn generate_structured<T>(
    client: &dyn LLMClient,
    prompt: &str,
    attempts: usize,
    timeout: Duration,
) -> Result<T>
where
    T: DeserializeOwned + JsonSchema,
{
    let schema = serde_json::to_value(schemars::schema_for!(T))
        .map_err(|e| DelverError::Decode(format!("Schema serialization failed: {}", e)))?;

    let framed = format!(
        "{prompt}\n\nRespond with a single JSON object matching this JSON Schema, \
         with no surrounding prose:\n{schema}",
        prompt = prompt,
        schema = schema
    );

    let mut last_error = String::new();
    for attempt in 1..=attempts.max(1) {
        let reply = match tokio::time::timeout(timeout, client.generate(&framed)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(attempt, error = %e, "structured generation call failed");
                last_error = e.to_string();
                continue;
            }
            Err(_) => {
                warn!(attempt, "structured generation call timed out");
                last_error = format!("timed out after {}s", timeout.as_secs());
                continue;
            }
        };

        match decode::<T>(&reply) {
            Ok(value) => {
                debug!(attempt, "structured output decoded");
                return Ok(value);
            }
            Err(reason) => {
                warn!(attempt, %reason, "structured output failed validation");
                last_error = reason;
            }
        }
    }

    Err(DelverError::Decode(format!(
        "No valid structured output after {} attempts: {}",
        attempts.max(1),
        last_error
    )))
}
