//! Reasoning port: LLM clients and structured decoding.
//!
//! All model access in the engine goes through [`LLMClient`]. Two call
//! shapes exist: free text (scoping verification, compression, synthesis)
//! and structured objects validated against a schema with bounded retry
//! ([`structured::generate_structured`]). The shipped provider speaks the
//! OpenAI chat-completions wire format; anything else can be plugged in by
//! implementing the trait.

/// Core LLM client trait and response types.
pub mod client;
/// OpenAI-compatible chat-completions provider.
pub mod openai;
/// Schema-validated structured decoding with bounded retry.
pub mod structured;

pub use client::{LLMClient, LLMResponse, Provider};
pub use openai::OpenAIClient;
pub use structured::generate_structured;
