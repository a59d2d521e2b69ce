//! Reasoning engine seam

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Call that issues a nested model query from generated code
pub const SUB_QUERY_MARKER: &str = "llm_query";

/// Everything the engine needs for one exploration
#[derive(Debug, Clone)]
pub struct EngineRequest {
    /// Full document text
    pub context: Arc<str>,
    pub question: String,
    /// Provider-prefixed model id
    pub model: String,
    pub api_key: String,
    /// Resolved interpreter binary
    pub interpreter: PathBuf,
    /// Check `model` against the provider's listing, falling back through these
    pub model_fallbacks: Vec<String>,
    /// Whether model availability should be resolved before the first call
    pub resolve_model: bool,
}

/// Raw engine output, normalized by the invoker
#[derive(Debug, Clone, Default)]
pub struct EngineOutput {
    pub answer: String,
    /// Free-form step records
    pub trajectory: Vec<Value>,
    /// Provider usage objects, one per model call
    pub usage: Vec<Value>,
}

/// Engine failure. Absorbed into a failed query result, never sent as an HTTP error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Provider rejected or failed a request
    #[error("{provider} request failed: {message}")]
    Provider { provider: String, message: String },

    /// No configured model is available
    #[error("{0}")]
    ModelUnavailable(String),

    /// Interpreter process failed
    #[error("Sandbox error: {0}")]
    Sandbox(String),

    /// Interpreter did not answer in time
    #[error("Sandbox timed out after {0}s")]
    Timeout(u64),

    /// Engine-internal failure
    #[error("{0}")]
    Other(String),
}

impl EngineError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Iterative reasoning engine. Blocking; callers run it on the worker pool.
pub trait ReasoningEngine: Send + Sync {
    /// Explore the context to answer the question
    fn explore(&self, request: EngineRequest) -> Result<EngineOutput, EngineError>;
}
