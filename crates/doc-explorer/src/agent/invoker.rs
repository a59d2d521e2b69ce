//! Agent invoker: validates a question, runs the engine once, and shapes the result

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use super::engine::{EngineOutput, EngineRequest, ReasoningEngine, SUB_QUERY_MARKER};
use super::interpreter::InterpreterLocator;
use super::pool::WorkerPool;
use super::providers::{model_candidates, normalize_model, DEFAULT_GEMINI_MODEL};
use crate::config::{AgentConfig, ExplorerConfig};
use crate::error::{Error, Result};
use crate::types::{QueryResult, TrajectoryStep};

/// A validated question with its provider selection
#[derive(Debug, Clone)]
pub struct Invocation {
    question: String,
    model: String,
    api_key: Option<String>,
    model_fallbacks: Vec<String>,
    resolve_model: bool,
}

impl Invocation {
    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Boundary to the reasoning engine
pub struct AgentInvoker {
    engine: Arc<dyn ReasoningEngine>,
    pool: WorkerPool,
    locator: InterpreterLocator,
    config: AgentConfig,
}

impl AgentInvoker {
    /// Create an invoker using the process environment for interpreter discovery
    pub fn new(engine: Arc<dyn ReasoningEngine>, config: &ExplorerConfig) -> Self {
        Self {
            engine,
            pool: WorkerPool::new(config.agent.worker_threads),
            locator: InterpreterLocator::from_env(config.interpreter.path.clone()),
            config: config.agent.clone(),
        }
    }

    /// Replace interpreter discovery
    pub fn with_locator(mut self, locator: InterpreterLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Whether callers must supply model and credential
    pub fn multi_provider(&self) -> bool {
        self.config.multi_provider
    }

    /// Check preconditions: question, then credential, then model
    pub fn prepare(
        &self,
        question: &str,
        model: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<Invocation> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::MissingQuestion);
        }

        if self.config.multi_provider {
            let api_key = non_blank(api_key).ok_or(Error::MissingCredential)?;
            let model = non_blank(model).ok_or(Error::MissingModel)?;
            return Ok(Invocation {
                question: question.to_string(),
                model: normalize_model(model),
                api_key: Some(api_key.to_string()),
                model_fallbacks: Vec::new(),
                resolve_model: false,
            });
        }

        let mut candidates = model_candidates(
            std::iter::once(self.config.default_model.as_str())
                .chain(std::iter::once(DEFAULT_GEMINI_MODEL))
                .chain(self.config.fallback_models.iter().map(String::as_str)),
        );
        if candidates.is_empty() {
            return Err(Error::Config("No model configured".to_string()));
        }
        let model = candidates.remove(0);

        Ok(Invocation {
            question: question.to_string(),
            model,
            // Checked in `run`, once the document is known to exist
            api_key: non_blank(self.config.api_key.as_deref()).map(str::to_string),
            model_fallbacks: candidates,
            resolve_model: true,
        })
    }

    /// Validate and run in one step
    pub async fn ask(
        &self,
        context: Arc<str>,
        question: &str,
        model: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<QueryResult> {
        let invocation = self.prepare(question, model, api_key)?;
        self.run(invocation, context).await
    }

    /// Run the engine once on the worker pool.
    ///
    /// Engine failures come back as a failed `QueryResult`. Missing setup
    /// (server key, interpreter) and crashed workers are returned as `Err`.
    pub async fn run(&self, invocation: Invocation, context: Arc<str>) -> Result<QueryResult> {
        let api_key = invocation.api_key.ok_or_else(|| {
            Error::Config("GOOGLE_API_KEY is not set on the server".to_string())
        })?;
        let interpreter = self.locator.locate()?;
        let depth = self.config.depth;

        tracing::info!(
            "Exploring {} bytes of text with {} (question: {} chars)",
            context.len(),
            invocation.model,
            invocation.question.len()
        );

        let request = EngineRequest {
            context,
            question: invocation.question,
            model: invocation.model,
            api_key,
            interpreter,
            model_fallbacks: invocation.model_fallbacks,
            resolve_model: invocation.resolve_model,
        };

        let engine = Arc::clone(&self.engine);
        let (outcome, elapsed) = self
            .pool
            .run(move || {
                let started = Instant::now();
                let outcome = engine.explore(request);
                (outcome, started.elapsed())
            })
            .await?;
        let elapsed = round_secs(elapsed.as_secs_f64());

        let result = match outcome {
            Ok(output) => normalize(output, elapsed, depth),
            Err(e) => {
                tracing::warn!("Engine failed after {:.2}s: {}", elapsed, e);
                QueryResult::failure(e.to_string(), elapsed, depth)
            }
        };

        tracing::info!(
            "Exploration finished in {:.2}s ({} iterations, {} tokens)",
            result.elapsed_time_s,
            result.iteration_count,
            result.total_tokens
        );

        Ok(result)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn round_secs(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

/// Shape raw engine output into a query result
pub fn normalize(output: EngineOutput, elapsed_time_s: f64, depth: u32) -> QueryResult {
    let trajectory = coerce_trajectory(output.trajectory);
    let sub_llm_calls = trajectory
        .iter()
        .filter(|step| step.code.contains(SUB_QUERY_MARKER))
        .count();
    let total_tokens = output
        .usage
        .iter()
        .map(usage_tokens)
        .fold(0, u64::saturating_add);

    QueryResult {
        answer: output.answer,
        iteration_count: trajectory.len(),
        trajectory,
        elapsed_time_s,
        sub_llm_calls,
        total_tokens,
        depth,
        error: None,
    }
}

/// Keep object entries, number them from 1
pub fn coerce_trajectory(raw: Vec<Value>) -> Vec<TrajectoryStep> {
    raw.into_iter()
        .filter_map(|entry| match entry {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .enumerate()
        .map(|(i, map)| TrajectoryStep {
            iteration: i as u32 + 1,
            reasoning: text_field(map.get("reasoning")),
            code: text_field(map.get("code")),
            output: text_field(map.get("output")),
        })
        .collect()
}

fn text_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Tokens reported by one usage object; unknown shapes count zero
pub fn usage_tokens(usage: &Value) -> u64 {
    let Value::Object(map) = usage else {
        return 0;
    };

    let field = |key: &str| map.get(key).and_then(as_count);

    if let Some(total) = field("total_tokens").or_else(|| field("totalTokenCount")) {
        return total;
    }

    let pair = |a: &str, b: &str| match (field(a), field(b)) {
        (None, None) => None,
        (x, y) => Some(x.unwrap_or(0).saturating_add(y.unwrap_or(0))),
    };
    if let Some(total) = pair("input_tokens", "output_tokens")
        .or_else(|| pair("prompt_tokens", "completion_tokens"))
    {
        return total;
    }

    // Per-model maps: {"model-a": {...}, "model-b": {...}}
    map.values()
        .filter(|v| v.is_object())
        .map(usage_tokens)
        .fold(0, u64::saturating_add)
}

fn as_count(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}
