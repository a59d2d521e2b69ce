//! Iterative exploration engine: a model writes code against the document in a sandbox

pub mod command;
pub mod llm;
pub mod prompts;
pub mod sandbox;

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::agent::{EngineError, EngineOutput, EngineRequest, ReasoningEngine};
use crate::config::ExplorerConfig;

use command::Command;
use llm::{ChatClient, ChatMessage, Provider};
use sandbox::Sandbox;

/// Loop limits
#[derive(Debug, Clone)]
pub struct RlmSettings {
    pub max_iterations: u32,
    pub max_llm_calls: u32,
    pub exec_timeout: Duration,
    pub request_timeout: Duration,
}

impl From<&ExplorerConfig> for RlmSettings {
    fn from(config: &ExplorerConfig) -> Self {
        Self {
            max_iterations: config.agent.max_iterations.max(1),
            max_llm_calls: config.agent.max_llm_calls,
            exec_timeout: Duration::from_secs(config.interpreter.exec_timeout_secs),
            request_timeout: Duration::from_secs(config.agent.request_timeout_secs),
        }
    }
}

/// Recursive language-model engine backed by a Deno sandbox
pub struct RlmEngine {
    settings: RlmSettings,
    /// (first candidate, resolved model)
    resolved_model: Mutex<Option<(String, String)>>,
}

impl RlmEngine {
    pub fn new(settings: RlmSettings) -> Self {
        Self {
            settings,
            resolved_model: Mutex::new(None),
        }
    }

    /// First candidate available on the provider, cached for the process
    fn resolve_model(
        &self,
        client: &ChatClient,
        request: &EngineRequest,
    ) -> Result<String, EngineError> {
        if Provider::split(&request.model).0 != Provider::Gemini {
            return Ok(request.model.clone());
        }

        if let Some((requested, resolved)) = &*self.resolved_model.lock() {
            if *requested == request.model {
                return Ok(resolved.clone());
            }
        }

        let candidates: Vec<&str> = std::iter::once(request.model.as_str())
            .chain(request.model_fallbacks.iter().map(String::as_str))
            .filter(|m| Provider::split(m).0 == Provider::Gemini)
            .collect();

        let available = match client.list_gemini_models(&request.api_key) {
            Ok(models) => models,
            Err(e) => {
                warn!("Could not list Gemini models, using {}: {}", request.model, e);
                return Ok(request.model.clone());
            }
        };

        let resolved = candidates
            .iter()
            .find(|candidate| {
                let bare = Provider::split(candidate).1;
                available.iter().any(|m| m == bare)
            })
            .map(|m| m.to_string())
            .ok_or_else(|| {
                EngineError::ModelUnavailable(format!(
                    "None of the configured Gemini models are available: {}",
                    candidates.join(", ")
                ))
            })?;

        if resolved != request.model {
            info!("Model {} unavailable, using {}", request.model, resolved);
        }
        *self.resolved_model.lock() = Some((request.model.clone(), resolved.clone()));
        Ok(resolved)
    }
}

impl ReasoningEngine for RlmEngine {
    fn explore(&self, request: EngineRequest) -> Result<EngineOutput, EngineError> {
        let client = ChatClient::new(self.settings.request_timeout)?;
        let model = if request.resolve_model {
            self.resolve_model(&client, &request)?
        } else {
            request.model.clone()
        };

        let mut sandbox = Sandbox::spawn(&request.interpreter, self.settings.exec_timeout)?;
        sandbox.define("context", &request.context)?;
        sandbox.define("question", &request.question)?;

        let mut calls = ModelCalls {
            client: &client,
            model: &model,
            api_key: &request.api_key,
            usage: Vec::new(),
            sub_queries: 0,
            max_sub_queries: self.settings.max_llm_calls,
        };

        let mut messages = vec![
            ChatMessage::system(prompts::SYSTEM_PROMPT),
            ChatMessage::user(prompts::initial_prompt(
                &request.question,
                request.context.chars().count(),
            )),
        ];
        let mut trajectory = Vec::new();

        info!("RLM exploring with {}", model);

        for iteration in 1..=self.settings.max_iterations {
            let reply = calls.chat(&messages)?;

            match Command::parse(&reply) {
                Command::Final { answer, .. } => {
                    info!(iteration, steps = trajectory.len(), "RLM complete");
                    return Ok(calls.finish(answer, trajectory));
                }
                Command::RunCode { reasoning, code } => {
                    debug!(iteration, "Executing:\n{}", code);
                    let output = sandbox.execute(&code, |prompt| calls.sub_query(prompt))?;
                    debug!(iteration, output_len = output.len(), "Sandbox output");

                    messages.push(ChatMessage::assistant(reply));
                    messages.push(ChatMessage::user(prompts::output_message(&output)));
                    trajectory.push(step(reasoning, code, output));
                }
                Command::Invalid => {
                    debug!(iteration, "Reply had no code or answer");
                    messages.push(ChatMessage::assistant(reply));
                    messages.push(ChatMessage::user(prompts::INVALID_REPLY));
                }
            }
        }

        warn!(
            steps = trajectory.len(),
            "RLM hit max iterations, requesting final answer"
        );
        messages.push(ChatMessage::user(prompts::FORCE_FINAL));
        let reply = calls.chat(&messages)?;
        let answer = match Command::parse(&reply) {
            Command::Final { answer, .. } => answer,
            _ => reply.trim().to_string(),
        };

        Ok(calls.finish(answer, trajectory))
    }
}

fn step(reasoning: String, code: String, output: String) -> Value {
    json!({
        "reasoning": reasoning,
        "code": code,
        "output": output,
    })
}

/// Model calls made during one exploration, with their usage
struct ModelCalls<'a> {
    client: &'a ChatClient,
    model: &'a str,
    api_key: &'a str,
    usage: Vec<Value>,
    sub_queries: u32,
    max_sub_queries: u32,
}

impl ModelCalls<'_> {
    fn chat(&mut self, messages: &[ChatMessage]) -> Result<String, EngineError> {
        let reply = self.client.chat(self.model, self.api_key, messages)?;
        self.usage.push(reply.usage);
        Ok(reply.text)
    }

    /// Nested query from sandbox code; errors are raised inside the sandbox
    fn sub_query(&mut self, prompt: &str) -> Result<String, String> {
        if self.sub_queries >= self.max_sub_queries {
            return Err(prompts::SUB_QUERY_BUDGET_EXHAUSTED.to_string());
        }
        self.sub_queries += 1;
        debug!(call = self.sub_queries, "llm_query ({} chars)", prompt.len());
        self.chat(&[ChatMessage::user(prompt)])
            .map_err(|e| e.to_string())
    }

    fn finish(self, answer: String, trajectory: Vec<Value>) -> EngineOutput {
        EngineOutput {
            answer,
            trajectory,
            usage: self.usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let mut config = ExplorerConfig::default();
        config.agent.max_iterations = 0;
        let settings = RlmSettings::from(&config);
        assert_eq!(settings.max_iterations, 1);
        assert_eq!(settings.max_llm_calls, 20);
        assert_eq!(settings.exec_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_step_shape() {
        let value = step("why".into(), "print(1)".into(), "1".into());
        assert_eq!(value["reasoning"], "why");
        assert_eq!(value["code"], "print(1)");
        assert_eq!(value["output"], "1");
    }

    #[test]
    fn test_non_gemini_model_skips_resolution() {
        let engine = RlmEngine::new(RlmSettings::from(&ExplorerConfig::default()));
        let client = ChatClient::new(Duration::from_secs(1)).unwrap();
        let request = EngineRequest {
            context: "text".into(),
            question: "q".into(),
            model: "openai/gpt-4.1".into(),
            api_key: "k".into(),
            interpreter: "deno".into(),
            model_fallbacks: vec!["gemini/gemini-2.5-flash".into()],
            resolve_model: true,
        };
        assert_eq!(engine.resolve_model(&client, &request).unwrap(), "openai/gpt-4.1");
    }

    #[test]
    fn test_cached_resolution_is_reused() {
        let engine = RlmEngine::new(RlmSettings::from(&ExplorerConfig::default()));
        *engine.resolved_model.lock() = Some((
            "gemini/gemini-3-flash-preview".to_string(),
            "gemini/gemini-2.5-flash".to_string(),
        ));
        let client = ChatClient::new(Duration::from_secs(1)).unwrap();
        let request = EngineRequest {
            context: "text".into(),
            question: "q".into(),
            model: "gemini/gemini-3-flash-preview".into(),
            api_key: "k".into(),
            interpreter: "deno".into(),
            model_fallbacks: vec![],
            resolve_model: true,
        };
        assert_eq!(
            engine.resolve_model(&client, &request).unwrap(),
            "gemini/gemini-2.5-flash"
        );
    }
}
