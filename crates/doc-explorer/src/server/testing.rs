//! Shared fixtures for server tests

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::agent::{
    AgentInvoker, EngineError, EngineOutput, EngineRequest, InterpreterLocator, ReasoningEngine,
};
use crate::config::ExplorerConfig;
use crate::server::state::AppState;
use crate::types::{Document, FileType};

/// Engine returning a canned outcome
pub struct StubEngine {
    fail: bool,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubEngine {
    /// Two steps, answer "It's a greeting"
    pub fn greeting() -> Arc<Self> {
        Self::slow_greeting(Duration::ZERO)
    }

    pub fn slow_greeting(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    /// Always fails
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReasoningEngine for StubEngine {
    fn explore(&self, request: EngineRequest) -> Result<EngineOutput, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.fail {
            return Err(EngineError::Other("stub engine failure".to_string()));
        }

        Ok(EngineOutput {
            answer: "It's a greeting".to_string(),
            trajectory: vec![
                json!({
                    "reasoning": "Read the document",
                    "code": "print(context)",
                    "output": request.context.to_string(),
                }),
                json!({
                    "reasoning": "Classify it",
                    "code": "print(llm_query('What kind of text is this? ' + context))",
                    "output": "A greeting",
                }),
            ],
            usage: vec![json!({"total_tokens": 30}), json!({"total_tokens": 12})],
        })
    }
}

/// Test configuration: server credential set, fast replay
pub fn test_config() -> ExplorerConfig {
    let mut config = ExplorerConfig::default();
    config.agent.api_key = Some("test-key".to_string());
    config.agent.replay_delay_ms = 1;
    config
}

/// State with a stand-in interpreter and `doc-1` = "Hello world".
///
/// Keep the returned file alive for the duration of the test.
pub fn state_with_config(
    engine: Arc<StubEngine>,
    config: ExplorerConfig,
) -> (AppState, NamedTempFile) {
    let interpreter = NamedTempFile::new().expect("temp interpreter");
    let invoker = AgentInvoker::new(engine, &config)
        .with_locator(InterpreterLocator::with_override(interpreter.path()));
    let state = AppState::with_invoker(config, invoker);
    state
        .documents()
        .insert(Document::new("doc-1", "hello.txt", FileType::Txt, "Hello world"));
    (state, interpreter)
}

pub fn seeded_state(engine: Arc<StubEngine>) -> (AppState, NamedTempFile) {
    state_with_config(engine, test_config())
}
