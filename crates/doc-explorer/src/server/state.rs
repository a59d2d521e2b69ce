//! Application state for the explorer server

use std::sync::Arc;

use crate::agent::{AgentInvoker, ReasoningEngine};
use crate::config::ExplorerConfig;
use crate::rlm::{RlmEngine, RlmSettings};
use crate::storage::DocumentStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: ExplorerConfig,
    /// Uploaded documents
    documents: DocumentStore,
    /// Reasoning engine boundary
    invoker: AgentInvoker,
}

impl AppState {
    /// Create state backed by the sandboxed RLM engine
    pub fn new(config: ExplorerConfig) -> Self {
        let engine = Arc::new(RlmEngine::new(RlmSettings::from(&config)));
        Self::with_engine(config, engine)
    }

    /// Create state around a custom engine
    pub fn with_engine(config: ExplorerConfig, engine: Arc<dyn ReasoningEngine>) -> Self {
        let invoker = AgentInvoker::new(engine, &config);
        Self::with_invoker(config, invoker)
    }

    /// Create state around a prepared invoker
    pub fn with_invoker(config: ExplorerConfig, invoker: AgentInvoker) -> Self {
        tracing::info!(
            "Explorer state ready (multi-provider: {}, workers: {})",
            config.agent.multi_provider,
            config.agent.worker_threads
        );
        Self {
            inner: Arc::new(AppStateInner {
                config,
                documents: DocumentStore::new(),
                invoker,
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &ExplorerConfig {
        &self.inner.config
    }

    /// Get the document store
    pub fn documents(&self) -> &DocumentStore {
        &self.inner.documents
    }

    /// Get the agent invoker
    pub fn invoker(&self) -> &AgentInvoker {
        &self.inner.invoker
    }
}
