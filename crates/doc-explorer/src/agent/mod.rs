//! Agent invocation: the boundary to the iterative reasoning engine

pub mod engine;
pub mod interpreter;
pub mod invoker;
pub mod pool;
pub mod providers;

pub use engine::{EngineError, EngineOutput, EngineRequest, ReasoningEngine, SUB_QUERY_MARKER};
pub use interpreter::InterpreterLocator;
pub use invoker::{AgentInvoker, Invocation};
pub use pool::WorkerPool;
pub use providers::{normalize_model, provider_catalog, ProviderInfo};
