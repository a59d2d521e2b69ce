//! doc-explorer: ask questions about uploaded documents
//!
//! Documents are reduced to plain text and held in memory. Questions are answered
//! by a language model that explores the text with code in a sandboxed
//! interpreter; each exploration step can be streamed to the client over a WebSocket.

pub mod agent;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod rlm;
pub mod server;
pub mod storage;
pub mod types;

pub use config::ExplorerConfig;
pub use error::{Error, Result};
pub use types::{
    document::{Document, DocumentDetail, DocumentSummary, FileType},
    query::QueryRequest,
    response::{QueryResult, StreamMessage, TrajectoryStep},
};
