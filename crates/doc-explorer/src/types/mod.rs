//! Core types for the document explorer

pub mod document;
pub mod query;
pub mod response;

pub use document::{Document, DocumentDetail, DocumentSummary, FileType};
pub use query::QueryRequest;
pub use response::{Metrics, QueryResult, StreamMessage, TrajectoryStep};
