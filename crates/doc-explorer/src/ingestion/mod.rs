//! Document ingestion: text extraction from uploaded files

pub mod parser;

pub use parser::{ExtractedText, TextExtractor};
